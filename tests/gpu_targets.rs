//! Render-target lifecycle tests against a live adapter.
//!
//! Gated behind the `gpu-tests` feature because they need a real (or
//! software) GPU; run with `cargo test --features gpu-tests`.

#![cfg(feature = "gpu-tests")]

use ember::gfx::targets::RenderTargets;

fn request_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok()?;
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("test device"),
        required_features: wgpu::Features::default(),
        required_limits: wgpu::Limits::downlevel_defaults(),
        memory_hints: wgpu::MemoryHints::default(),
        trace: wgpu::Trace::Off,
    }))
    .ok()
}

#[test]
fn resize_recreates_targets_in_dependency_order() {
    let Some((device, _queue)) = request_device() else {
        eprintln!("no adapter available, skipping");
        return;
    };

    let mut targets = RenderTargets::new(&device, 800, 600);
    assert!(targets.check_consistent());
    assert_eq!(targets.depth.dimensions(), (800, 600));
    assert_eq!(targets.gbuffer.dimensions(), (800, 600));
    assert_eq!(targets.forward.dimensions(), (800, 600));

    let generation_before = targets.depth.generation();
    targets.resize(&device, 1920, 1080);

    // The depth buffer was recreated first; both targets attached the new
    // generation, never the stale one.
    assert!(targets.depth.generation() > generation_before);
    assert!(targets.check_consistent());
    assert_eq!(targets.depth.dimensions(), (1920, 1080));
    assert_eq!(targets.gbuffer.dimensions(), (1920, 1080));
    assert_eq!(targets.forward.dimensions(), (1920, 1080));
}

#[test]
fn resize_is_idempotent() {
    let Some((device, _queue)) = request_device() else {
        eprintln!("no adapter available, skipping");
        return;
    };

    let mut targets = RenderTargets::new(&device, 640, 480);
    targets.resize(&device, 1024, 768);
    let first_generation = targets.depth.generation();
    targets.resize(&device, 1024, 768);

    assert_eq!(targets.gbuffer.dimensions(), (1024, 768));
    assert_eq!(targets.forward.dimensions(), (1024, 768));
    assert!(targets.check_consistent());
    // A repeated resize still brackets correctly with a fresh depth buffer.
    assert!(targets.depth.generation() > first_generation);
}

#[test]
fn readiness_check_passes_on_fresh_targets() {
    let Some((device, _queue)) = request_device() else {
        eprintln!("no adapter available, skipping");
        return;
    };

    let targets = RenderTargets::new(&device, 320, 240);
    assert!(targets.gbuffer.check_ready(&targets.depth));
    assert!(targets.forward.check_ready(&targets.depth));
}
