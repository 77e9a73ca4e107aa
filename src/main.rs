use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use glam::{Mat4, Vec3};
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{
    ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use xr_widgets::app::{demo_camera, demo_targets, SimulatedHand};
use xr_widgets::{
    export_obj, Aabb, ArButton, HandConfig, HandModel, HandPointerModel, HandSkeleton,
    Handedness, PinchConfig, PointerConfig, PointerGeometry, PointerVisual, ReferenceSpace,
    Renderer, SessionBackend, SessionError, SessionHandle, SessionInit, SessionMode,
    SphereInstance, TrackedController,
};

const POINTER_COLOR: Vec3 = Vec3::new(0.88, 0.9, 0.94);
const JOINT_COLOR: Vec3 = Vec3::new(0.45, 0.7, 1.0);
const TARGET_COLOR: Vec3 = Vec3::new(0.35, 0.9, 0.6);
const CURSOR_COLOR: Vec3 = Vec3::new(1.0, 1.0, 1.0);
const TARGET_MARKER_RADIUS: f32 = 0.04;
const MOUSE_PINCH_DISTANCE: f32 = 0.008;
const FRAME_SECONDS: f32 = 1.0 / 60.0;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;

    if let Some(path) = &options.export_obj {
        return export_pointer_mesh(path);
    }

    let widgets = Widgets::new();
    println!(
        "Widgets ready: hand model, pinch pointer, ar button [{}]",
        widgets.button.label()
    );

    if options.summary_only {
        run_headless(widgets, options.frames)
    } else {
        match run_interactive(widgets) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(Widgets::new(), options.frames)
                } else {
                    Err(err)
                }
            }
        }
    }
}

/// The widget stack for one simulated right hand.
struct Widgets {
    controller: TrackedController,
    pointer_config: PointerConfig,
    hand: HandModel,
    pointer: HandPointerModel,
    button: ArButton,
    backend: DemoSessionBackend,
    targets: Vec<Aabb>,
}

impl Widgets {
    fn new() -> Self {
        let controller = TrackedController::new(Handedness::Right);
        let pointer_config = PointerConfig::default();
        Self {
            hand: HandModel::new(&controller, HandConfig::default()),
            pointer: HandPointerModel::new(
                &controller,
                pointer_config.clone(),
                PinchConfig::default(),
            ),
            button: ArButton::new(SessionInit::default()),
            backend: DemoSessionBackend::default(),
            targets: demo_targets(),
            pointer_config,
            controller,
        }
    }

    /// Per-frame pass over every widget.
    fn update(&mut self) {
        self.hand.update();
        self.pointer.update();
        self.pointer.check_intersections(&self.targets);
        self.button.process_events();
    }

    fn toggle_session(&mut self) {
        if let Err(err) = self.button.toggle(&mut self.backend) {
            log::warn!("session toggle failed: {err}");
        }
    }
}

/// Backend that grants sessions immediately, standing in for a device
/// API in the demo.
#[derive(Default)]
struct DemoSessionBackend {
    next_id: u64,
}

impl SessionBackend for DemoSessionBackend {
    fn request_session(
        &mut self,
        mode: SessionMode,
        init: &SessionInit,
    ) -> Result<SessionHandle, SessionError> {
        if mode != SessionMode::ImmersiveAr {
            return Err(SessionError::Unsupported(mode));
        }
        let handle = SessionHandle::new(self.next_id);
        self.next_id += 1;
        info!(
            "granted {mode} session {} ({} optional features)",
            handle.id(),
            init.optional_features.len()
        );
        Ok(handle)
    }

    fn bind_session(&mut self, handle: &SessionHandle, reference_space: ReferenceSpace) {
        log::debug!(
            "session {} bound to the {} reference space",
            handle.id(),
            reference_space.name()
        );
    }

    fn end_session(&mut self, handle: &SessionHandle) -> Result<(), SessionError> {
        handle.notify_ended();
        Ok(())
    }
}

fn run_headless(mut widgets: Widgets, frames: u32) -> Result<()> {
    println!("Simulating {frames} frames of hand tracking");
    let mut hand = SimulatedHand::new(&widgets.controller);
    let start_frame = frames / 8;
    let stop_frame = frames.saturating_sub(frames / 8);
    let mut was_pinched = false;

    for frame in 0..frames {
        hand.advance(FRAME_SECONDS);
        widgets.update();

        let pinched = widgets.pointer.is_pinched();
        if pinched != was_pinched {
            let verb = if pinched { "engaged" } else { "released" };
            println!(
                "pinch {verb} at frame {frame} (distance {:.3}, strength {:.2})",
                hand.distance(),
                widgets.pointer.pinch_strength()
            );
            was_pinched = pinched;
        }

        if frame == start_frame || frame == stop_frame {
            widgets.toggle_session();
            println!("ar button pressed; label is now {}", widgets.button.label());
        }
    }

    print_summary(&widgets);
    Ok(())
}

fn run_interactive(widgets: Widgets) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("xr-widgets [{}]", widgets.button.label()))
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer = block_on(Renderer::new(
        Arc::clone(&window),
        &widgets.pointer_config,
    ))?;
    let hand = SimulatedHand::new(&widgets.controller);

    let mut app = AppState {
        renderer,
        widgets,
        hand,
        mouse_pinch: false,
        title_label: ArButton::START_LABEL,
        last_frame: Instant::now(),
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    print_summary(&app.widgets);

    if let Some(err) = app.last_error {
        return Err(err);
    }

    Ok(())
}

struct AppState {
    renderer: Renderer,
    widgets: Widgets,
    hand: SimulatedHand,
    mouse_pinch: bool,
    title_label: &'static str,
    last_frame: Instant,
    last_error: Option<anyhow::Error>,
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        self.handle_keyboard(input, control_flow);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        self.handle_mouse_button(*state, *button);
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                self.step();
                let camera = demo_camera(self.renderer_aspect());
                self.renderer.update_globals(&camera);
                self.sync_pointer();
                let spheres = self.collect_spheres();
                if let Err(err) = self.renderer.render(&spheres) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = self.renderer.window().inner_size();
                            self.renderer.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    /// Advances the simulated hand and every widget by one frame.
    fn step(&mut self) {
        let dt = self.last_frame.elapsed().as_secs_f32().min(0.1);
        self.last_frame = Instant::now();
        if self.mouse_pinch {
            self.hand.set_distance(MOUSE_PINCH_DISTANCE);
        } else {
            self.hand.advance(dt);
        }
        self.widgets.update();

        let label = self.widgets.button.label();
        if label != self.title_label {
            self.title_label = label;
            self.renderer
                .window()
                .set_title(&format!("xr-widgets [{label}]"));
        }
    }

    fn sync_pointer(&mut self) {
        match self.widgets.pointer.visual_mut() {
            Some(visual) if visual.is_visible() => {
                let pose = visual.pose();
                let model = Mat4::from_rotation_translation(pose.orientation, pose.position)
                    * Mat4::from_translation(Vec3::new(0.0, 0.0, visual.mesh_offset()));
                let opacity = visual.opacity();
                self.renderer
                    .update_pointer(visual.geometry_mut(), model, POINTER_COLOR, opacity, true);
            }
            _ => self.renderer.hide_pointer(),
        }
    }

    fn collect_spheres(&self) -> Vec<SphereInstance> {
        let mut spheres = Vec::new();
        if let Some(skeleton) = self.widgets.hand.skeleton() {
            for (_, pose) in skeleton.tracked() {
                spheres.push(SphereInstance {
                    center: pose.position,
                    radius: pose.radius,
                    color: JOINT_COLOR,
                    opacity: 1.0,
                });
            }
        }
        for target in &self.widgets.targets {
            spheres.push(SphereInstance {
                center: target.center(),
                radius: TARGET_MARKER_RADIUS,
                color: TARGET_COLOR,
                opacity: 0.35,
            });
        }
        if self.widgets.pointer.is_visible() {
            if let Some(center) = self.widgets.pointer.cursor_position() {
                spheres.push(SphereInstance {
                    center,
                    radius: self.widgets.pointer_config.cursor_radius,
                    color: CURSOR_COLOR,
                    opacity: 0.5,
                });
            }
        }
        spheres
    }

    fn renderer_aspect(&self) -> f32 {
        let size = self.renderer.window().inner_size();
        if size.height == 0 {
            1.0
        } else {
            size.width as f32 / size.height as f32
        }
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput, control_flow: &mut ControlFlow) {
        if input.state != ElementState::Pressed {
            return;
        }
        match input.virtual_keycode {
            Some(VirtualKeyCode::Escape) => control_flow.set_exit(),
            Some(VirtualKeyCode::A | VirtualKeyCode::Space) => self.widgets.toggle_session(),
            _ => {}
        }
    }

    fn handle_mouse_button(&mut self, state: ElementState, button: MouseButton) {
        if button == MouseButton::Left {
            self.mouse_pinch = state == ElementState::Pressed;
        }
    }
}

fn print_summary(widgets: &Widgets) {
    println!("Final widget states:");
    println!(
        " - hand visible={} joints={}",
        widgets.hand.is_visible(),
        widgets.hand.skeleton().map_or(0, HandSkeleton::len)
    );
    println!(
        " - pointer pinched={} strength={:.2} cursor={:.2}",
        widgets.pointer.is_pinched(),
        widgets.pointer.pinch_strength(),
        widgets
            .pointer
            .visual()
            .map_or(0.0, PointerVisual::cursor_distance)
    );
    println!(
        " - ar button label={} active={} overlay={}",
        widgets.button.label(),
        widgets.button.is_active(),
        widgets.button.overlay_visible()
    );
}

fn export_pointer_mesh(path: &str) -> Result<()> {
    let mesh = PointerGeometry::new(&PointerConfig::default()).mesh_data();
    export_obj(&mesh, Path::new(path))?;
    println!(
        "Exported pointer mesh to {path} ({} vertices, {} triangles)",
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(())
}

struct CliOptions {
    frames: u32,
    summary_only: bool,
    export_obj: Option<String>,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut frames = 240;
        let mut summary_only = false;
        let mut export_obj = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames expects a frame count"))?;
                    frames = value
                        .parse()
                        .map_err(|_| anyhow!("invalid frame count: {value}"))?;
                }
                "--export-obj" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--export-obj expects a file path"))?;
                    export_obj = Some(value);
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Usage: xr-widgets [--summary-only] [--frames N] [--export-obj PATH]"
                    ));
                }
            }
        }
        Ok(Self {
            frames,
            summary_only,
            export_obj,
        })
    }
}
