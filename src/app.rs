use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera_controller::FlyController;
use crate::error::{AppError, ConfigError};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::renderer::Renderer;
use crate::scene::Scene;
use crate::shadow::ShadowConfig;

/// Context provided during app setup.
pub struct SetupContext<'a> {
    pub gpu: &'a GpuContext,
}

impl SetupContext<'_> {
    /// Aspect ratio of the window, for the scene's cameras.
    pub fn aspect(&self) -> f32 {
        self.gpu.aspect()
    }
}

/// Context provided each frame, before the scene is rendered.
pub struct Frame<'a> {
    pub gpu: &'a GpuContext,
    pub scene: &'a mut Scene,
    pub renderer: &'a mut Renderer,
    pub input: &'a Input,
    /// Seconds since the app started.
    pub time: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
    exit_requested: &'a mut bool,
}

impl Frame<'_> {
    pub fn fps(&self) -> f32 {
        if self.dt > 0.0 { 1.0 / self.dt } else { 0.0 }
    }

    pub fn width(&self) -> u32 {
        self.gpu.width()
    }

    pub fn height(&self) -> u32 {
        self.gpu.height()
    }

    /// Closes the window after this frame.
    pub fn exit(&mut self) {
        *self.exit_requested = true;
    }
}

/// Window and renderer options.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub shadows: ShadowConfig,
    pub post_processing: bool,
    /// Built-in keys: `1`-`9` camera, `P` projection, `L` shadows,
    /// `F` post-processing, `Escape` quit.
    pub default_bindings: bool,
    /// Flies the active camera with WASD and the mouse. `None` leaves camera
    /// control to the frame closure.
    pub controller: Option<FlyController>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Penumbra".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            shadows: ShadowConfig::default(),
            post_processing: true,
            default_bindings: true,
            controller: Some(FlyController::default()),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn shadows(mut self, shadows: ShadowConfig) -> Self {
        self.shadows = shadows;
        self
    }

    pub fn post_processing(mut self, enabled: bool) -> Self {
        self.post_processing = enabled;
        self
    }

    pub fn default_bindings(mut self, enabled: bool) -> Self {
        self.default_bindings = enabled;
        self
    }

    pub fn controller(mut self, controller: Option<FlyController>) -> Self {
        self.controller = controller;
        self
    }
}

/// Opens a window and runs the app until it is closed.
///
/// `setup` runs once the GPU is ready and returns the scene along with the
/// closure called every frame.
///
/// # Example
/// ```no_run
/// use penumbra::*;
///
/// fn main() -> Result<(), AppError> {
///     run(AppConfig::new().title("Shadows"), |ctx| {
///         let camera = Camera::new(CameraConfig::new(Vec3::new(0.0, 2.0, -8.0), ctx.aspect()))?;
///         let mut scene = Scene::new(camera);
///         let cube = scene.add_mesh(Mesh::cube(ctx.gpu));
///         let white = scene.add_material(Material::new("White", Vec3::ONE, 0.5));
///         scene.spawn(Transform::new(), cube, white);
///
///         Ok((scene, |frame: &mut Frame| frame.scene.spin(frame.dt)))
///     })
/// }
/// ```
pub fn run<S, F>(config: AppConfig, setup: S) -> Result<(), AppError>
where
    S: FnOnce(&SetupContext) -> Result<(Scene, F), ConfigError> + 'static,
    F: FnMut(&mut Frame) + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PenumbraApp::Pending {
        config,
        setup: Some(Box::new(move |ctx| {
            let (scene, frame_fn) = setup(ctx)?;
            Ok((scene, Box::new(frame_fn) as FrameFn))
        })),
    };

    event_loop.run_app(&mut app)?;

    match app {
        PenumbraApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

type FrameFn = Box<dyn FnMut(&mut Frame)>;
type SetupFn = Box<dyn FnOnce(&SetupContext) -> Result<(Scene, FrameFn), ConfigError>>;

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
    scene: Scene,
    input: Input,
    frame_fn: FrameFn,
    bindings: bool,
    controller: Option<FlyController>,
    start_time: Instant,
    last_frame: Instant,
}

enum PenumbraApp {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn>,
    },
    Running(Box<Running>),
    Failed(AppError),
}

impl PenumbraApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        setup: SetupFn,
    ) -> Result<Running, AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone(), config.vsync)?;
        let renderer = Renderer::new(&gpu, config.shadows, config.post_processing)?;

        let (mut scene, frame_fn) = setup(&SetupContext { gpu: &gpu })?;
        scene.resize(gpu.aspect())?;
        log::info!(
            "Scene ready: {} entities, {} cameras, {} lights",
            scene.entity_count(),
            scene.cameras().len(),
            scene.lights().len()
        );

        window.request_redraw();
        Ok(Running {
            window,
            gpu,
            renderer,
            scene,
            input: Input::new(),
            frame_fn,
            bindings: config.default_bindings,
            controller: config.controller,
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }
}

impl ApplicationHandler for PenumbraApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let PenumbraApp::Pending { config, setup } = self else {
            return;
        };
        let Some(setup) = setup.take() else {
            return;
        };
        *self = match Self::start(event_loop, config, setup) {
            Ok(running) => PenumbraApp::Running(Box::new(running)),
            Err(err) => {
                log::error!("Startup failed: {err}");
                event_loop.exit();
                PenumbraApp::Failed(err)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let PenumbraApp::Running(app) = self else {
            return;
        };
        let app = &mut **app;

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(err) =
                    app.renderer
                        .resize(&mut app.gpu, &mut app.scene, size.width, size.height)
                {
                    log::error!("Resize failed: {err}");
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let time = app.start_time.elapsed().as_secs_f32();
                let dt = now.duration_since(app.last_frame).as_secs_f32();
                app.last_frame = now;

                let mut exit_requested = false;
                if app.bindings {
                    apply_bindings(app, &mut exit_requested);
                }
                if let Some(controller) = &app.controller {
                    controller.update(app.scene.active_camera_mut(), &app.input, dt);
                }

                let mut frame = Frame {
                    gpu: &app.gpu,
                    scene: &mut app.scene,
                    renderer: &mut app.renderer,
                    input: &app.input,
                    time,
                    dt,
                    exit_requested: &mut exit_requested,
                };
                (app.frame_fn)(&mut frame);

                if let Err(err) = app.renderer.render(&app.gpu, &mut app.scene) {
                    log::error!("Rendering failed: {err}");
                    event_loop.exit();
                    *self = PenumbraApp::Failed(err.into());
                    return;
                }

                if exit_requested {
                    event_loop.exit();
                }
                app.input.begin_frame();
                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn apply_bindings(app: &mut Running, exit_requested: &mut bool) {
    let input = &app.input;
    if input.key_pressed(KeyCode::Escape) {
        *exit_requested = true;
    }
    if let Some(index) = (0..9).find(|&i| input.key_pressed(camera_key(i))) {
        match app.scene.set_active_camera(index) {
            Ok(()) => log::info!("Camera {}", index + 1),
            Err(err) => log::debug!("{err}"),
        }
    }
    if input.key_pressed(KeyCode::KeyP) {
        let camera = app.scene.active_camera_mut();
        camera.toggle_projection();
        log::info!("Projection: {:?}", camera.projection());
    }
    if input.key_pressed(KeyCode::KeyL) {
        let enabled = app.renderer.shadows_enabled();
        app.renderer.set_shadows_enabled(&app.gpu, !enabled);
    }
    if input.key_pressed(KeyCode::KeyF) {
        let enabled = !app.renderer.post_processing();
        app.renderer.set_post_processing(enabled);
        log::info!("Post-processing {}", if enabled { "on" } else { "off" });
    }
}

/// Number key selecting camera `index` (`1` selects camera 0).
fn camera_key(index: usize) -> KeyCode {
    const DIGITS: [KeyCode; 9] = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    DIGITS[index % DIGITS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_keys_map_to_cameras() {
        assert_eq!(camera_key(0), KeyCode::Digit1);
        assert_eq!(camera_key(8), KeyCode::Digit9);
    }

    #[test]
    fn config_builder() {
        let config = AppConfig::new()
            .title("Test")
            .size(640, 480)
            .vsync(false)
            .post_processing(false)
            .controller(None);
        assert_eq!(config.title, "Test");
        assert_eq!((config.width, config.height), (640, 480));
        assert!(!config.vsync);
        assert!(!config.post_processing);
        assert!(config.default_bindings);
        assert!(config.controller.is_none());
        assert_eq!(config.shadows, ShadowConfig::default());
    }
}
