use std::sync::Arc;

use anyhow::{anyhow, Result};
use glam::Vec3;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::audio::AudioOutput;
use crate::render::graphics::{self, Graphics, GraphicsEvent};
use crate::ui::{UiFrame, UiLayer};

/// Startup settings, injected by the binary instead of living in globals.
#[derive(Debug, Clone)]
pub struct Config {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: Vec3,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Demo App".into(),
            width: 640,
            height: 480,
            // cornflower blue, https://www.colorhexa.com/6495ed
            clear_color: Vec3::new(0.392, 0.584, 0.929),
        }
    }
}

/// What the application runs once the bootstrap chain has finished.
pub trait Scene {
    /// Called exactly once, after window, graphics, UI, and audio are up.
    /// An error here aborts startup.
    fn load(&mut self, ctx: &mut LoadContext) -> Result<()>;

    /// Rebuilds the UI, called every tick.
    fn ui(&mut self, ctx: &egui::Context);

    fn resized(&mut self, _size: PhysicalSize<u32>) {}
}

/// Everything a scene may touch while loading its content.
pub struct LoadContext<'a> {
    pub graphics: &'a Graphics,
    pub ui: &'a mut UiLayer,
    pub audio: &'a AudioOutput,
}

enum State {
    Init(Option<EventLoopProxy<GraphicsEvent>>),
    Ready(Running),
}

// Field order is teardown order reversed: the scene's GPU/audio handles drop
// before the UI renderer, the audio device, and finally the graphics context.
struct Running {
    scene: Box<dyn Scene>,
    ui: UiLayer,
    audio: AudioOutput,
    graphics: Graphics,
}

pub struct EngineContext {
    event_loop: Option<EventLoop<GraphicsEvent>>,
    app: App,
}

struct App {
    config: Config,
    pending_scene: Option<Box<dyn Scene>>,
    state: State,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<GraphicsEvent>, config: Config, scene: Box<dyn Scene>) -> Self {
        Self {
            config,
            pending_scene: Some(scene),
            state: State::Init(Some(event_loop.create_proxy())),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("fatal: {err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler<GraphicsEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let State::Init(proxy) = &mut self.state {
            if let Some(proxy) = proxy.take() {
                let attrs = Window::default_attributes()
                    .with_title(self.config.title.clone())
                    .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
                let window = match event_loop.create_window(attrs) {
                    Ok(window) => Arc::new(window),
                    Err(err) => {
                        return self
                            .fail(event_loop, anyhow!(err).context("failed to create window"))
                    }
                };
                info!("window created: {}x{}", self.config.width, self.config.height);

                pollster::block_on(graphics::create_graphics(window, proxy));
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: GraphicsEvent) {
        let graphics = match event {
            Ok(graphics) => graphics,
            Err(err) => return self.fail(event_loop, err.into()),
        };

        let mut ui = UiLayer::new(&graphics);
        let audio = match AudioOutput::open() {
            Ok(audio) => audio,
            Err(err) => return self.fail(event_loop, err.into()),
        };

        let Some(mut scene) = self.pending_scene.take() else {
            return;
        };
        let mut load = LoadContext {
            graphics: &graphics,
            ui: &mut ui,
            audio: &audio,
        };
        if let Err(err) = scene.load(&mut load) {
            return self.fail(event_loop, err.context("failed to load scene content"));
        }
        info!("bootstrap finished");

        graphics.request_redraw();
        self.state = State::Ready(Running {
            scene,
            ui,
            audio,
            graphics,
        });
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let State::Ready(running) = &self.state {
            running.graphics.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let State::Ready(running) = &mut self.state else {
            if matches!(event, WindowEvent::CloseRequested) {
                event_loop.exit();
            }
            return;
        };

        // egui sees every event first, whether or not it consumes it.
        let _consumed = running.ui.handle_event(running.graphics.window(), &event);

        match event {
            WindowEvent::CloseRequested => {
                info!("close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.graphics.resize(size);
                running.scene.resized(size);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = running.redraw(self.config.clear_color) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }
}

impl Running {
    fn redraw(&mut self, clear_color: Vec3) -> Result<()> {
        let (frame, surface_view) = match self.graphics.begin_frame() {
            Ok(acquired) => acquired,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.graphics.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(err @ wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!(err).context("out of GPU memory"));
            }
            Err(err) => {
                error!("skipping frame: {err}");
                return Ok(());
            }
        };

        let ui_frame: UiFrame = self
            .ui
            .run(self.graphics.window(), |ctx| self.scene.ui(ctx));

        let (width, height) = self.graphics.size();
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.graphics.window().scale_factor() as f32,
        };

        let mut encoder =
            self.graphics
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        self.ui
            .upload(&self.graphics, &mut encoder, &ui_frame, &screen);

        {
            // One pass per frame: clear to the flat background color, then
            // paint the UI on top. The MSAA target resolves into the surface.
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("frame pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: self.graphics.msaa_view(),
                        resolve_target: Some(&surface_view),
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color {
                                r: f64::from(clear_color.x),
                                g: f64::from(clear_color.y),
                                b: f64::from(clear_color.z),
                                a: 1.0,
                            }),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: self.graphics.depth_view(),
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(0),
                            store: wgpu::StoreOp::Store,
                        }),
                    }),
                    ..Default::default()
                })
                .forget_lifetime();
            self.ui.paint(&mut pass, &ui_frame, &screen);
        }

        self.graphics
            .queue()
            .submit(std::iter::once(encoder.finish()));
        frame.present();
        self.ui.cleanup(ui_frame);

        Ok(())
    }
}

impl EngineContext {
    pub fn new(config: Config, scene: Box<dyn Scene>) -> Result<Self> {
        if config.title.is_empty() {
            return Err(anyhow!("window title must not be empty"));
        }
        info!("{} starting", config.title);

        let event_loop = EventLoop::<GraphicsEvent>::with_user_event().build()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        let app = App::new(&event_loop, config, scene);
        Ok(Self {
            event_loop: Some(event_loop),
            app,
        })
    }

    /// Runs until the window is closed or a bootstrap step fails.
    pub fn run(mut self) -> Result<()> {
        if let Some(event_loop) = self.event_loop.take() {
            event_loop.run_app(&mut self.app)?;
        }
        match self.app.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
