use winit::event::WindowEvent;
use winit::window::Window;

use crate::render::graphics::{Graphics, DEPTH_STENCIL_FORMAT, MSAA_SAMPLES};

/// The immediate-mode UI backend: egui bound to the window for input and to
/// the wgpu device for painting.
pub struct UiLayer {
    context: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

/// One tick's worth of tessellated UI, handed from [`UiLayer::run`] to the
/// upload/paint/cleanup calls.
pub struct UiFrame {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
}

impl UiLayer {
    pub fn new(gfx: &Graphics) -> Self {
        let context = egui::Context::default();
        let state = egui_winit::State::new(
            context.clone(),
            context.viewport_id(),
            gfx.window(),
            Some(gfx.window().scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(
            gfx.device(),
            gfx.surface_format(),
            Some(DEPTH_STENCIL_FORMAT),
            MSAA_SAMPLES,
            false,
        );
        Self {
            context,
            state,
            renderer,
        }
    }

    /// Feeds a window event to egui. Returns whether egui consumed it.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Makes a wgpu texture usable from UI code.
    pub fn register_texture(&mut self, gfx: &Graphics, view: &wgpu::TextureView) -> egui::TextureId {
        self.renderer
            .register_native_texture(gfx.device(), view, wgpu::FilterMode::Linear)
    }

    /// Rebuilds the whole UI for this tick and tessellates it.
    pub fn run(&mut self, window: &Window, build: impl FnMut(&egui::Context)) -> UiFrame {
        let raw_input = self.state.take_egui_input(window);
        let output = self.context.run(raw_input, build);
        self.state
            .handle_platform_output(window, output.platform_output);
        let primitives = self
            .context
            .tessellate(output.shapes, output.pixels_per_point);
        UiFrame {
            primitives,
            textures_delta: output.textures_delta,
        }
    }

    /// Uploads this tick's texture changes and vertex data.
    pub fn upload(
        &mut self,
        gfx: &Graphics,
        encoder: &mut wgpu::CommandEncoder,
        frame: &UiFrame,
        screen: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, delta) in &frame.textures_delta.set {
            self.renderer
                .update_texture(gfx.device(), gfx.queue(), *id, delta);
        }
        let callbacks = self.renderer.update_buffers(
            gfx.device(),
            gfx.queue(),
            encoder,
            &frame.primitives,
            screen,
        );
        // No paint callbacks are used, so nothing should come back here.
        debug_assert!(callbacks.is_empty());
    }

    /// Paints the UI into an already-open render pass.
    pub fn paint(
        &self,
        pass: &mut wgpu::RenderPass<'static>,
        frame: &UiFrame,
        screen: &egui_wgpu::ScreenDescriptor,
    ) {
        self.renderer.render(pass, &frame.primitives, screen);
    }

    /// Frees textures egui retired this tick. Call after the frame's work has
    /// been submitted.
    pub fn cleanup(&mut self, frame: UiFrame) {
        for id in &frame.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}
