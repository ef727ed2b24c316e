//! egui debug overlay
//!
//! The UI runs in [`DebugOverlay::prepare`] before the frame is rendered so it
//! can edit the program state; the tessellated result is recorded onto the
//! resolved surface when the frame plan reaches its overlay step.

use frostvale_core::{PlacementSlot, ProgramState};
use frostvale_render::OverlayPainter;
use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

/// Read-only numbers shown in the overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Telemetry {
    pub fps: f64,
    pub frame_ms: f64,
    pub msaa_samples: u32,
    pub object_count: usize,
}

/// Output of one UI pass waiting to be painted
struct PreparedFrame {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen: egui_wgpu::ScreenDescriptor,
}

pub struct DebugOverlay {
    ctx: egui::Context,
    winit_state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    prepared: Option<PreparedFrame>,
}

impl DebugOverlay {
    pub fn new(window: &Window, device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let winit_state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);
        Self {
            ctx,
            winit_state,
            renderer,
            prepared: None,
        }
    }

    /// Feed a window event to egui. Returns true when egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    /// Whether a text field or slider currently holds keyboard focus.
    pub fn wants_keyboard(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }

    /// Drop input queued while the overlay was hidden so it is not replayed
    /// when the overlay opens.
    pub fn discard_input(&mut self, window: &Window) {
        let _ = self.winit_state.take_egui_input(window);
    }

    /// Run the UI against `state` and tessellate it for this frame.
    pub fn prepare(
        &mut self,
        window: &Window,
        size_in_pixels: [u32; 2],
        state: &mut ProgramState,
        telemetry: &Telemetry,
    ) {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, |ctx| show_panel(ctx, state, telemetry));

        self.winit_state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.prepared = Some(PreparedFrame {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            screen: egui_wgpu::ScreenDescriptor {
                size_in_pixels,
                pixels_per_point: full_output.pixels_per_point,
            },
        });
    }
}

impl OverlayPainter for DebugOverlay {
    fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let Some(frame) = self.prepared.take() else {
            return;
        };

        for (id, image_delta) in &frame.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &frame.paint_jobs, &frame.screen);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut render_pass = render_pass.forget_lifetime();
            self.renderer
                .render(&mut render_pass, &frame.paint_jobs, &frame.screen);
        }

        for id in &frame.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn show_panel(ctx: &egui::Context, state: &mut ProgramState, telemetry: &Telemetry) {
    egui::Window::new("Frostvale")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| draw_panel(ui, state, telemetry));
}

fn draw_panel(ui: &mut egui::Ui, state: &mut ProgramState, telemetry: &Telemetry) {
    ui.label(format!(
        "{:.1} fps ({:.2} ms)  MSAA x{}  {} objects",
        telemetry.fps, telemetry.frame_ms, telemetry.msaa_samples, telemetry.object_count
    ));
    ui.separator();

    ui.horizontal(|ui| {
        ui.label("Clear color");
        let mut rgb = state.clear_color.to_array();
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            state.clear_color = Vec3::from_array(rgb);
        }
    });

    // Exposure has no valid range; the slider range only sets its travel.
    ui.add(
        egui::Slider::new(&mut state.settings.exposure, 0.0..=2.0)
            .text("Exposure")
            .clamping(egui::SliderClamping::Never),
    );
    ui.add(
        egui::Slider::new(&mut state.settings.height_scale, 0.0..=1.0)
            .text("Height scale")
            .logarithmic(true)
            .clamping(egui::SliderClamping::Edits),
    );
    ui.horizontal(|ui| {
        ui.checkbox(&mut state.settings.hdr, "HDR");
        ui.checkbox(&mut state.settings.bloom, "Bloom");
        ui.checkbox(&mut state.settings.grayscale, "Grayscale");
    });

    egui::CollapsingHeader::new("Placements")
        .default_open(true)
        .show(ui, |ui| {
            for slot in PlacementSlot::ALL {
                let placement = state.placement_mut(slot);
                ui.label(slot.label());
                drag_vec3(ui, "position", &mut placement.position, 0.01);
                ui.horizontal(|ui| {
                    ui.label("scale");
                    ui.add(egui::DragValue::new(&mut placement.scale).speed(0.001));
                });
            }
        });

    egui::CollapsingHeader::new("Point light attenuation")
        .default_open(true)
        .show(ui, |ui| {
            let [constant, linear, quadratic] = &mut state.light_attenuation;
            ui.horizontal(|ui| {
                ui.add(egui::DragValue::new(constant).speed(0.01).prefix("c "));
                ui.add(egui::DragValue::new(linear).speed(0.001).prefix("l "));
                ui.add(egui::DragValue::new(quadratic).speed(0.0001).prefix("q "));
            });
        });

    egui::CollapsingHeader::new("Camera")
        .default_open(true)
        .show(ui, |ui| {
            let camera = &state.camera;
            ui.label(format!(
                "position  {:.3} {:.3} {:.3}",
                camera.position.x, camera.position.y, camera.position.z
            ));
            ui.label(format!(
                "front     {:.3} {:.3} {:.3}",
                camera.front.x, camera.front.y, camera.front.z
            ));
            ui.label(format!(
                "yaw {:.1}  pitch {:.1}  fov {:.1}",
                camera.yaw, camera.pitch, camera.zoom
            ));
            ui.checkbox(&mut state.camera_mouse_look, "Camera mouse update");
        });
}

fn drag_vec3(ui: &mut egui::Ui, label: &str, value: &mut Vec3, speed: f64) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut value.x).speed(speed).prefix("x "));
        ui.add(egui::DragValue::new(&mut value.y).speed(speed).prefix("y "));
        ui.add(egui::DragValue::new(&mut value.z).speed(speed).prefix("z "));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(state: &mut ProgramState) {
        let ctx = egui::Context::default();
        let telemetry = Telemetry::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| show_panel(ctx, state, &telemetry));
    }

    #[test]
    fn drawing_the_panel_keeps_exposure_above_slider_range() {
        let mut state = ProgramState::default();
        state.settings.exposure = 5.0;
        run_frame(&mut state);
        assert_eq!(state.settings.exposure, 5.0);
    }

    #[test]
    fn drawing_the_panel_keeps_negative_exposure() {
        let mut state = ProgramState::default();
        state.settings.exposure = -0.5;
        run_frame(&mut state);
        assert_eq!(state.settings.exposure, -0.5);
    }

    #[test]
    fn drawing_the_panel_leaves_state_untouched() {
        let mut state = ProgramState::default();
        state.settings.height_scale = 0.1;
        state.light_attenuation = [1.0, 0.22, 0.2];
        let before = state.clone();
        run_frame(&mut state);
        assert_eq!(state, before);
    }
}
