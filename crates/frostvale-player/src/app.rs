//! Player application implementing winit ApplicationHandler
//!
//! Owns the program state and drives one frame per redraw: input, controls,
//! light animation, overlay UI, then the render graph.

use crate::config::PlayerConfig;
use crate::overlay::{DebugOverlay, Telemetry};
use anyhow::Context;
use frostvale_core::{ProgramState, SceneDescription};
use frostvale_render::{FrameInputs, OverlayPainter, RenderContext, RendererConfig, SceneRenderer};
use frostvale_runtime::{Controls, FrameClock, InputState};
use log::{error, info, warn};
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Window, WindowId};

/// Pixels of trackpad scroll that count as one wheel line.
const PIXELS_PER_SCROLL_LINE: f32 = 20.0;

pub struct FrostvaleApp {
    config: PlayerConfig,
    scene: SceneDescription,
    pub state: ProgramState,

    clock: FrameClock,
    input: InputState,
    controls: Controls,

    window: Option<Arc<Window>>,
    render_context: Option<RenderContext>,
    renderer: Option<SceneRenderer>,
    overlay: Option<DebugOverlay>,

    cursor_captured: bool,
    startup_error: Option<anyhow::Error>,
}

impl FrostvaleApp {
    pub fn new(config: PlayerConfig, scene: SceneDescription, state: ProgramState) -> Self {
        Self {
            config,
            scene,
            state,
            clock: FrameClock::new(),
            input: InputState::new(),
            controls: Controls::default(),
            window: None,
            render_context: None,
            renderer: None,
            overlay: None,
            cursor_captured: false,
            startup_error: None,
        }
    }

    /// The error that stopped the event loop during startup, if any.
    pub fn take_startup_error(&mut self) -> Option<anyhow::Error> {
        self.startup_error.take()
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title("Frostvale")
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );
        if self.config.window.fullscreen {
            window.set_fullscreen(Some(winit::window::Fullscreen::Borderless(None)));
        }

        let render_context =
            pollster::block_on(RenderContext::new(window.clone(), self.config.window.vsync))
                .context("Failed to create render context")?;

        let renderer = SceneRenderer::new(
            &render_context,
            &self.scene,
            RendererConfig {
                msaa_samples: self.config.render.msaa_samples,
            },
        )
        .context("Failed to create scene renderer")?;

        let overlay = DebugOverlay::new(
            &window,
            &render_context.device,
            render_context.surface_format(),
        );

        info!(
            "Scene '{}': {} objects, {}x{}, MSAA x{}, {} blur passes",
            self.scene.name,
            renderer.object_count(),
            render_context.config.width,
            render_context.config.height,
            renderer.sample_count(),
            self.state.settings.blur_iterations
        );

        self.window = Some(window);
        self.render_context = Some(render_context);
        self.renderer = Some(renderer);
        self.overlay = Some(overlay);
        self.update_cursor();
        Ok(())
    }

    fn capture_cursor(&mut self) {
        if let Some(window) = &self.window {
            // Try confined first, then locked
            let _ = window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
            window.set_cursor_visible(false);
            self.cursor_captured = true;
        }
    }

    fn release_cursor(&mut self) {
        if let Some(window) = &self.window {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
            window.set_cursor_visible(true);
            self.cursor_captured = false;
        }
    }

    fn update_cursor(&mut self) {
        let wanted = wants_cursor_capture(&self.state);
        if wanted && !self.cursor_captured {
            self.capture_cursor();
        } else if !wanted && self.cursor_captured {
            self.release_cursor();
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        self.clock.tick();
        let delta_time = self.clock.delta_time as f32;

        self.controls.keyboard_captured = self.state.overlay_enabled
            && self.overlay.as_ref().is_some_and(|o| o.wants_keyboard());
        let outcome = self.controls.apply(&self.input, &mut self.state, delta_time);
        self.input.end_frame();

        if outcome.exit {
            event_loop.exit();
            return;
        }
        if let Some(visible) = outcome.overlay {
            if !visible {
                self.state.camera_mouse_look = true;
            }
            info!("Overlay: {}", if visible { "on" } else { "off" });
        }
        self.update_cursor();

        self.scene.lights.animate(self.clock.total_time as f32);
        if let Some(light) = self.scene.lights.points.first_mut() {
            light.set_attenuation_coefficients(self.state.light_attenuation);
        }

        let (Some(window), Some(context), Some(renderer), Some(overlay)) = (
            &self.window,
            &self.render_context,
            &mut self.renderer,
            &mut self.overlay,
        ) else {
            return;
        };

        if self.state.overlay_enabled {
            let telemetry = Telemetry {
                fps: self.clock.fps(),
                frame_ms: self.clock.delta_time * 1000.0,
                msaa_samples: renderer.sample_count(),
                object_count: renderer.object_count(),
            };
            overlay.prepare(
                window,
                [context.config.width, context.config.height],
                &mut self.state,
                &telemetry,
            );
        } else {
            overlay.discard_input(window);
        }

        let inputs = FrameInputs {
            camera: &self.state.camera,
            lights: &self.scene.lights,
            placements: &self.state.placements,
            settings: &self.state.settings,
            clear_color: self.state.clear_color,
            overlay_visible: self.state.overlay_enabled,
        };
        let painter: &mut dyn OverlayPainter = overlay;
        if let Err(e) = renderer.render(context, &inputs, Some(painter)) {
            error!("Render error: {}", e);
        }
    }
}

impl ApplicationHandler for FrostvaleApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.startup_error.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // While visible, egui sees the event first; keyboard events always
        // reach the input state so releases are never lost.
        if routes_events_to_overlay(&self.state) {
            if let (Some(overlay), Some(window)) = (&mut self.overlay, &self.window) {
                let consumed = overlay.on_window_event(window, &event);
                if consumed && !matches!(event, WindowEvent::KeyboardInput { .. }) {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(context) = &mut self.render_context {
                    context.resize(new_size);
                }
            }

            WindowEvent::Focused(false) => {
                self.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.input.process_key_down(key_code),
                        ElementState::Released => self.input.process_key_up(key_code),
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.input.process_mouse_move(position.x, position.y);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.input.process_scroll(scroll_lines(delta));
            }

            WindowEvent::MouseInput { state, button, .. } => {
                // Clicking back into the window re-grabs a cursor the OS released.
                if state == ElementState::Pressed
                    && button == MouseButton::Left
                    && wants_cursor_capture(&self.state)
                {
                    self.capture_cursor();
                }
            }

            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if !self.cursor_captured {
            return;
        }

        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_raw_delta(delta.0, delta.1);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.render_context.is_none() {
            return;
        }
        let path = &self.config.paths.state_file;
        match self.state.save_to_file(path) {
            Ok(()) => info!("Saved program state to {}", path.display()),
            Err(e) => warn!("Failed to save program state to {}: {}", path.display(), e),
        }
    }
}

/// egui only receives window events while the overlay is on screen.
fn routes_events_to_overlay(state: &ProgramState) -> bool {
    state.overlay_enabled
}

/// The cursor is grabbed only while the camera follows the mouse.
fn wants_cursor_capture(state: &ProgramState) -> bool {
    !state.overlay_enabled && state.camera_mouse_look
}

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_SCROLL_LINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn overlay_releases_the_cursor() {
        let mut state = ProgramState::default();
        assert!(wants_cursor_capture(&state));
        state.overlay_enabled = true;
        assert!(!wants_cursor_capture(&state));
    }

    #[test]
    fn hidden_overlay_receives_no_window_events() {
        let mut state = ProgramState::default();
        assert!(!routes_events_to_overlay(&state));
        state.overlay_enabled = true;
        assert!(routes_events_to_overlay(&state));
    }

    #[test]
    fn mouse_look_off_releases_the_cursor() {
        let state = ProgramState {
            camera_mouse_look: false,
            ..Default::default()
        };
        assert!(!wants_cursor_capture(&state));
    }

    #[test]
    fn scroll_deltas_convert_to_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 40.0));
        assert_eq!(scroll_lines(pixels), 2.0);
    }
}
