use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use pixels::{Pixels, SurfaceTexture};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowId};

use errp_core::{Key, SceneElement, Surface, SurfaceError};
use errp_experiment::Config;
use errp_timing::precise_sleep;

use crate::render::Renderer;

/// Polling interval while blocked on an operator keypress.
const KEY_POLL: Duration = Duration::from_millis(5);

/// winit + pixels implementation of the presentation surface. The event
/// loop is pumped from within each surface call, which keeps the sequential
/// session loop in control instead of inverting it into callbacks.
pub struct WinitSurface {
    event_loop: EventLoop<()>,
    state: WindowState,
    scene: Vec<SceneElement>,
}

struct WindowState {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Renderer,
    keys: VecDeque<Key>,
    escape: bool,
    closed: bool,
    fullscreen: bool,
    window_size: (u32, u32),
}

impl WinitSurface {
    pub fn new(config: &Config) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        let mut surface = Self {
            event_loop,
            state: WindowState {
                window: None,
                pixels: None,
                renderer: Renderer::new(config),
                keys: VecDeque::new(),
                escape: false,
                closed: false,
                fullscreen: config.fullscreen,
                window_size: config.window_size,
            },
            scene: Vec::new(),
        };

        // Drive the loop until the window and pixel buffer exist.
        for _ in 0..600 {
            surface.pump()?;
            if surface.state.pixels.is_some() {
                break;
            }
            precise_sleep(Duration::from_millis(5));
        }
        if surface.state.pixels.is_none() {
            bail!("window creation timed out");
        }

        info!(
            fullscreen = surface.state.fullscreen,
            "presentation surface ready"
        );
        Ok(surface)
    }

    fn pump(&mut self) -> Result<(), SurfaceError> {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);
        if matches!(status, PumpStatus::Exit(_)) {
            self.state.closed = true;
        }
        if self.state.closed {
            return Err(SurfaceError::Closed);
        }
        Ok(())
    }
}

impl Surface for WinitSurface {
    fn draw_frame(&mut self, scene: &[SceneElement]) -> Result<(), SurfaceError> {
        self.scene = scene.to_vec();
        Ok(())
    }

    fn flip(&mut self) -> Result<(), SurfaceError> {
        self.pump()?;
        let pixels = self.state.pixels.as_mut().ok_or(SurfaceError::Closed)?;
        self.state.renderer.render(&self.scene, pixels.frame_mut());
        pixels
            .render()
            .map_err(|e| SurfaceError::Backend(e.to_string()))?;
        if let Some(window) = &self.state.window {
            window.request_redraw();
        }
        Ok(())
    }

    fn poll_escape(&mut self) -> Result<bool, SurfaceError> {
        match self.pump() {
            Ok(()) => {}
            // A closed window counts as an abort request, not a failure.
            Err(SurfaceError::Closed) => return Ok(true),
            Err(err) => return Err(err),
        }
        // Phases do not consume ordinary keys; drop them so a stray press
        // does not leak into the next keypress wait.
        self.state.keys.clear();
        Ok(std::mem::take(&mut self.state.escape))
    }

    fn wait_for_key(&mut self, keys: &[Key]) -> Result<Key, SurfaceError> {
        loop {
            match self.pump() {
                Ok(()) => {}
                Err(SurfaceError::Closed) => return Ok(Key::Escape),
                Err(err) => return Err(err),
            }
            while let Some(key) = self.state.keys.pop_front() {
                if key == Key::Escape || keys.contains(&key) {
                    return Ok(key);
                }
            }
            precise_sleep(KEY_POLL);
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut attrs = Window::default_attributes()
            .with_title("Observation ErrP")
            .with_resizable(false);
        if self.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            attrs = attrs.with_inner_size(winit::dpi::PhysicalSize::new(
                self.window_size.0,
                self.window_size.1,
            ));
        }

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!(error = %err, "window creation failed");
                event_loop.exit();
                return;
            }
        };
        window.set_cursor_visible(false);

        let size = window.inner_size();
        let texture = SurfaceTexture::new(size.width, size.height, window.clone());
        match Pixels::new(size.width, size.height, texture) {
            Ok(pixels) => {
                self.renderer.resize(size.width, size.height);
                self.pixels = Some(pixels);
                self.window = Some(window);
            }
            Err(err) => {
                error!(error = %err, "pixel surface creation failed");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.closed = true;
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match code {
                        KeyCode::Escape => {
                            self.escape = true;
                            self.keys.push_back(Key::Escape);
                        }
                        KeyCode::Space => self.keys.push_back(Key::Space),
                        KeyCode::Enter => self.keys.push_back(Key::Enter),
                        _ => {}
                    }
                }
            }
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Some(pixels) = &mut self.pixels {
                    if let Err(err) = pixels.resize_surface(size.width, size.height) {
                        error!(error = %err, "surface resize failed");
                    }
                    if let Err(err) = pixels.resize_buffer(size.width, size.height) {
                        error!(error = %err, "buffer resize failed");
                    }
                }
                self.renderer.resize(size.width, size.height);
            }
            _ => {}
        }
    }
}

impl Drop for WinitSurface {
    fn drop(&mut self) {
        if let Some(window) = &self.state.window {
            window.set_cursor_visible(true);
        }
    }
}
