//! winit application: window creation, input forwarding, redraw scheduling.

use std::path::PathBuf;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowId};

use super::frame_loop::FrameLoop;
use crate::engine::Engine;
use crate::settings::Settings;
use crate::util::Error;

/// Map a typed key to the character the engine expects: ASCII letters
/// lower-cased, digits as-is, everything else dropped.
pub fn engine_key(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let c = chars.next()?;
    if chars.next().is_some() || !c.is_ascii_alphanumeric() {
        return None;
    }
    Some(c.to_ascii_lowercase())
}

pub struct App {
    settings: Settings,
    /// Where settings are saved on close; `None` uses the default location.
    settings_path: Option<PathBuf>,
    engine: Option<Box<dyn Engine>>,
    frame_loop: Option<FrameLoop>,
    pointer_captured: bool,
    pub error: Option<Error>,
}

impl App {
    pub fn new(settings: Settings, settings_path: Option<PathBuf>, engine: Box<dyn Engine>) -> Self {
        Self {
            settings,
            settings_path,
            engine: Some(engine),
            frame_loop: None,
            pointer_captured: false,
            error: None,
        }
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>, Error> {
        let mut attrs = Window::default_attributes()
            .with_title("wavefront")
            .with_inner_size(PhysicalSize::new(self.settings.width, self.settings.height()))
            .with_resizable(false);
        if self.settings.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        event_loop
            .create_window(attrs)
            .map(Arc::new)
            .map_err(|e| Error::Surface(e.to_string()))
    }

    /// Keep the session's toggles for the next run.
    fn persist_settings(&mut self) {
        let Some(fl) = &self.frame_loop else {
            return;
        };
        fl.state().write_back(&mut self.settings);
        let saved = match &self.settings_path {
            Some(path) => self.settings.save_to(path),
            None => self.settings.save(),
        };
        if let Err(e) = saved {
            tracing::warn!("failed to save settings: {e}");
        }
    }

    fn capture_pointer(&mut self, window: &Window) {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(e) = grabbed {
            tracing::debug!("cursor grab unavailable: {e}");
        }
        window.set_cursor_visible(false);
        self.pointer_captured = true;
    }

    fn release_pointer(&mut self, window: &Window) {
        let _ = window.set_cursor_grab(CursorGrabMode::None);
        window.set_cursor_visible(true);
        self.pointer_captured = false;
    }

    fn on_key(&mut self, event: KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let Some(fl) = self.frame_loop.as_mut() else {
            return;
        };
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => {
                let window = fl.window.clone();
                self.release_pointer(&window);
            }
            Key::Named(NamedKey::Tab) => fl.toggle_edit_mode(),
            Key::Character(text) => {
                if let Some(c) = engine_key(text) {
                    fl.key_down(c);
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.frame_loop.is_some() {
            return;
        }
        let Some(engine) = self.engine.take() else {
            return;
        };

        let result = self
            .create_window(event_loop)
            .and_then(|window| FrameLoop::new(window, &self.settings, engine));
        match result {
            Ok(fl) => self.frame_loop = Some(fl),
            Err(e) => {
                tracing::error!("failed to initialize: {e}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.persist_settings();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Some(fl) = self.frame_loop.as_mut() {
                    fl.render_frame();
                }
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                if let Some(window) = self.frame_loop.as_ref().map(|fl| fl.window.clone()) {
                    if !self.pointer_captured {
                        self.capture_pointer(&window);
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if !self.pointer_captured {
            return;
        }
        if let (Some(fl), DeviceEvent::MouseMotion { delta: (dx, dy) }) = (self.frame_loop.as_mut(), event) {
            fl.mouse_move(dx as f32, dy as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(fl) = &self.frame_loop {
            fl.window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_key() {
        assert_eq!(engine_key("W"), Some('w'));
        assert_eq!(engine_key("f"), Some('f'));
        assert_eq!(engine_key("7"), Some('7'));
        assert_eq!(engine_key(" "), None);
        assert_eq!(engine_key("ß"), None);
        assert_eq!(engine_key("ab"), None);
        assert_eq!(engine_key(""), None);
    }
}
