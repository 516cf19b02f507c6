//! Native window and frame loop.

mod app;
mod frame_loop;
mod timing;

pub use app::engine_key;
pub use frame_loop::FrameLoop;
pub use timing::FrameTiming;

use std::path::PathBuf;

use anyhow::Result;
use winit::event_loop::EventLoop;

use crate::engine::Engine;
use crate::settings::Settings;

/// Open the window and render until it is closed. Initialization failures
/// (adapter, device, surface format, shaders) are returned after the event
/// loop exits. On close the current toggles are saved to `settings_path`, or
/// to the default location when it is `None`.
pub fn run(settings: Settings, settings_path: Option<PathBuf>, engine: Box<dyn Engine>) -> Result<()> {
    settings.validate()?;

    let event_loop = EventLoop::new()?;
    let mut app = app::App::new(settings, settings_path, engine);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
