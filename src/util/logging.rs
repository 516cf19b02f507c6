//! Tracing subscriber setup shared by the CLI and the viewer.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "wavefront=info,wgpu_core=warn,wgpu_hal=warn";

/// Keeps the optional Chrome trace writer alive; flushes `trace.json` on drop.
#[derive(Default)]
pub struct TracingGuard {
    #[cfg(feature = "viewer")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Install the global subscriber: fmt output filtered by `RUST_LOG`, plus a Chrome
/// trace layer when `WAVEFRONT_TRACE=1` (viewer builds only).
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() -> TracingGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    #[cfg(feature = "viewer")]
    {
        if std::env::var("WAVEFRONT_TRACE").ok().as_deref() == Some("1") {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file("trace.json")
                .build();
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(chrome_layer);
            if subscriber.try_init().is_err() {
                return TracingGuard::default();
            }
            return TracingGuard { _chrome: Some(guard) };
        }
    }

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
    TracingGuard::default()
}
