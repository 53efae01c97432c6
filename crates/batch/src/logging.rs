use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Installs a formatted tracing subscriber for batch runs.
///
/// Levels come from `CTRLPROP_LOG` (for example
/// `CTRLPROP_LOG=ctrlprop_core=debug,ctrlprop_batch=info`) and fall back to
/// `info` for the ctrlprop crates. Calling it again is a no-op, and an
/// already installed global subscriber is left in place.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("CTRLPROP_LOG")
            .unwrap_or_else(|_| EnvFilter::new("ctrlprop_core=info,ctrlprop_batch=info"));

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .with(filter)
            .try_init();
    });
}
