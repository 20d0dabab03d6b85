//! Thin `tracing-subscriber` init wired to the run's feedback
//! verbosity, so progress reports become structured log events rather
//! than bare `println!`.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install a global subscriber at the verbosity implied by `feedback`:
/// `0` -> off, `1` -> info, `2+` -> debug. Honors `RUST_LOG` if set,
/// so a caller embedding this crate can still override it. Safe to
/// call more than once; later calls are no-ops.
pub fn init_tracing(feedback: u8) {
    let default_level = match feedback {
        0 => LevelFilter::OFF,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
