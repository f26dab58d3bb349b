//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honours `RUST_LOG`; calling it twice is harmless.
pub fn init() {
    let _ = env_logger::builder().try_init();
}
