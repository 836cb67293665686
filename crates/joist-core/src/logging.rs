#![forbid(unsafe_code)]

//! Logging and tracing support.
//!
//! With the `tracing` feature, `debug!` is tracing's macro. Without it, a
//! no-op macro of the same name keeps call sites compiling.
//! The `tracing-json` feature adds [`init_subscriber`] for binaries.

#[cfg(feature = "tracing")]
pub use tracing::debug;

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// No-op debug macro when tracing is disabled.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }
}

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// `default_directive` applies when `RUST_LOG` is unset. Returns `false` if a
/// global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_subscriber(default_directive: &str, json: bool) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn debug_accepts_fields_with_or_without_tracing() {
        crate::debug!(key = "brand", count = 2, "structured event");
        crate::debug!("plain event");
    }
}
