#![forbid(unsafe_code)]

//! Core: launch parameters, screen selection, and logging.
//!
//! Everything here is pure and synchronous. The reactive runtime lives in
//! `joist-runtime`.

pub mod logging;
pub mod query;
pub mod screen_selector;

#[cfg(feature = "tracing")]
pub use logging::debug;

pub use query::{Param, QueryError, QueryParameters};
pub use screen_selector::{ScreenParameters, ScreenSelection, ScreenSelectionError, select_screens};
