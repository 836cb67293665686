#![forbid(unsafe_code)]

//! joist public facade crate.
//!
//! Re-exports the launch-parameter, screen-selection, locale and description
//! types from the internal crates, plus a prelude and a single error type
//! for simulation bootstrap code.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use joist_core::{
    Param, QueryError, QueryParameters, ScreenParameters, ScreenSelection, ScreenSelectionError,
    select_screens,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use joist_runtime::{
    AccessibleNode, Attribute, Computed, DescriptionContext, DescriptionError, DescriptionLogic,
    DescriptionRegistry, DescriptionService, DescriptionStrings, Direction, Emitter,
    FALLBACK_LOCALE, Locale, LocaleData, LocaleError, LocaleState, Multilink, NavigationError,
    Navigator, NodeHandle, Observable, SceneNode, Subscription,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for joist bootstrap code.
#[derive(Debug)]
pub enum Error {
    /// Malformed launch query.
    Query(QueryError),
    /// Launch parameters describe an impossible screen set.
    Screens(ScreenSelectionError),
    /// Locale table could not be built.
    #[cfg(feature = "runtime")]
    Locale(LocaleError),
    /// Description API misuse or missing plugin.
    #[cfg(feature = "runtime")]
    Description(DescriptionError),
    /// Navigation to a screen outside the selection.
    #[cfg(feature = "runtime")]
    Navigation(NavigationError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(err) => write!(f, "{err}"),
            Self::Screens(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Locale(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Description(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Navigation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Query(err) => Some(err),
            Self::Screens(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Locale(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Description(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Navigation(err) => Some(err),
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Self::Query(err)
    }
}

impl From<ScreenSelectionError> for Error {
    fn from(err: ScreenSelectionError) -> Self {
        Self::Screens(err)
    }
}

#[cfg(feature = "runtime")]
impl From<LocaleError> for Error {
    fn from(err: LocaleError) -> Self {
        Self::Locale(err)
    }
}

#[cfg(feature = "runtime")]
impl From<DescriptionError> for Error {
    fn from(err: DescriptionError) -> Self {
        Self::Description(err)
    }
}

#[cfg(feature = "runtime")]
impl From<NavigationError> for Error {
    fn from(err: NavigationError) -> Self {
        Self::Navigation(err)
    }
}

/// Standard result type for joist APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse `query` and select screens from `all_sim_screens` in one step.
pub fn select_from_query<S, F>(
    all_sim_screens: &[S],
    query: &str,
    create_home_screen: F,
) -> Result<ScreenSelection<S>>
where
    S: Clone + PartialEq,
    F: FnOnce(&[S]) -> S,
{
    let params = QueryParameters::parse(query)?;
    Ok(select_screens(
        all_sim_screens,
        &ScreenParameters::from(&params),
        create_home_screen,
    )?)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{Error, QueryParameters, Result, ScreenSelection, select_from_query};

    #[cfg(feature = "runtime")]
    pub use crate::{
        DescriptionContext, DescriptionLogic, DescriptionService, DescriptionStrings, LocaleState,
        Navigator, Observable,
    };

    pub use crate::core;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use joist_core as core;
#[cfg(feature = "runtime")]
pub use joist_runtime as runtime;
