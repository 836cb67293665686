#![forbid(unsafe_code)]

//! Screen selection from launch parameters.
//!
//! Given every screen a simulation declares and the `homeScreen`,
//! `initialScreen` and `screens` launch parameters, [`select_screens`]
//! decides which screens are shown, whether a home screen exists, which
//! screen is shown first, and the final navigation order.
//!
//! # Invariants
//!
//! 1. `screens.len() == selected_sim_screens.len() + home_screen.is_some() as usize`.
//! 2. The home screen, when present, is `screens[0]`.
//! 3. `selected_sim_screens` follows the order of the `screens` parameter.
//! 4. A single selected screen never gets a home screen, and is the initial screen.
//!
//! # Failure Modes
//!
//! | Scenario                                        | Error                          |
//! |-------------------------------------------------|--------------------------------|
//! | Any screen parameter on a one-screen sim        | `SingleScreenParameter`        |
//! | `screens` empty, out of range or repeated       | `EmptyScreens`, `InvalidScreenIndex`, `DuplicateScreen` |
//! | `homeScreen=true` with one selected screen      | `HomeScreenWithSingleScreen`   |
//! | `initialScreen` names an unselected screen      | `InitialScreenNotSelected`     |
//!
//! All of these are launch-configuration errors; callers abort startup.

use std::collections::HashSet;

use thiserror::Error;

use crate::query::{Param, QueryParameters};

/// Invalid screen-related launch parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenSelectionError {
    #[error("the simulation declares no screens")]
    NoScreens,

    #[error("cannot specify {parameter} for a single-screen simulation")]
    SingleScreenParameter { parameter: &'static str },

    #[error("screens must name at least one screen")]
    EmptyScreens,

    #[error("invalid screen index {index} (the simulation has {count} screens)")]
    InvalidScreenIndex { index: usize, count: usize },

    #[error("screen {index} is listed more than once in screens")]
    DuplicateScreen { index: usize },

    #[error("cannot specify homeScreen=true when only one screen is selected")]
    HomeScreenWithSingleScreen,

    #[error("initialScreen={index} is not among the selected screens")]
    InitialScreenNotSelected { index: usize },
}

/// Screen-related subset of the launch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenParameters {
    pub home_screen: Param<bool>,
    /// 1-based; `0` means the home screen, or the first screen without one.
    pub initial_screen: Param<usize>,
    /// 1-based indices into the declared screens.
    pub screens: Param<Vec<usize>>,
}

impl Default for ScreenParameters {
    fn default() -> Self {
        Self {
            home_screen: Param::default_value(true),
            initial_screen: Param::default_value(0),
            screens: Param::default_value(Vec::new()),
        }
    }
}

impl From<&QueryParameters> for ScreenParameters {
    fn from(query: &QueryParameters) -> Self {
        Self {
            home_screen: query.home_screen.clone(),
            initial_screen: query.initial_screen.clone(),
            screens: query.screens.clone(),
        }
    }
}

/// Result of screen selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSelection<S> {
    pub home_screen: Option<S>,
    pub initial_screen: S,
    pub selected_sim_screens: Vec<S>,
    /// Navigation order: home screen (if any) then `selected_sim_screens`.
    pub screens: Vec<S>,
}

/// Select and order screens.
///
/// `create_home_screen` is only called when a home screen will exist; it
/// receives the selected sim screens in display order.
pub fn select_screens<S, F>(
    all_sim_screens: &[S],
    params: &ScreenParameters,
    create_home_screen: F,
) -> Result<ScreenSelection<S>, ScreenSelectionError>
where
    S: Clone + PartialEq,
    F: FnOnce(&[S]) -> S,
{
    if all_sim_screens.is_empty() {
        return Err(ScreenSelectionError::NoScreens);
    }

    if all_sim_screens.len() == 1 {
        let parameter = if params.home_screen.specified {
            Some("homeScreen")
        } else if params.initial_screen.specified {
            Some("initialScreen")
        } else if params.screens.specified {
            Some("screens")
        } else {
            None
        };
        if let Some(parameter) = parameter {
            return Err(ScreenSelectionError::SingleScreenParameter { parameter });
        }
    }

    let selected_indices = selected_indices(all_sim_screens.len(), &params.screens)?;
    let selected_sim_screens: Vec<S> = selected_indices
        .iter()
        .map(|&i| all_sim_screens[i].clone())
        .collect();

    if selected_sim_screens.len() == 1 && params.home_screen.specified && params.home_screen.value
    {
        return Err(ScreenSelectionError::HomeScreenWithSingleScreen);
    }

    let initial_index = params.initial_screen.value;
    if initial_index != 0 {
        // Out-of-range and excluded screens are both "not selected".
        if !selected_indices.contains(&(initial_index - 1)) {
            return Err(ScreenSelectionError::InitialScreenNotSelected {
                index: initial_index,
            });
        }
    }

    let has_home_screen = selected_sim_screens.len() > 1 && params.home_screen.value;
    let home_screen = has_home_screen.then(|| create_home_screen(&selected_sim_screens));

    let initial_screen = if selected_sim_screens.len() == 1 {
        selected_sim_screens[0].clone()
    } else if initial_index == 0 {
        home_screen
            .clone()
            .unwrap_or_else(|| selected_sim_screens[0].clone())
    } else {
        all_sim_screens[initial_index - 1].clone()
    };

    let mut screens = Vec::with_capacity(selected_sim_screens.len() + 1);
    screens.extend(home_screen.iter().cloned());
    screens.extend(selected_sim_screens.iter().cloned());

    crate::debug!(
        selected = selected_sim_screens.len(),
        home_screen = home_screen.is_some(),
        "screens selected"
    );

    Ok(ScreenSelection {
        home_screen,
        initial_screen,
        selected_sim_screens,
        screens,
    })
}

/// 0-based indices of the selected screens, in display order.
fn selected_indices(
    count: usize,
    screens: &Param<Vec<usize>>,
) -> Result<Vec<usize>, ScreenSelectionError> {
    if !screens.specified {
        return Ok((0..count).collect());
    }
    if screens.value.is_empty() {
        return Err(ScreenSelectionError::EmptyScreens);
    }

    let mut seen = HashSet::with_capacity(screens.value.len());
    let mut indices = Vec::with_capacity(screens.value.len());
    for &index in &screens.value {
        if index == 0 || index > count {
            return Err(ScreenSelectionError::InvalidScreenIndex { index, count });
        }
        if !seen.insert(index) {
            return Err(ScreenSelectionError::DuplicateScreen { index });
        }
        indices.push(index - 1);
    }
    Ok(indices)
}
