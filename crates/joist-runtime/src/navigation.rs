#![forbid(unsafe_code)]

//! Screen navigation over a validated [`ScreenSelection`].
//!
//! `next`/`prev` cycle through the selected simulation screens and wrap
//! around. The home screen sits outside the cycle: stepping from home lands
//! on the first (or last) simulation screen.

use joist_core::ScreenSelection;
use thiserror::Error;

use crate::reactive::{Observable, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("screen is not part of this selection")]
    UnknownScreen,

    #[error("this selection has no home screen")]
    NoHomeScreen,
}

/// Tracks the selected screen of a launched simulation.
#[derive(Debug)]
pub struct Navigator<S> {
    selection: ScreenSelection<S>,
    selected: Observable<S>,
}

impl<S: Clone + PartialEq + std::fmt::Debug + 'static> Navigator<S> {
    /// Start on the selection's initial screen.
    #[must_use]
    pub fn new(selection: ScreenSelection<S>) -> Self {
        let selected = Observable::new(selection.initial_screen.clone());
        Self {
            selection,
            selected,
        }
    }

    #[must_use]
    pub fn selection(&self) -> &ScreenSelection<S> {
        &self.selection
    }

    #[must_use]
    pub fn selected(&self) -> S {
        self.selected.get()
    }

    /// The observable selected-screen cell.
    #[must_use]
    pub fn selected_property(&self) -> &Observable<S> {
        &self.selected
    }

    pub fn subscribe(&self, listener: impl Fn(&S) + 'static) -> Subscription {
        self.selected.subscribe(listener)
    }

    /// Select any screen of the selection, home included.
    pub fn select(&self, screen: &S) -> Result<(), NavigationError> {
        if !self.selection.screens.contains(screen) {
            return Err(NavigationError::UnknownScreen);
        }
        if self.selected.set(screen.clone()) {
            tracing::debug!(screen = ?screen, "screen selected");
        }
        Ok(())
    }

    pub fn go_home(&self) -> Result<(), NavigationError> {
        let home = self
            .selection
            .home_screen
            .clone()
            .ok_or(NavigationError::NoHomeScreen)?;
        self.select(&home)
    }

    #[must_use]
    pub fn is_home_selected(&self) -> bool {
        self.selection
            .home_screen
            .as_ref()
            .is_some_and(|home| self.selected.with(|s| s == home))
    }

    /// Position of the selected screen among the simulation screens.
    fn sim_index(&self) -> Option<usize> {
        self.selected
            .with(|s| self.selection.selected_sim_screens.iter().position(|x| x == s))
    }

    /// Next simulation screen (wraps around). Returns the new selection.
    ///
    /// With no simulation screens the selection is left unchanged.
    pub fn next(&self) -> S {
        self.step(|i, len| i.map_or(0, |i| (i + 1) % len))
    }

    /// Previous simulation screen (wraps around). Returns the new selection.
    pub fn prev(&self) -> S {
        self.step(|i, len| i.map_or(len - 1, |i| (i + len - 1) % len))
    }

    /// `target` receives the current sim index and a nonzero screen count.
    fn step(&self, target: impl FnOnce(Option<usize>, usize) -> usize) -> S {
        let screens = &self.selection.selected_sim_screens;
        if screens.is_empty() {
            return self.selected();
        }
        let screen = screens[target(self.sim_index(), screens.len())].clone();
        self.selected.set(screen.clone());
        screen
    }
}
