//! Property-based invariant tests for screen selection.
//!
//! These tests verify structural invariants that must hold for any
//! accepted combination of launch parameters:
//!
//! 1. Screen count: `screens.len() == selected.len() + home as usize`.
//! 2. A single selected screen has no home screen and is the initial screen.
//! 3. `selected_sim_screens` follows the `screens` parameter order exactly.
//! 4. A one-screen sim rejects any explicitly specified screen parameter.
//! 5. The initial screen is always navigable.
//! 6. No panics for arbitrary index lists.

use joist_core::query::Param;
use joist_core::screen_selector::{ScreenParameters, ScreenSelectionError, select_screens};
use proptest::prelude::*;

const HOME: u32 = u32::MAX;

// ── Helpers ─────────────────────────────────────────────────────────────

fn sim_screens(count: usize) -> Vec<u32> {
    (1..=count as u32).collect()
}

/// A valid `screens` parameter: a shuffled, non-empty subset of `1..=count`.
fn screens_param_strategy(count: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((1..=count).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_flat_map(move |shuffled| {
            (1..=shuffled.len()).prop_map(move |n| shuffled[..n].to_vec())
        })
}

fn params_strategy() -> impl Strategy<Value = (usize, ScreenParameters)> {
    (2usize..=6).prop_flat_map(|count| {
        (
            Just(count),
            proptest::option::of(any::<bool>()),
            proptest::option::of(screens_param_strategy(count)),
        )
            .prop_map(|(count, home, screens)| {
                let mut params = ScreenParameters::default();
                if let Some(home) = home {
                    params.home_screen = Param::specified(home);
                }
                if let Some(screens) = screens {
                    params.screens = Param::specified(screens);
                }
                (count, params)
            })
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3, 5. Accepted selections are well-formed
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn accepted_selections_are_well_formed((count, params) in params_strategy()) {
        let all = sim_screens(count);
        let Ok(sel) = select_screens(&all, &params, |_| HOME) else {
            // Only the single-screen/homeScreen=true combination is rejected here.
            let single = params.screens.specified && params.screens.value.len() == 1;
            prop_assert!(single && params.home_screen.specified && params.home_screen.value);
            return Ok(());
        };

        prop_assert_eq!(
            sel.screens.len(),
            sel.selected_sim_screens.len() + usize::from(sel.home_screen.is_some())
        );
        if let Some(home) = sel.home_screen {
            prop_assert_eq!(sel.screens[0], home);
        }
        if sel.selected_sim_screens.len() == 1 {
            prop_assert!(sel.home_screen.is_none());
            prop_assert_eq!(sel.initial_screen, sel.selected_sim_screens[0]);
        }
        if params.screens.specified {
            let expected: Vec<u32> = params.screens.value.iter().map(|&i| all[i - 1]).collect();
            prop_assert_eq!(&sel.selected_sim_screens, &expected);
        } else {
            prop_assert_eq!(&sel.selected_sim_screens, &all);
        }
        prop_assert!(sel.screens.contains(&sel.initial_screen));
    }

    #[test]
    fn home_screen_false_never_creates_home((count, mut params) in params_strategy()) {
        params.home_screen = Param::specified(false);
        let sel = select_screens(&sim_screens(count), &params, |_| HOME).unwrap();
        prop_assert!(sel.home_screen.is_none());
        prop_assert_eq!(sel.initial_screen, sel.selected_sim_screens[0]);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Single-screen sims
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn single_screen_sim_rejects_specified_parameters(
        home in proptest::option::of(any::<bool>()),
        initial in proptest::option::of(0usize..3),
        screens in proptest::option::of(proptest::collection::vec(0usize..3, 0..3)),
    ) {
        let mut params = ScreenParameters::default();
        let any_specified = home.is_some() || initial.is_some() || screens.is_some();
        if let Some(home) = home {
            params.home_screen = Param::specified(home);
        }
        if let Some(initial) = initial {
            params.initial_screen = Param::specified(initial);
        }
        if let Some(screens) = screens {
            params.screens = Param::specified(screens);
        }

        let result = select_screens(&[7u32], &params, |_| HOME);
        if any_specified {
            let is_single_screen_error =
                matches!(result, Err(ScreenSelectionError::SingleScreenParameter { .. }));
            prop_assert!(is_single_screen_error);
        } else {
            let sel = result.unwrap();
            prop_assert_eq!(sel.screens, vec![7]);
            prop_assert_eq!(sel.initial_screen, 7);
        }
    }

    // ═════════════════════════════════════════════════════════════════════
    // 6. Arbitrary input never panics
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn arbitrary_indices_never_panic(
        count in 1usize..6,
        screens in proptest::collection::vec(0usize..10, 0..8),
        initial in 0usize..10,
        home in any::<bool>(),
    ) {
        let params = ScreenParameters {
            home_screen: Param::specified(home),
            initial_screen: Param::specified(initial),
            screens: Param::specified(screens),
        };
        let _ = select_screens(&sim_screens(count), &params, |_| HOME);
    }
}
