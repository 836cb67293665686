//! Property-based invariant tests for step sequences.
//!
//! Arbitrary interleavings of navigation, locale, plugin and model steps are
//! applied to a booted simulation.
//!
//! # Invariants
//!
//! 1. **No leaked listeners**: the height cell carries exactly the listeners
//!    of the currently loaded plugin, however many relaunches happened
//! 2. **Baseline last**: the reported locale order always ends with `en`
//! 3. **Live context**: a description context is active after every step
//! 4. **Navigable screen**: the selected screen is always in the screen list

use joist_demo::app::{DemoApp, LaunchConfig, Step};
use joist_demo::sim::{FULL_PLUGIN, TERSE_PLUGIN};
use proptest::prelude::*;

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Next),
        Just(Step::Prev),
        Just(Step::Home),
        Just(Step::Release),
        (1usize..=3).prop_map(Step::Screen),
        prop::sample::select(vec!["en", "es", "es_MX", "fr", "ar", "xx"])
            .prop_map(|l| Step::Locale(l.to_string())),
        prop::collection::vec(prop::sample::select(vec!["es", "fr", "de"]), 0..3)
            .prop_map(|list| Step::Fallbacks(list.into_iter().map(str::to_string).collect())),
        prop::sample::select(vec![FULL_PLUGIN, TERSE_PLUGIN])
            .prop_map(|p| Step::Plugin(p.to_string())),
        (-1.0f64..7.0).prop_map(Step::Height),
        any::<bool>().prop_map(Step::Friction),
    ]
}

fn launch_query() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["", "?homeScreen=false", "?screens=2,1", "?screens=3"])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn step_sequences_keep_invariants(
        query in launch_query(),
        steps in prop::collection::vec(step_strategy(), 0..24),
    ) {
        let app = DemoApp::launch(&LaunchConfig {
            query: query.to_string(),
            ..LaunchConfig::default()
        })
        .unwrap();
        let mut plugin = FULL_PLUGIN;

        for step in &steps {
            // Home and out-of-selection screens are rejected on some launches.
            if app.apply(step).is_ok() {
                if let Step::Plugin(name) = step {
                    plugin = if name == TERSE_PLUGIN { TERSE_PLUGIN } else { FULL_PLUGIN };
                }
            }

            let report = app.report();
            let expected_listeners = if plugin == FULL_PLUGIN { 2 } else { 0 };
            prop_assert_eq!(app.model().height.listener_count(), expected_listeners);
            prop_assert_eq!(report.locale_order.last().map(String::as_str), Some("en"));
            prop_assert!(report.active_context.is_some());
            prop_assert!(report.screens.contains(&report.screen));
        }
    }
}
