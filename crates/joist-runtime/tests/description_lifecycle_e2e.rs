//! Description Lifecycle E2E Tests
//!
//! End-to-end validation of locale order, string merging and context
//! replacement through a [`DescriptionService`] wired to a [`LocaleState`].
//!
//! # Running Tests
//!
//! ```sh
//! cargo test -p joist-runtime --test description_lifecycle_e2e
//! ```
//!
//! # Invariants
//!
//! 1. **Fallback merge**: keys missing in the primary locale come from the
//!    next locale in the order
//! 2. **Single active context**: a locale switch disposes before relaunching
//! 3. **Full undo**: after the last dispose every node, property and listener
//!    list is back to its pre-launch state
//! 4. **Observable lifecycle**: reloads and disposals are logged

#![cfg(test)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use joist_runtime::{
    AccessibleNode, DescriptionContext, DescriptionLogic, DescriptionRegistry, DescriptionService,
    DescriptionStrings, Emitter, LocaleData, LocaleState, NodeHandle, Observable,
};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Utilities
// ============================================================================

fn log_jsonl(event: &str, case: &str, passed: bool, details: &str) {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    eprintln!(
        r#"{{"event":"{event}","case":"{case}","passed":{passed},"details":"{details}","timestamp":{timestamp}}}"#
    );
}

/// Captures event messages emitted while a closure runs.
struct EventCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor<'a>(&'a mut Option<String>);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut message = None;
        event.record(&mut MessageVisitor(&mut message));
        if let Some(message) = message {
            self.messages.lock().unwrap().push(message);
        }
    }
}

fn with_captured_events(f: impl FnOnce()) -> Vec<String> {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        messages: Arc::clone(&messages),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = messages.lock().unwrap().clone();
    captured
}

/// Sample model: a ball on a ramp with a "released" event.
struct RampModel {
    height: Observable<f64>,
    friction: Observable<bool>,
    released: Emitter<()>,
    status: Observable<String>,
}

impl RampModel {
    fn new() -> Self {
        Self {
            height: Observable::new(1.0),
            friction: Observable::new(false),
            released: Emitter::new(),
            status: Observable::new("ready".to_string()),
        }
    }
}

/// Logic that describes the ramp through every kind of context effect.
struct RampLogic {
    model: Rc<RampModel>,
    ball: NodeHandle<AccessibleNode>,
    releases_heard: Rc<Cell<u32>>,
}

impl DescriptionLogic for RampLogic {
    fn launch(&self, context: &DescriptionContext, strings: &DescriptionStrings) {
        let name = strings.get("ball.name").cloned();
        context
            .node_set(&self.ball, AccessibleNode::ACCESSIBLE_NAME, name)
            .unwrap();

        let pattern = strings.get("ball.height").cloned().unwrap_or_default();
        let ball = Rc::clone(&self.ball);
        context
            .link(&self.model.height, move |h| {
                ball.borrow_mut().description =
                    Some(pattern.replace("{{height}}", &format!("{h:.1}")));
            })
            .unwrap();

        let heard = Rc::clone(&self.releases_heard);
        context
            .add_listener(&self.model.released, move |_| heard.set(heard.get() + 1))
            .unwrap();

        let (height, friction, ball) = (
            self.model.height.clone(),
            self.model.friction.clone(),
            Rc::clone(&self.ball),
        );
        context
            .multilink(&[&self.model.height, &self.model.friction], move || {
                ball.borrow_mut().help_text =
                    Some(format!("h={} f={}", height.get(), friction.get()));
            })
            .unwrap();

        if let Some(status) = strings.get("status.described") {
            context
                .property_set(&self.model.status, status.clone())
                .unwrap();
        }
    }
}

fn strings(pairs: &[(&str, &str)]) -> DescriptionStrings {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

struct Harness {
    locale: LocaleState,
    service: DescriptionService,
    model: Rc<RampModel>,
    ball: NodeHandle<AccessibleNode>,
    releases_heard: Rc<Cell<u32>>,
}

impl Harness {
    fn new(locale: &str) -> Self {
        let locale = LocaleState::new(LocaleData::builtin(), locale);
        let service = DescriptionService::new(locale.order().clone(), DescriptionRegistry::new());
        service.register_strings(
            "en",
            strings(&[
                ("ball.name", "Ball"),
                ("ball.height", "Ball is {{height}} meters high"),
                ("status.described", "described"),
            ]),
        );
        service.register_strings("es", strings(&[("ball.name", "Pelota")]));
        Self {
            locale,
            service,
            model: Rc::new(RampModel::new()),
            ball: AccessibleNode::new().into_handle(),
            releases_heard: Rc::new(Cell::new(0)),
        }
    }

    fn launch(&self) {
        self.service.register_logic(Rc::new(RampLogic {
            model: Rc::clone(&self.model),
            ball: Rc::clone(&self.ball),
            releases_heard: Rc::clone(&self.releases_heard),
        }));
        self.service.startup_complete();
    }
}

// ============================================================================
// 1. Fallback Merge
// ============================================================================

#[test]
fn spanish_falls_back_to_english_keys() {
    let h = Harness::new("es");
    assert_eq!(h.locale.locale_order(), vec!["es", "en"]);
    h.launch();

    let ball = h.ball.borrow();
    let passed = ball.accessible_name.as_deref() == Some("Pelota")
        && ball.description.as_deref() == Some("Ball is 1.0 meters high");
    log_jsonl("merge", "es_falls_back", passed, "name from es, description from en");
    assert!(passed);
}

#[test]
fn regional_locale_resolves_through_language() {
    let h = Harness::new("es_MX");
    assert_eq!(h.locale.locale_order().last().map(String::as_str), Some("en"));
    h.launch();
    assert_eq!(h.ball.borrow().accessible_name.as_deref(), Some("Pelota"));
}

// ============================================================================
// 2. Locale Switch
// ============================================================================

#[test]
fn locale_switch_relaunches_on_fresh_context() {
    let h = Harness::new("en");
    h.launch();
    let first = h.service.active_context().unwrap();
    assert_eq!(h.model.height.listener_count(), 2);

    h.locale.set_locale("es");
    let second = h.service.active_context().unwrap();

    assert!(first.is_disposed());
    assert_ne!(first.id(), second.id());
    // One link plus one multilink from the live context only.
    assert_eq!(h.model.height.listener_count(), 2);
    assert_eq!(h.model.released.listener_count(), 1);
    assert_eq!(h.ball.borrow().accessible_name.as_deref(), Some("Pelota"));
    log_jsonl("switch", "en_to_es", true, "old context disposed first");
}

#[test]
fn custom_fallbacks_take_priority_over_standard_ones() {
    let h = Harness::new("pt_BR");
    h.service.register_strings("fr", strings(&[("ball.name", "Balle")]));
    h.service.register_strings("pt", strings(&[("ball.name", "Bola")]));
    h.launch();
    assert_eq!(h.ball.borrow().accessible_name.as_deref(), Some("Bola"));

    h.locale.set_fallback_locales(vec!["fr".into()]);
    // pt_BR itself has no table, so fr wins before pt.
    assert_eq!(h.locale.locale_order(), vec!["pt_BR", "fr", "pt", "en"]);
    assert_eq!(h.ball.borrow().accessible_name.as_deref(), Some("Balle"));
}

// ============================================================================
// 3. Full Undo
// ============================================================================

#[test]
fn clearing_logic_restores_pre_launch_state() {
    let h = Harness::new("en");
    let before_ball = h.ball.borrow().clone();
    h.launch();

    h.model.height.set(2.5);
    h.model.released.emit(&());
    assert_eq!(h.releases_heard.get(), 1);
    assert_eq!(h.model.status.get(), "described");
    assert_eq!(
        h.ball.borrow().description.as_deref(),
        Some("Ball is 2.5 meters high")
    );

    h.service.clear_logic();

    // Listener-driven fields written outside node_set keep their last value;
    // everything assigned through the context is restored.
    let ball = h.ball.borrow();
    assert_eq!(ball.accessible_name, before_ball.accessible_name);
    assert_eq!(h.model.status.get(), "ready");
    assert_eq!(h.model.height.listener_count(), 0);
    assert_eq!(h.model.friction.listener_count(), 0);
    assert_eq!(h.model.released.listener_count(), 0);

    h.model.released.emit(&());
    assert_eq!(h.releases_heard.get(), 1);
    log_jsonl("undo", "clear_logic", true, "listeners removed, values restored");
}

#[test]
fn disposed_model_objects_do_not_block_teardown() {
    let h = Harness::new("en");
    h.launch();

    h.model.status.dispose();
    h.model.released.dispose();
    h.ball.borrow_mut().dispose();
    h.service.clear_logic();

    assert!(h.service.active_context().is_none());
    assert_eq!(h.model.height.listener_count(), 0);
    assert_eq!(h.ball.borrow().accessible_name.as_deref(), Some("Ball"));
}

// ============================================================================
// 4. Logging
// ============================================================================

#[test]
fn lifecycle_is_logged() {
    let messages = with_captured_events(|| {
        let h = Harness::new("en");
        h.launch();
        h.locale.set_locale("es");
    });

    let launches = messages
        .iter()
        .filter(|m| m.as_str() == "launching description logic")
        .count();
    let disposals = messages
        .iter()
        .filter(|m| m.as_str() == "description context disposed")
        .count();
    log_jsonl(
        "logging",
        "lifecycle",
        launches == 2 && disposals >= 1,
        &format!("launches={launches} disposals={disposals}"),
    );
    assert_eq!(launches, 2);
    assert!(disposals >= 1);
}

#[test]
fn reload_count_matches_order_changes() {
    let h = Harness::new("en");
    h.launch();
    let launches = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&launches);
    h.service
        .active_context_property()
        .subscribe(move |id| {
            if let Some(id) = id {
                log.borrow_mut().push(*id);
            }
        })
        .detach();

    h.locale.set_locale("es");
    h.locale.set_locale("es");
    h.locale.set_locale("fr");

    assert_eq!(launches.borrow().len(), 2);
}
