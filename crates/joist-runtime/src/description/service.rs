#![forbid(unsafe_code)]

//! Lifecycle owner for description logic.
//!
//! # Invariants
//!
//! 1. At most one [`DescriptionContext`] is active. The previous context is
//!    fully disposed before the next one is constructed.
//! 2. Nothing launches before [`DescriptionService::startup_complete`].
//! 3. A `reload` requested while a reload is running is deferred until the
//!    running one finishes, then runs once.
//!
//! # Failure Modes
//!
//! | Scenario                              | Behavior                          |
//! |---------------------------------------|-----------------------------------|
//! | No logic registered                   | Old context disposed, none active |
//! | No locale in the order has strings    | Old context disposed, none active |
//! | Unknown plugin name                   | `Err(DescriptionError::UnknownPlugin)` |
//! | Malformed strings JSON                | `Err(DescriptionError::InvalidStrings)`, table unchanged |

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::description::{
    DescriptionContext, DescriptionError, DescriptionLogic, DescriptionPlugins,
    DescriptionRegistry, DescriptionStrings, RegistryEvent, merge_strings, strings_from_json,
};
use crate::locale::Locale;
use crate::reactive::{Computed, Observable, Subscription};

struct ServiceInner {
    locale_order: Computed<Vec<Locale>>,
    strings: RefCell<BTreeMap<Locale, DescriptionStrings>>,
    logic: RefCell<Option<Rc<dyn DescriptionLogic>>>,
    plugins: RefCell<DescriptionPlugins>,
    startup_complete: Cell<bool>,
    active: RefCell<Option<DescriptionContext>>,
    active_context_id: Observable<Option<u64>>,
    next_context_id: Cell<u64>,
    reloading: Cell<bool>,
    reload_pending: Cell<bool>,
    registry: DescriptionRegistry,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl ServiceInner {
    fn active_logic(&self) -> Option<Rc<dyn DescriptionLogic>> {
        if self.active.borrow().is_none() {
            return None;
        }
        self.logic.borrow().clone()
    }
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        if let Some(context) = self.active.get_mut().take() {
            context.dispose();
        }
    }
}

/// Resets the reloading flag even if a logic callback unwinds.
struct ReloadGuard<'a>(&'a Cell<bool>);

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Owns the string tables, the registered logic and the active context.
///
/// Cloning yields another handle to the same service.
#[derive(Clone)]
pub struct DescriptionService {
    inner: Rc<ServiceInner>,
}

impl fmt::Debug for DescriptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptionService")
            .field("locale_order", &self.inner.locale_order.get())
            .field("locales_with_strings", &self.inner.strings.borrow().keys().collect::<Vec<_>>())
            .field("has_logic", &self.inner.logic.borrow().is_some())
            .field("startup_complete", &self.inner.startup_complete.get())
            .field("active_context", &self.inner.active_context_id.get())
            .finish()
    }
}

impl DescriptionService {
    /// Create a service driven by `locale_order`, forwarding `registry` events.
    #[must_use]
    pub fn new(locale_order: Computed<Vec<Locale>>, registry: DescriptionRegistry) -> Self {
        let inner = Rc::new(ServiceInner {
            locale_order,
            strings: RefCell::new(BTreeMap::new()),
            logic: RefCell::new(None),
            plugins: RefCell::new(DescriptionPlugins::new()),
            startup_complete: Cell::new(false),
            active: RefCell::new(None),
            active_context_id: Observable::new(None),
            next_context_id: Cell::new(1),
            reloading: Cell::new(false),
            reload_pending: Cell::new(false),
            registry,
            subscriptions: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&inner);
        let order_changed = inner.locale_order.subscribe(move |order| {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!(?order, "locale order changed");
                Self { inner }.reload();
            }
        });

        let weak = Rc::downgrade(&inner);
        let added = inner.registry.added_emitter().add_listener(move |event| {
            forward(&weak, event, |logic, event| {
                logic.added(&event.tandem_id, &event.object);
            });
        });

        let weak = Rc::downgrade(&inner);
        let removed = inner.registry.removed_emitter().add_listener(move |event| {
            forward(&weak, event, |logic, event| {
                logic.removed(&event.tandem_id, &event.object);
            });
        });

        inner
            .subscriptions
            .borrow_mut()
            .extend([order_changed, added, removed]);
        Self { inner }
    }

    // ── Registration ───────────────────────────────────────────────────

    /// Add or overwrite the string table for `locale`.
    ///
    /// After startup, a table for a locale in the current order reloads.
    pub fn register_strings(&self, locale: impl Into<Locale>, strings: DescriptionStrings) {
        let locale = locale.into();
        tracing::debug!(locale = %locale, keys = strings.len(), "registering description strings");
        self.inner
            .strings
            .borrow_mut()
            .insert(locale.clone(), strings);

        let in_order = self.inner.locale_order.with(|order| order.contains(&locale));
        if in_order && self.inner.startup_complete.get() {
            self.reload();
        }
    }

    /// Parse and register a JSON strings file for `locale`.
    pub fn register_strings_json(
        &self,
        locale: impl Into<Locale>,
        json: &str,
    ) -> Result<(), DescriptionError> {
        let locale = locale.into();
        let strings = strings_from_json(&locale, json)?;
        self.register_strings(locale, strings);
        Ok(())
    }

    /// Replace the logic module and reload.
    pub fn register_logic(&self, logic: Rc<dyn DescriptionLogic>) {
        tracing::debug!("registering description logic");
        *self.inner.logic.borrow_mut() = Some(logic);
        self.reload();
    }

    /// Remove the logic module. The active context, if any, is disposed.
    pub fn clear_logic(&self) {
        *self.inner.logic.borrow_mut() = None;
        self.reload();
    }

    pub fn register_plugin(
        &self,
        name: impl Into<String>,
        factory: impl Fn() -> Rc<dyn DescriptionLogic> + 'static,
    ) {
        self.inner.plugins.borrow_mut().register(name, factory);
    }

    /// Instantiate the named plugin and register it as the logic.
    pub fn load_plugin(&self, name: &str) -> Result<(), DescriptionError> {
        let logic = self.inner.plugins.borrow().create(name)?;
        tracing::info!(plugin = name, "loading description plugin");
        self.register_logic(logic);
        Ok(())
    }

    #[must_use]
    pub fn plugin_names(&self) -> Vec<String> {
        self.inner
            .plugins
            .borrow()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Open the startup gate and reload. Later calls do nothing.
    pub fn startup_complete(&self) {
        if self.inner.startup_complete.replace(true) {
            return;
        }
        tracing::debug!("description startup complete");
        self.reload();
    }

    // ── Reload ─────────────────────────────────────────────────────────

    /// Dispose the active context and relaunch the logic on fresh strings.
    pub fn reload(&self) {
        let inner = &self.inner;
        if !inner.startup_complete.get() {
            tracing::trace!("reload before startup ignored");
            return;
        }
        if inner.reloading.get() {
            tracing::debug!("reload requested during reload, deferring");
            inner.reload_pending.set(true);
            return;
        }

        inner.reloading.set(true);
        let _guard = ReloadGuard(&inner.reloading);
        loop {
            inner.reload_pending.set(false);
            self.reload_once();
            if !inner.reload_pending.get() {
                break;
            }
        }
    }

    fn reload_once(&self) {
        let inner = &self.inner;

        let previous = inner.active.borrow_mut().take();
        if let Some(context) = previous {
            context.dispose();
            inner.active_context_id.set(None);
        }

        let Some(logic) = inner.logic.borrow().clone() else {
            tracing::debug!("no description logic registered");
            return;
        };

        let order = inner.locale_order.get();
        let Some(strings) = merge_strings(&order, &inner.strings.borrow()) else {
            tracing::debug!(?order, "no description strings for any locale in order");
            return;
        };

        let id = inner.next_context_id.get();
        inner.next_context_id.set(id + 1);
        let context = DescriptionContext::new(id);
        *inner.active.borrow_mut() = Some(context.clone());
        inner.active_context_id.set(Some(id));

        tracing::info!(context = id, ?order, keys = strings.len(), "launching description logic");
        logic.launch(&context, &strings);
    }

    // ── Accessors ──────────────────────────────────────────────────────

    #[must_use]
    pub fn active_context(&self) -> Option<DescriptionContext> {
        self.inner.active.borrow().clone()
    }

    /// ID of the active context, `None` while none is active.
    #[must_use]
    pub fn active_context_property(&self) -> &Observable<Option<u64>> {
        &self.inner.active_context_id
    }

    #[must_use]
    pub fn is_startup_complete(&self) -> bool {
        self.inner.startup_complete.get()
    }

    #[must_use]
    pub fn has_logic(&self) -> bool {
        self.inner.logic.borrow().is_some()
    }

    #[must_use]
    pub fn strings_for(&self, locale: &str) -> Option<DescriptionStrings> {
        self.inner.strings.borrow().get(locale).cloned()
    }

    /// The strings the next launch would receive.
    #[must_use]
    pub fn merged_strings(&self) -> Option<DescriptionStrings> {
        let order = self.inner.locale_order.get();
        merge_strings(&order, &self.inner.strings.borrow())
    }

    #[must_use]
    pub fn locale_order(&self) -> Vec<Locale> {
        self.inner.locale_order.get()
    }

    #[must_use]
    pub fn registry(&self) -> &DescriptionRegistry {
        &self.inner.registry
    }
}

fn forward(
    weak: &Weak<ServiceInner>,
    event: &RegistryEvent,
    deliver: impl FnOnce(&dyn DescriptionLogic, &RegistryEvent),
) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if let Some(logic) = inner.active_logic() {
        deliver(logic.as_ref(), event);
    }
}
