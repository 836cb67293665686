#![forbid(unsafe_code)]

//! Registry of instrumented simulation objects, keyed by tandem ID.
//!
//! Description logic reaches model objects through the registry instead of
//! holding them directly. Adding and removing objects fires the
//! [`DescriptionRegistry::added_emitter`] and
//! [`DescriptionRegistry::removed_emitter`] events, which the service
//! forwards to the active logic.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::reactive::Emitter;

/// A registered object. Downcast with [`DescriptionRegistry::get_as`].
pub type RegistryObject = Rc<dyn Any>;

/// Payload of the added/removed events.
#[derive(Clone)]
pub struct RegistryEvent {
    pub tandem_id: String,
    pub object: RegistryObject,
}

impl fmt::Debug for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEvent")
            .field("tandem_id", &self.tandem_id)
            .finish_non_exhaustive()
    }
}

struct RegistryInner {
    objects: RefCell<BTreeMap<String, RegistryObject>>,
    added: Emitter<RegistryEvent>,
    removed: Emitter<RegistryEvent>,
}

/// Shared object registry. Cloning yields another handle to the same map.
#[derive(Clone)]
pub struct DescriptionRegistry {
    inner: Rc<RegistryInner>,
}

impl Default for DescriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DescriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptionRegistry")
            .field("tandem_ids", &self.tandem_ids())
            .finish()
    }
}

impl DescriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                objects: RefCell::new(BTreeMap::new()),
                added: Emitter::new(),
                removed: Emitter::new(),
            }),
        }
    }

    /// Register `object` under `tandem_id`.
    ///
    /// An object already registered under the same ID is removed first, with
    /// its own `removed` event.
    pub fn add(&self, tandem_id: impl Into<String>, object: RegistryObject) {
        let tandem_id = tandem_id.into();
        let replaced = self
            .inner
            .objects
            .borrow_mut()
            .insert(tandem_id.clone(), Rc::clone(&object));
        if let Some(previous) = replaced {
            tracing::debug!(tandem_id = %tandem_id, "replacing registry object");
            self.inner.removed.emit(&RegistryEvent {
                tandem_id: tandem_id.clone(),
                object: previous,
            });
        }
        self.inner.added.emit(&RegistryEvent { tandem_id, object });
    }

    /// Unregister and return the object under `tandem_id`, if any.
    pub fn remove(&self, tandem_id: &str) -> Option<RegistryObject> {
        let object = self.inner.objects.borrow_mut().remove(tandem_id)?;
        self.inner.removed.emit(&RegistryEvent {
            tandem_id: tandem_id.to_string(),
            object: Rc::clone(&object),
        });
        Some(object)
    }

    #[must_use]
    pub fn get(&self, tandem_id: &str) -> Option<RegistryObject> {
        self.inner.objects.borrow().get(tandem_id).cloned()
    }

    /// Typed lookup. `None` when missing or of another type.
    #[must_use]
    pub fn get_as<T: 'static>(&self, tandem_id: &str) -> Option<Rc<T>> {
        self.get(tandem_id)?.downcast::<T>().ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.objects.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.objects.borrow().is_empty()
    }

    /// Registered IDs in sorted order.
    #[must_use]
    pub fn tandem_ids(&self) -> Vec<String> {
        self.inner.objects.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn added_emitter(&self) -> &Emitter<RegistryEvent> {
        &self.inner.added
    }

    #[must_use]
    pub fn removed_emitter(&self) -> &Emitter<RegistryEvent> {
        &self.inner.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;

    #[test]
    fn add_get_remove() {
        let registry = DescriptionRegistry::new();
        registry.add("sim.screen.model.ball", Rc::new(Observable::new(3.0_f64)));
        assert_eq!(registry.len(), 1);

        let ball = registry
            .get_as::<Observable<f64>>("sim.screen.model.ball")
            .unwrap();
        assert_eq!(ball.get(), 3.0);
        assert!(registry.get_as::<String>("sim.screen.model.ball").is_none());

        assert!(registry.remove("sim.screen.model.ball").is_some());
        assert!(registry.remove("sim.screen.model.ball").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn events_fire_for_add_replace_and_remove() {
        let registry = DescriptionRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (added_log, removed_log) = (Rc::clone(&log), Rc::clone(&log));
        let _a = registry
            .added_emitter()
            .add_listener(move |e| added_log.borrow_mut().push(format!("+{}", e.tandem_id)));
        let _r = registry
            .removed_emitter()
            .add_listener(move |e| removed_log.borrow_mut().push(format!("-{}", e.tandem_id)));

        registry.add("a", Rc::new(1_u8));
        registry.add("a", Rc::new(2_u8));
        registry.remove("a");

        assert_eq!(*log.borrow(), vec!["+a", "-a", "+a", "-a"]);
    }

    #[test]
    fn tandem_ids_are_sorted() {
        let registry = DescriptionRegistry::new();
        registry.add("b", Rc::new(()));
        registry.add("a", Rc::new(()));
        assert_eq!(registry.tandem_ids(), vec!["a", "b"]);
    }
}
