#![forbid(unsafe_code)]

//! Reversible-effect scope for description logic.
//!
//! # Invariants
//!
//! 1. Every effect is applied first and recorded second, so a listener that
//!    fires during `link` never observes a half-registered effect.
//! 2. The first `node_set`/`property_set` of a target snapshots its value;
//!    later sets in the same context do not, so dispose restores the value
//!    from before the context existed.
//! 3. `dispose` unwinds links, listens, node assignments and property
//!    assignments, each category most-recent first, then disposes
//!    multilinks.
//! 4. Each unwind step checks its own target; a dropped or disposed target
//!    is skipped without affecting the rest.
//!
//! # Failure Modes
//!
//! | Scenario                         | Behavior                             |
//! |----------------------------------|--------------------------------------|
//! | Unlink of an unknown/used handle | `Err(DescriptionError::NotLinked)`   |
//! | Any call after `dispose`         | `Err(DescriptionError::ContextDisposed)` |
//! | Target dropped before dispose    | Skipped, counted in the dispose log  |

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::description::DescriptionError;
use crate::node::{Attribute, NodeHandle, SceneNode};
use crate::reactive::{Dependency, Emitter, Multilink, Observable, Subscription};

/// Handles are unique across contexts, so a handle from one context is never
/// mistaken for an effect of another.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Handle to a link recorded by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkHandle(u64);

/// Handle to an emitter listener recorded by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenHandle(u64);

/// Handle to a multilink owned by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultilinkHandle(u64);

struct Assignment {
    target: Weak<dyn Any>,
    attribute: &'static str,
    restore: Box<dyn FnOnce() -> bool>,
}

impl Assignment {
    fn matches(&self, target: &Weak<dyn Any>, attribute: &str) -> bool {
        self.attribute == attribute && Weak::ptr_eq(&self.target, target)
    }
}

struct ContextInner {
    id: u64,
    disposed: Cell<bool>,
    links: RefCell<Vec<(LinkHandle, Subscription)>>,
    listens: RefCell<Vec<(ListenHandle, Subscription)>>,
    node_assignments: RefCell<Vec<Assignment>>,
    property_assignments: RefCell<Vec<Assignment>>,
    multilinks: RefCell<Vec<(MultilinkHandle, Multilink)>>,
}

/// Ownership scope for the effects of one logic launch.
///
/// Cloning yields another handle to the same scope, so logic callbacks can
/// keep registering effects after `launch` returns.
#[derive(Clone)]
pub struct DescriptionContext {
    inner: Rc<ContextInner>,
}

impl fmt::Debug for DescriptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptionContext")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .field("links", &self.link_count())
            .field("listens", &self.listen_count())
            .field("assignments", &self.assignment_count())
            .field("multilinks", &self.multilink_count())
            .finish()
    }
}

impl DescriptionContext {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                id,
                disposed: Cell::new(false),
                links: RefCell::new(Vec::new()),
                listens: RefCell::new(Vec::new()),
                node_assignments: RefCell::new(Vec::new()),
                property_assignments: RefCell::new(Vec::new()),
                multilinks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a context outside any service, e.g. for tests or tooling.
    #[must_use]
    pub fn standalone() -> Self {
        Self::new(0)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn ensure_active(&self) -> Result<(), DescriptionError> {
        if self.is_disposed() {
            Err(DescriptionError::ContextDisposed(self.inner.id))
        } else {
            Ok(())
        }
    }

    fn next_handle(&self) -> u64 {
        NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
    }

    // ── Links ──────────────────────────────────────────────────────────

    /// Link `listener` to `property`, calling it immediately.
    pub fn link<T: Clone + PartialEq + 'static>(
        &self,
        property: &Observable<T>,
        listener: impl Fn(&T) + 'static,
    ) -> Result<LinkHandle, DescriptionError> {
        self.ensure_active()?;
        let subscription = property.link(listener);
        Ok(self.record_link(subscription))
    }

    /// Link `listener` to `property` without the initial call.
    pub fn lazy_link<T: Clone + PartialEq + 'static>(
        &self,
        property: &Observable<T>,
        listener: impl Fn(&T) + 'static,
    ) -> Result<LinkHandle, DescriptionError> {
        self.ensure_active()?;
        let subscription = property.subscribe(listener);
        Ok(self.record_link(subscription))
    }

    fn record_link(&self, subscription: Subscription) -> LinkHandle {
        let handle = LinkHandle(self.next_handle());
        self.inner.links.borrow_mut().push((handle, subscription));
        handle
    }

    /// Remove a link made through this context.
    pub fn unlink(&self, handle: LinkHandle) -> Result<(), DescriptionError> {
        self.ensure_active()?;
        let subscription = {
            let mut links = self.inner.links.borrow_mut();
            let index = links
                .iter()
                .position(|(h, _)| *h == handle)
                .ok_or(DescriptionError::NotLinked(handle))?;
            links.remove(index).1
        };
        subscription.unsubscribe();
        Ok(())
    }

    // ── Multilinks ─────────────────────────────────────────────────────

    /// Run `callback` now and whenever any dependency changes.
    pub fn multilink(
        &self,
        dependencies: &[&dyn Dependency],
        callback: impl Fn() + 'static,
    ) -> Result<MultilinkHandle, DescriptionError> {
        self.ensure_active()?;
        let multilink = Multilink::new(dependencies, callback);
        Ok(self.record_multilink(multilink))
    }

    /// Like [`DescriptionContext::multilink`] without the initial call.
    pub fn lazy_multilink(
        &self,
        dependencies: &[&dyn Dependency],
        callback: impl Fn() + 'static,
    ) -> Result<MultilinkHandle, DescriptionError> {
        self.ensure_active()?;
        let multilink = Multilink::lazy(dependencies, callback);
        Ok(self.record_multilink(multilink))
    }

    fn record_multilink(&self, multilink: Multilink) -> MultilinkHandle {
        let handle = MultilinkHandle(self.next_handle());
        self.inner.multilinks.borrow_mut().push((handle, multilink));
        handle
    }

    pub fn dispose_multilink(&self, handle: MultilinkHandle) -> Result<(), DescriptionError> {
        self.ensure_active()?;
        let multilink = {
            let mut multilinks = self.inner.multilinks.borrow_mut();
            let index = multilinks
                .iter()
                .position(|(h, _)| *h == handle)
                .ok_or(DescriptionError::UnknownMultilink(handle))?;
            multilinks.remove(index).1
        };
        multilink.dispose();
        Ok(())
    }

    // ── Emitter listeners ──────────────────────────────────────────────

    pub fn add_listener<A: 'static>(
        &self,
        emitter: &Emitter<A>,
        listener: impl Fn(&A) + 'static,
    ) -> Result<ListenHandle, DescriptionError> {
        self.ensure_active()?;
        let subscription = emitter.add_listener(listener);
        let handle = ListenHandle(self.next_handle());
        self.inner.listens.borrow_mut().push((handle, subscription));
        Ok(handle)
    }

    pub fn remove_listener(&self, handle: ListenHandle) -> Result<(), DescriptionError> {
        self.ensure_active()?;
        let subscription = {
            let mut listens = self.inner.listens.borrow_mut();
            let index = listens
                .iter()
                .position(|(h, _)| *h == handle)
                .ok_or(DescriptionError::NotListening(handle))?;
            listens.remove(index).1
        };
        subscription.unsubscribe();
        Ok(())
    }

    // ── Assignments ────────────────────────────────────────────────────

    /// Set a node attribute, remembering its pre-context value.
    pub fn node_set<N: SceneNode, V: 'static>(
        &self,
        node: &NodeHandle<N>,
        attribute: Attribute<N, V>,
        value: V,
    ) -> Result<(), DescriptionError> {
        self.ensure_active()?;
        let target: Weak<dyn Any> = {
            let weak: Weak<std::cell::RefCell<N>> = Rc::downgrade(node);
            weak
        };
        let recorded = self
            .inner
            .node_assignments
            .borrow()
            .iter()
            .any(|a| a.matches(&target, attribute.name()));

        if !recorded {
            let previous = attribute.read(&node.borrow());
            let weak = Rc::downgrade(node);
            self.inner.node_assignments.borrow_mut().push(Assignment {
                target,
                attribute: attribute.name(),
                restore: Box::new(move || match weak.upgrade() {
                    Some(node) if !node.borrow().is_disposed() => {
                        attribute.write(&mut node.borrow_mut(), previous);
                        true
                    }
                    _ => false,
                }),
            });
        }

        attribute.write(&mut node.borrow_mut(), value);
        Ok(())
    }

    /// Set a property value, remembering its pre-context value.
    pub fn property_set<T: Clone + PartialEq + 'static>(
        &self,
        property: &Observable<T>,
        value: T,
    ) -> Result<(), DescriptionError> {
        self.ensure_active()?;
        let target = property.identity();
        let recorded = self
            .inner
            .property_assignments
            .borrow()
            .iter()
            .any(|a| a.matches(&target, "value"));

        if !recorded {
            let previous = property.get();
            let weak = property.downgrade();
            self.inner.property_assignments.borrow_mut().push(Assignment {
                target,
                attribute: "value",
                restore: Box::new(move || match weak.upgrade() {
                    Some(property) if !property.is_disposed() => {
                        property.set(previous);
                        true
                    }
                    _ => false,
                }),
            });
        }

        property.set(value);
        Ok(())
    }

    // ── Bookkeeping ────────────────────────────────────────────────────

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.inner.links.borrow().len()
    }

    #[must_use]
    pub fn listen_count(&self) -> usize {
        self.inner.listens.borrow().len()
    }

    /// Recorded node plus property assignments.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.inner.node_assignments.borrow().len() + self.inner.property_assignments.borrow().len()
    }

    #[must_use]
    pub fn multilink_count(&self) -> usize {
        self.inner.multilinks.borrow().len()
    }

    /// Undo every recorded effect. Calling it again is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            tracing::debug!(context = self.inner.id, "description context already disposed");
            return;
        }

        let links = std::mem::take(&mut *self.inner.links.borrow_mut());
        let listens = std::mem::take(&mut *self.inner.listens.borrow_mut());
        let node_assignments = std::mem::take(&mut *self.inner.node_assignments.borrow_mut());
        let property_assignments =
            std::mem::take(&mut *self.inner.property_assignments.borrow_mut());
        let multilinks = std::mem::take(&mut *self.inner.multilinks.borrow_mut());

        let (link_count, listen_count) = (links.len(), listens.len());
        let assignment_count = node_assignments.len() + property_assignments.len();
        let mut skipped = 0usize;

        for (_, subscription) in links.into_iter().rev() {
            if !subscription.unsubscribe() {
                skipped += 1;
            }
        }
        for (_, subscription) in listens.into_iter().rev() {
            if !subscription.unsubscribe() {
                skipped += 1;
            }
        }
        for assignment in node_assignments.into_iter().rev() {
            if !(assignment.restore)() {
                skipped += 1;
            }
        }
        for assignment in property_assignments.into_iter().rev() {
            if !(assignment.restore)() {
                skipped += 1;
            }
        }
        let multilink_count = multilinks.len();
        for (_, multilink) in multilinks {
            multilink.dispose();
        }

        tracing::debug!(
            context = self.inner.id,
            links = link_count,
            listens = listen_count,
            assignments = assignment_count,
            multilinks = multilink_count,
            skipped,
            "description context disposed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::AccessibleNode;

    #[test]
    fn link_calls_immediately_and_unlinks() {
        let ctx = DescriptionContext::standalone();
        let property = Observable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);

        let handle = ctx.link(&property, move |v| log.borrow_mut().push(*v)).unwrap();
        property.set(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);

        ctx.unlink(handle).unwrap();
        property.set(3);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(property.listener_count(), 0);
    }

    #[test]
    fn double_unlink_is_an_error() {
        let ctx = DescriptionContext::standalone();
        let property = Observable::new(0);
        let handle = ctx.lazy_link(&property, |_| {}).unwrap();
        ctx.unlink(handle).unwrap();
        assert_eq!(ctx.unlink(handle), Err(DescriptionError::NotLinked(handle)));
    }

    #[test]
    fn unlink_of_other_context_handle_is_an_error() {
        let a = DescriptionContext::standalone();
        let b = DescriptionContext::standalone();
        let property = Observable::new(0);
        let handle = a.lazy_link(&property, |_| {}).unwrap();
        b.lazy_link(&property, |_| {}).unwrap();

        assert_eq!(b.unlink(handle), Err(DescriptionError::NotLinked(handle)));
        assert_eq!(a.link_count(), 1);
        assert_eq!(b.link_count(), 1);
        assert_eq!(property.listener_count(), 2);
    }

    #[test]
    fn remove_listener_errors_when_unknown() {
        let ctx = DescriptionContext::standalone();
        let emitter: Emitter<()> = Emitter::new();
        let handle = ctx.add_listener(&emitter, |_| {}).unwrap();
        ctx.remove_listener(handle).unwrap();
        assert_eq!(
            ctx.remove_listener(handle),
            Err(DescriptionError::NotListening(handle))
        );
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn node_set_restores_pre_context_value() {
        let ctx = DescriptionContext::standalone();
        let node = AccessibleNode::new().into_handle();
        node.borrow_mut().accessible_name = Some("original".into());

        ctx.node_set(&node, AccessibleNode::ACCESSIBLE_NAME, Some("first".into()))
            .unwrap();
        ctx.node_set(&node, AccessibleNode::ACCESSIBLE_NAME, Some("second".into()))
            .unwrap();
        ctx.node_set(&node, AccessibleNode::VISIBLE, false).unwrap();
        assert_eq!(node.borrow().accessible_name.as_deref(), Some("second"));
        assert_eq!(ctx.assignment_count(), 2);

        ctx.dispose();
        assert_eq!(node.borrow().accessible_name.as_deref(), Some("original"));
        assert!(node.borrow().visible);
    }

    #[test]
    fn property_set_restores_pre_context_value() {
        let ctx = DescriptionContext::standalone();
        let property = Observable::new("idle".to_string());
        ctx.property_set(&property, "busy".into()).unwrap();
        ctx.property_set(&property, "done".into()).unwrap();
        assert_eq!(property.get(), "done");
        ctx.dispose();
        assert_eq!(property.get(), "idle");
    }

    #[test]
    fn dispose_skips_dropped_and_disposed_targets() {
        let ctx = DescriptionContext::standalone();
        let dropped = AccessibleNode::new().into_handle();
        let disposed = AccessibleNode::new().into_handle();
        let kept = AccessibleNode::new().into_handle();
        for node in [&dropped, &disposed, &kept] {
            ctx.node_set(node, AccessibleNode::HELP_TEXT, Some("help".into()))
                .unwrap();
        }
        let property = Observable::new(0);
        ctx.lazy_link(&property, |_| {}).unwrap();
        ctx.property_set(&property, 5).unwrap();

        drop(dropped);
        disposed.borrow_mut().dispose();
        property.dispose();
        ctx.dispose();

        assert_eq!(kept.borrow().help_text, None);
        assert_eq!(disposed.borrow().help_text.as_deref(), Some("help"));
        assert_eq!(property.get(), 5);
    }

    #[test]
    fn dispose_unwinds_assignments_last_in_first_out() {
        let ctx = DescriptionContext::standalone();
        let a = Observable::new(0);
        let b = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let (log_a, log_b) = (Rc::clone(&order), Rc::clone(&order));
        let _sa = a.subscribe(move |v| log_a.borrow_mut().push(("a", *v)));
        let _sb = b.subscribe(move |v| log_b.borrow_mut().push(("b", *v)));

        ctx.property_set(&a, 1).unwrap();
        ctx.property_set(&b, 1).unwrap();
        order.borrow_mut().clear();
        ctx.dispose();
        assert_eq!(*order.borrow(), vec![("b", 0), ("a", 0)]);
    }

    #[test]
    fn dispose_removes_every_subscription() {
        let ctx = DescriptionContext::standalone();
        let a = Observable::new(0);
        let b = Observable::new(0);
        let emitter: Emitter<u8> = Emitter::new();
        ctx.link(&a, |_| {}).unwrap();
        ctx.add_listener(&emitter, |_| {}).unwrap();
        ctx.multilink(&[&a, &b], || {}).unwrap();
        assert_eq!(a.listener_count(), 2);

        ctx.dispose();
        assert_eq!(a.listener_count(), 0);
        assert_eq!(b.listener_count(), 0);
        assert_eq!(emitter.listener_count(), 0);
        assert_eq!(ctx.link_count() + ctx.listen_count() + ctx.multilink_count(), 0);
    }

    #[test]
    fn disposed_context_rejects_new_effects() {
        let ctx = DescriptionContext::standalone();
        ctx.dispose();
        ctx.dispose();
        let property = Observable::new(0);
        assert_eq!(
            ctx.link(&property, |_| {}),
            Err(DescriptionError::ContextDisposed(0))
        );
        assert_eq!(
            ctx.property_set(&property, 1),
            Err(DescriptionError::ContextDisposed(0))
        );
        assert_eq!(property.get(), 0);
        assert_eq!(property.listener_count(), 0);
    }

    #[test]
    fn dispose_multilink_by_handle() {
        let ctx = DescriptionContext::standalone();
        let a = Observable::new(0);
        let handle = ctx.lazy_multilink(&[&a], || {}).unwrap();
        ctx.dispose_multilink(handle).unwrap();
        assert_eq!(a.listener_count(), 0);
        assert_eq!(
            ctx.dispose_multilink(handle),
            Err(DescriptionError::UnknownMultilink(handle))
        );
    }
}
