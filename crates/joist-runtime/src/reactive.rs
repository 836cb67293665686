#![forbid(unsafe_code)]

//! Single-threaded reactive primitives.
//!
//! - [`Observable`]: a value cell that notifies listeners when it changes.
//! - [`Emitter`]: a fire-and-forget event source.
//! - [`Computed`]: a value derived from other cells, recomputed on change.
//! - [`Multilink`]: one callback over several dependencies.
//! - [`Subscription`]: RAII guard; dropping it removes the listener.
//!
//! All notification is synchronous: `set` returns only after every listener
//! has run. Listener lists are snapshotted before dispatch, so listeners may
//! subscribe or read the cell they are observing. A listener removed during
//! dispatch is not called for the rest of that pass; one added during
//! dispatch first hears the next change.
//!
//! The types are `Rc`-based and therefore `!Send`; a reactive graph lives on
//! one thread.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier of a registered listener, unique per cell.
pub type ListenerId = u64;

struct ListenerEntry<T: ?Sized> {
    id: ListenerId,
    alive: Rc<Cell<bool>>,
    listener: Rc<dyn Fn(&T)>,
}

struct ListenerList<T: ?Sized> {
    next_id: Cell<ListenerId>,
    entries: RefCell<Vec<ListenerEntry<T>>>,
}

impl<T: ?Sized> ListenerList<T> {
    fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }

    fn add(&self, listener: Rc<dyn Fn(&T)>) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(ListenerEntry {
            id,
            alive: Rc::new(Cell::new(true)),
            listener,
        });
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                entries.remove(index).alive.set(false);
                true
            }
            None => false,
        }
    }

    /// Call every listener registered when dispatch began, skipping any
    /// removed by an earlier listener in the same pass.
    fn dispatch(&self, args: &T) {
        let snapshot: Vec<_> = self
            .entries
            .borrow()
            .iter()
            .map(|entry| (Rc::clone(&entry.alive), Rc::clone(&entry.listener)))
            .collect();
        for (alive, listener) in snapshot {
            if alive.get() {
                listener(args);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn clear(&self) {
        for entry in self.entries.borrow_mut().drain(..) {
            entry.alive.set(false);
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Guard for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() -> bool>>,
}

impl Subscription {
    fn new(unsubscribe: impl FnOnce() -> bool + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Remove the listener now.
    ///
    /// Returns `false` if the source was already dropped or disposed, in
    /// which case there was nothing left to remove.
    pub fn unsubscribe(mut self) -> bool {
        self.unsubscribe.take().is_some_and(|f| f())
    }

    /// Keep the listener registered for the lifetime of the source.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Observable
// ---------------------------------------------------------------------------

struct ObservableInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    listeners: ListenerList<T>,
    disposed: Cell<bool>,
}

/// A shared, observable value cell.
///
/// Cloning an `Observable` yields another handle to the same cell.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                listeners: ListenerList::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Set the value, notifying listeners if it changed.
    ///
    /// Returns whether the value changed. Disposed cells ignore writes.
    pub fn set(&self, value: T) -> bool {
        if self.is_disposed() {
            return false;
        }
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.inner.version.set(self.inner.version.get() + 1);
        self.notify();
        true
    }

    /// Update the value in place, then notify if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Re-send the current value to every listener.
    pub fn notify(&self) {
        let value = self.get();
        self.inner.listeners.dispatch(&value);
    }

    /// Listen for future changes only.
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.listeners.add(Rc::new(listener));
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            weak.upgrade()
                .is_some_and(|inner| inner.listeners.remove(id))
        })
    }

    /// Call `listener` with the current value now, then on every change.
    pub fn link(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let listener: Rc<dyn Fn(&T)> = Rc::new(listener);
        let initial = Rc::clone(&listener);
        let subscription = self.subscribe(move |value| listener(value));
        initial(&self.get());
        subscription
    }

    /// Number of change counter increments so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Drop every listener and refuse further writes.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.listeners.clear();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Whether both handles point at the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Type-erased identity of the cell, used as a bookkeeping key.
    pub(crate) fn identity(&self) -> Weak<dyn Any> {
        let weak: Weak<ObservableInner<T>> = Rc::downgrade(&self.inner);
        weak
    }
}

/// Non-owning handle to an [`Observable`].
pub struct WeakObservable<T> {
    inner: Weak<ObservableInner<T>>,
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakObservable<T> {
    #[must_use]
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

struct EmitterInner<A> {
    listeners: ListenerList<A>,
    disposed: Cell<bool>,
}

/// An event source without a stored value.
pub struct Emitter<A> {
    inner: Rc<EmitterInner<A>>,
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.inner.listeners.len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl<A: 'static> Default for Emitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Emitter<A> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                listeners: ListenerList::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Deliver `args` to every listener. No-op once disposed.
    pub fn emit(&self, args: &A) {
        if self.is_disposed() {
            return;
        }
        self.inner.listeners.dispatch(args);
    }

    pub fn add_listener(&self, listener: impl Fn(&A) + 'static) -> Subscription {
        let id = self.inner.listeners.add(Rc::new(listener));
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            weak.upgrade()
                .is_some_and(|inner| inner.listeners.remove(id))
        })
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.listeners.clear();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

// ---------------------------------------------------------------------------
// Dependencies, Computed, Multilink
// ---------------------------------------------------------------------------

/// Anything a [`Computed`] or [`Multilink`] can depend on.
pub trait Dependency {
    /// Register a change callback that does not receive the value.
    fn on_change(&self, callback: Rc<dyn Fn()>) -> Subscription;
}

impl<T: Clone + PartialEq + 'static> Dependency for Observable<T> {
    fn on_change(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| callback())
    }
}

impl<A: 'static> Dependency for Emitter<A> {
    fn on_change(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.add_listener(move |_| callback())
    }
}

/// A read-only value derived from other cells.
///
/// Recomputed from scratch, synchronously, whenever any dependency changes.
pub struct Computed<T> {
    output: Observable<T>,
    _dependencies: Rc<Vec<Subscription>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            output: self.output.clone(),
            _dependencies: Rc::clone(&self._dependencies),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Computed").field(&self.output).finish()
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    pub fn new(dependencies: &[&dyn Dependency], compute: impl Fn() -> T + 'static) -> Self {
        let output = Observable::new(compute());
        let compute = Rc::new(compute);
        let subscriptions = dependencies
            .iter()
            .map(|dependency| {
                let output = output.downgrade();
                let compute = Rc::clone(&compute);
                dependency.on_change(Rc::new(move || {
                    if let Some(output) = output.upgrade() {
                        output.set(compute());
                    }
                }))
            })
            .collect();
        Self {
            output,
            _dependencies: Rc::new(subscriptions),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.output.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.output.with(f)
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        self.output.subscribe(listener)
    }

    pub fn link(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        self.output.link(listener)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.output.version()
    }

    /// The underlying output cell.
    #[must_use]
    pub fn observable(&self) -> &Observable<T> {
        &self.output
    }
}

impl<T: Clone + PartialEq + 'static> Dependency for Computed<T> {
    fn on_change(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.output.on_change(callback)
    }
}

/// One callback observing several dependencies.
pub struct Multilink {
    subscriptions: RefCell<Vec<Subscription>>,
    disposed: Cell<bool>,
}

impl fmt::Debug for Multilink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multilink")
            .field("dependencies", &self.subscriptions.borrow().len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl Multilink {
    /// Call `callback` now and whenever any dependency changes.
    pub fn new(dependencies: &[&dyn Dependency], callback: impl Fn() + 'static) -> Self {
        let callback: Rc<dyn Fn()> = Rc::new(callback);
        let link = Self::lazy_inner(dependencies, Rc::clone(&callback));
        callback();
        link
    }

    /// Like [`Multilink::new`] without the initial call.
    pub fn lazy(dependencies: &[&dyn Dependency], callback: impl Fn() + 'static) -> Self {
        Self::lazy_inner(dependencies, Rc::new(callback))
    }

    fn lazy_inner(dependencies: &[&dyn Dependency], callback: Rc<dyn Fn()>) -> Self {
        let subscriptions = dependencies
            .iter()
            .map(|dependency| dependency.on_change(Rc::clone(&callback)))
            .collect();
        Self {
            subscriptions: RefCell::new(subscriptions),
            disposed: Cell::new(false),
        }
    }

    /// Remove every dependency listener. Idempotent.
    pub fn dispose(&self) {
        self.disposed.set(true);
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        drop(subscriptions);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}
