#![forbid(unsafe_code)]

//! Runtime for joist simulations.
//!
//! # Role in joist
//! `joist-runtime` holds the stateful, reactive half of the shell. It owns
//! the selected locale and its fallback order, the selected screen, and the
//! lifecycle of description logic. `joist-core` supplies the pure parsing
//! and selection rules it builds on.
//!
//! # How it fits in the system
//! A simulation boots by parsing launch parameters and selecting screens
//! (`joist-core`), then builds a [`LocaleState`], a [`Navigator`] and a
//! [`DescriptionService`] here. Everything is single-threaded: the reactive
//! types are `Rc`-based and cannot cross threads.

pub mod description;
pub mod locale;
pub mod navigation;
pub mod node;
pub mod reactive;

pub use description::{
    DescriptionContext, DescriptionError, DescriptionLogic, DescriptionPlugins,
    DescriptionRegistry, DescriptionService, DescriptionStrings, LinkHandle, ListenHandle,
    LogicFactory, MultilinkHandle, RegistryEvent, RegistryObject, merge_strings,
    strings_from_json,
};
pub use locale::{
    Direction, FALLBACK_LOCALE, Locale, LocaleData, LocaleError, LocaleInfo, LocaleState,
    detect_system_locale, locale_order, normalize_locale_raw,
};
pub use navigation::{NavigationError, Navigator};
pub use node::{AccessibleNode, Attribute, NodeHandle, SceneNode};
pub use reactive::{
    Computed, Dependency, Emitter, Multilink, Observable, Subscription, WeakObservable,
};
