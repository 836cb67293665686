#![forbid(unsafe_code)]

//! Locale-aware description content with hot-swappable logic.
//!
//! A [`DescriptionLogic`] module turns a merged string table into accessible
//! descriptions: it links to model properties, listens to emitters, and sets
//! node attributes. Every one of those effects goes through a
//! [`DescriptionContext`], which records it so the whole set can be undone in
//! one call.
//!
//! [`DescriptionService`] owns the lifecycle. Whenever the locale order or
//! the registered logic changes it disposes the active context, merges the
//! string tables along the locale order, and launches the logic on a fresh
//! context.
//!
//! ```text
//! locale order ──┐
//! strings ───────┼──► DescriptionService::reload()
//! logic ─────────┘        │ dispose old context
//!                         │ merge strings (lowest priority first)
//!                         ▼
//!                 logic.launch(&context, &strings)
//!                         │ context.link / node_set / ...
//!                         ▼
//!                 recorded, undone on next reload
//! ```

pub mod context;
pub mod plugin;
pub mod registry;
pub mod service;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::locale::Locale;

pub use context::{DescriptionContext, LinkHandle, ListenHandle, MultilinkHandle};
pub use plugin::{DescriptionPlugins, LogicFactory};
pub use registry::{DescriptionRegistry, RegistryEvent, RegistryObject};
pub use service::DescriptionService;

/// Merged description strings, keyed by dotted string key.
pub type DescriptionStrings = BTreeMap<String, String>;

/// Errors at the description API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptionError {
    #[error("description context {0} has been disposed")]
    ContextDisposed(u64),

    #[error("{0:?} is not linked in this context")]
    NotLinked(LinkHandle),

    #[error("{0:?} is not listening in this context")]
    NotListening(ListenHandle),

    #[error("{0:?} is not a multilink of this context")]
    UnknownMultilink(MultilinkHandle),

    #[error("no description plugin named {0:?}")]
    UnknownPlugin(String),

    #[error("invalid description strings for {locale}: {message}")]
    InvalidStrings { locale: Locale, message: String },
}

/// Simulation-supplied description behavior.
pub trait DescriptionLogic {
    /// Start describing with `strings`. Every effect must go through `context`.
    fn launch(&self, context: &DescriptionContext, strings: &DescriptionStrings);

    /// A registry object appeared while a context is active.
    fn added(&self, _tandem_id: &str, _object: &RegistryObject) {}

    /// A registry object went away while a context is active.
    fn removed(&self, _tandem_id: &str, _object: &RegistryObject) {}
}

/// Merge per-locale tables along `order` (highest priority first).
///
/// Tables are applied from lowest to highest priority so earlier locales
/// win. Returns `None` when no locale in `order` has a table.
#[must_use]
pub fn merge_strings(
    order: &[Locale],
    tables: &BTreeMap<Locale, DescriptionStrings>,
) -> Option<DescriptionStrings> {
    let mut merged: Option<DescriptionStrings> = None;
    for locale in order.iter().rev() {
        if let Some(table) = tables.get(locale) {
            merged
                .get_or_insert_with(DescriptionStrings::new)
                .extend(table.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    merged
}

/// Parse a JSON strings file, flattening nested objects into dotted keys.
///
/// Non-string leaves are skipped.
pub fn strings_from_json(locale: &str, json: &str) -> Result<DescriptionStrings, DescriptionError> {
    let value: Value = serde_json::from_str(json).map_err(|e| DescriptionError::InvalidStrings {
        locale: locale.to_string(),
        message: e.to_string(),
    })?;
    let Value::Object(_) = value else {
        return Err(DescriptionError::InvalidStrings {
            locale: locale.to_string(),
            message: "top level must be an object".into(),
        });
    };
    let mut strings = DescriptionStrings::new();
    flatten_into(&mut strings, String::new(), &value);
    Ok(strings)
}

fn flatten_into(out: &mut DescriptionStrings, prefix: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(out, path, child);
            }
        }
        Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        other => {
            tracing::warn!(key = %prefix, kind = ?other, "skipping non-string description entry");
        }
    }
}
