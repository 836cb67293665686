#![forbid(unsafe_code)]

//! Locale data, locale fallback order, and the runtime locale state.
//!
//! [`LocaleState`] owns the selected locale and the host-supplied custom
//! fallback locales as observables, and derives the locale order from them:
//! the sequence of locales to try, highest priority first, always ending at
//! [`FALLBACK_LOCALE`]. The order is recomputed from scratch whenever either
//! input changes.

use std::collections::BTreeMap;
use std::env;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use joist_core::query::QueryParameters;

use crate::reactive::{Computed, Observable, Subscription};

/// A locale code such as `en`, `es` or `zh_CN`.
pub type Locale = String;

/// The baseline locale. Every string key resolves here.
pub const FALLBACK_LOCALE: &str = "en";

/// Errors in locale configuration.
#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("locale data has no entry for the baseline locale {FALLBACK_LOCALE:?}")]
    BaselineMissing,

    #[error("invalid locale code {0:?}")]
    InvalidCode(String),

    #[error("invalid locale data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writing direction of a locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

/// Per-locale metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleInfo {
    pub name: String,
    #[serde(default)]
    pub local_name: String,
    #[serde(default)]
    pub direction: Direction,
    /// Standard fallbacks tried after any custom fallbacks.
    #[serde(default)]
    pub fallback_locales: Vec<Locale>,
}

const BUILTIN_LOCALES: &[(&str, &str, &str, Direction, &[&str])] = &[
    ("en", "English", "English", Direction::Ltr, &[]),
    ("es", "Spanish", "Español", Direction::Ltr, &[]),
    ("es_MX", "Spanish (Mexico)", "Español (México)", Direction::Ltr, &["es"]),
    ("fr", "French", "Français", Direction::Ltr, &[]),
    ("de", "German", "Deutsch", Direction::Ltr, &[]),
    ("pt", "Portuguese", "Português", Direction::Ltr, &[]),
    ("pt_BR", "Portuguese (Brazil)", "Português (Brasil)", Direction::Ltr, &["pt"]),
    ("ar", "Arabic", "عربي", Direction::Rtl, &[]),
    ("zh_CN", "Chinese (Simplified)", "中文 (简体)", Direction::Ltr, &[]),
    ("zh_TW", "Chinese (Traditional)", "中文 (繁體)", Direction::Ltr, &["zh_CN"]),
];

/// Table of available locales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleData {
    locales: BTreeMap<Locale, LocaleInfo>,
}

impl LocaleData {
    /// Build a table. The baseline locale must be present.
    pub fn new(locales: BTreeMap<Locale, LocaleInfo>) -> Result<Self, LocaleError> {
        if !locales.contains_key(FALLBACK_LOCALE) {
            return Err(LocaleError::BaselineMissing);
        }
        Ok(Self { locales })
    }

    /// Parse a JSON object mapping locale codes to [`LocaleInfo`].
    pub fn from_json(json: &str) -> Result<Self, LocaleError> {
        let raw: BTreeMap<String, LocaleInfo> = serde_json::from_str(json)?;
        let mut locales = BTreeMap::new();
        for (code, mut info) in raw {
            info.fallback_locales = info
                .fallback_locales
                .iter()
                .map(|fallback| normalize_code(fallback))
                .collect::<Result<_, _>>()?;
            locales.insert(normalize_code(&code)?, info);
        }
        Self::new(locales)
    }

    /// A small built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        let locales = BUILTIN_LOCALES
            .iter()
            .map(|(code, name, local_name, direction, fallbacks)| {
                let info = LocaleInfo {
                    name: (*name).to_string(),
                    local_name: (*local_name).to_string(),
                    direction: *direction,
                    fallback_locales: fallbacks.iter().map(|l| (*l).to_string()).collect(),
                };
                ((*code).to_string(), info)
            })
            .collect();
        Self { locales }
    }

    #[must_use]
    pub fn contains(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    #[must_use]
    pub fn info(&self, locale: &str) -> Option<&LocaleInfo> {
        self.locales.get(locale)
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.locales.keys()
    }

    /// Standard fallbacks for `locale`; empty for unknown locales.
    #[must_use]
    pub fn fallback_locales(&self, locale: &str) -> &[Locale] {
        self.locales
            .get(locale)
            .map(|info| info.fallback_locales.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn direction(&self, locale: &str) -> Direction {
        self.locales
            .get(locale)
            .map(|info| info.direction)
            .unwrap_or_default()
    }

    /// Map a requested locale onto an available one.
    ///
    /// Tries the normalized code, then its language part (`es_MX` → `es`),
    /// then the baseline.
    #[must_use]
    pub fn resolve(&self, requested: &str) -> Locale {
        let Some(normalized) = normalize_locale_raw(requested) else {
            tracing::warn!(requested, "invalid locale, using {FALLBACK_LOCALE}");
            return FALLBACK_LOCALE.to_string();
        };
        if self.contains(&normalized) {
            return normalized;
        }
        let language = language_of(&normalized);
        if language != normalized && self.contains(language) {
            tracing::warn!(requested, resolved = language, "locale unavailable, using language");
            return language.to_string();
        }
        tracing::warn!(requested, "locale unavailable, using {FALLBACK_LOCALE}");
        FALLBACK_LOCALE.to_string()
    }
}

/// Compute the locale order for `locale`.
///
/// The primary locale comes first, followed by the custom fallbacks, the
/// standard fallbacks from `data`, and the baseline, skipping duplicates.
/// The result ends at the first occurrence of the baseline: every key
/// resolves there, so later entries are never consulted.
#[must_use]
pub fn locale_order(locale: &str, custom_fallbacks: &[Locale], data: &LocaleData) -> Vec<Locale> {
    let mut order: Vec<Locale> = vec![locale.to_string()];
    let candidates = custom_fallbacks
        .iter()
        .map(String::as_str)
        .chain(data.fallback_locales(locale).iter().map(String::as_str))
        .chain(std::iter::once(FALLBACK_LOCALE));
    for candidate in candidates {
        if !order.iter().any(|l| l == candidate) {
            order.push(candidate.to_string());
        }
    }

    let baseline = order.iter().position(|l| l == FALLBACK_LOCALE);
    debug_assert!(baseline.is_some(), "locale order must reach the baseline");
    if let Some(index) = baseline {
        order.truncate(index + 1);
    }
    order
}

/// Selected locale plus derived fallback order.
///
/// Cloning yields another handle to the same state.
#[derive(Clone, Debug)]
pub struct LocaleState {
    data: Rc<LocaleData>,
    locale: Observable<Locale>,
    fallback_locales: Observable<Vec<Locale>>,
    order: Computed<Vec<Locale>>,
}

impl LocaleState {
    /// Create a state for `locale`, resolved against `data`.
    #[must_use]
    pub fn new(data: LocaleData, locale: &str) -> Self {
        let data = Rc::new(data);
        let locale = Observable::new(data.resolve(locale));
        let fallback_locales = Observable::new(Vec::new());

        let order = {
            let (data, current, fallbacks) =
                (Rc::clone(&data), locale.clone(), fallback_locales.clone());
            Computed::new(&[&locale, &fallback_locales], move || {
                let order = current.with(|l| fallbacks.with(|f| locale_order(l, f, &data)));
                tracing::debug!(?order, "locale order recomputed");
                order
            })
        };

        Self {
            data,
            locale,
            fallback_locales,
            order,
        }
    }

    /// Create a state from the `locale` and `fallbackLocales` launch parameters.
    #[must_use]
    pub fn from_query(data: LocaleData, query: &QueryParameters) -> Self {
        let state = Self::new(data, &query.locale.value);
        state.set_fallback_locales(query.fallback_locales.value.clone());
        state
    }

    /// Create a state initialized from system locale detection.
    #[must_use]
    pub fn system(data: LocaleData) -> Self {
        Self::new(data, &detect_system_locale())
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale.get()
    }

    /// Select a locale. Returns the locale actually selected.
    pub fn set_locale(&self, requested: &str) -> Locale {
        let resolved = self.data.resolve(requested);
        self.locale.set(resolved.clone());
        resolved
    }

    #[must_use]
    pub fn fallback_locales(&self) -> Vec<Locale> {
        self.fallback_locales.get()
    }

    /// Replace the custom fallback locales. Invalid codes are dropped.
    pub fn set_fallback_locales(&self, locales: Vec<Locale>) {
        let normalized = locales
            .iter()
            .filter_map(|l| {
                let normalized = normalize_locale_raw(l);
                if normalized.is_none() {
                    tracing::warn!(locale = %l, "dropping invalid fallback locale");
                }
                normalized
            })
            .collect();
        self.fallback_locales.set(normalized);
    }

    /// Current locale order, highest priority first.
    #[must_use]
    pub fn locale_order(&self) -> Vec<Locale> {
        self.order.get()
    }

    /// The derived locale-order cell.
    #[must_use]
    pub fn order(&self) -> &Computed<Vec<Locale>> {
        &self.order
    }

    #[must_use]
    pub fn locale_property(&self) -> &Observable<Locale> {
        &self.locale
    }

    #[must_use]
    pub fn fallback_locales_property(&self) -> &Observable<Vec<Locale>> {
        &self.fallback_locales
    }

    /// Subscribe to selected-locale changes.
    pub fn subscribe(&self, callback: impl Fn(&Locale) + 'static) -> Subscription {
        self.locale.subscribe(callback)
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.locale.with(|l| self.data.direction(l))
    }

    #[must_use]
    pub fn data(&self) -> &LocaleData {
        &self.data
    }

    /// Version counter of the locale order.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.order.version()
    }
}

/// Detect the system locale from environment variables.
///
/// Preference order: `LC_ALL`, then `LANG`. Falls back to `"en"` when unknown.
#[must_use]
pub fn detect_system_locale() -> Locale {
    let lc_all = env::var("LC_ALL").ok();
    let lang = env::var("LANG").ok();
    detect_system_locale_from(lc_all.as_deref(), lang.as_deref())
}

fn detect_system_locale_from(lc_all: Option<&str>, lang: Option<&str>) -> Locale {
    lc_all
        .and_then(normalize_locale_raw)
        .or_else(|| lang.and_then(normalize_locale_raw))
        .unwrap_or_else(|| FALLBACK_LOCALE.to_string())
}

fn normalize_code(code: &str) -> Result<Locale, LocaleError> {
    normalize_locale_raw(code).ok_or_else(|| LocaleError::InvalidCode(code.to_string()))
}

/// Normalize a locale code to `ll` or `ll_RR` form.
///
/// Strips codeset and modifier suffixes (`.UTF-8`, `@euro`), accepts `-` or
/// `_` as separator, and maps `C`/`POSIX` to the baseline.
#[must_use]
pub fn normalize_locale_raw(raw: &str) -> Option<Locale> {
    let raw = raw.trim();
    let raw = raw.split('@').next().unwrap_or(raw);
    let raw = raw.split('.').next().unwrap_or(raw).trim();
    if raw.is_empty() {
        return None;
    }
    if raw.eq_ignore_ascii_case("c") || raw.eq_ignore_ascii_case("posix") {
        return Some(FALLBACK_LOCALE.to_string());
    }

    let mut parts = raw.split(['_', '-']);
    let language = parts.next()?;
    let region = parts.next();
    if parts.next().is_some() {
        return None;
    }
    let valid = |s: &str, len: std::ops::RangeInclusive<usize>| {
        len.contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphabetic())
    };
    if !valid(language, 2..=3) {
        return None;
    }
    match region {
        None => Some(language.to_ascii_lowercase()),
        Some(region) if valid(region, 2..=2) => Some(format!(
            "{}_{}",
            language.to_ascii_lowercase(),
            region.to_ascii_uppercase()
        )),
        Some(_) => None,
    }
}

fn language_of(locale: &str) -> &str {
    locale.split('_').next().unwrap_or(locale)
}
