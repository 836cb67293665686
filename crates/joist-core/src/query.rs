#![forbid(unsafe_code)]

//! Launch parameters parsed from a query string.
//!
//! A simulation is configured at launch by a URL-style query string such as
//! `?screens=2,1&homeScreen=false&locale=es`. Each recognized key is parsed
//! into a typed value plus a presence flag, because "left at the default" and
//! "explicitly set to the default" are different things to screen selection.
//!
//! # Recognized keys
//!
//! | Key               | Type            | Default |
//! |-------------------|-----------------|---------|
//! | `homeScreen`      | `bool`          | `true`  |
//! | `initialScreen`   | `usize`         | `0`     |
//! | `screens`         | `Vec<usize>`    | empty (all screens) |
//! | `locale`          | `String`        | `"en"`  |
//! | `fallbackLocales` | `Vec<String>`   | empty   |
//!
//! Unknown keys are ignored. Malformed values are [`QueryError`]s.

use thiserror::Error;

/// A parsed parameter value and whether the key was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param<T> {
    pub value: T,
    pub specified: bool,
}

impl<T> Param<T> {
    /// A parameter left at its default.
    pub fn default_value(value: T) -> Self {
        Self {
            value,
            specified: false,
        }
    }

    /// A parameter explicitly given on the query string.
    pub fn specified(value: T) -> Self {
        Self {
            value,
            specified: true,
        }
    }
}

/// Errors produced while parsing launch parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid boolean for {key}: {value:?} (expected true or false)")]
    InvalidBool { key: &'static str, value: String },

    #[error("invalid integer for {key}: {value:?}")]
    InvalidInteger { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    EmptyValue { key: &'static str },

    #[error("malformed percent escape in {0:?}")]
    BadEscape(String),
}

/// Typed launch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameters {
    pub home_screen: Param<bool>,
    pub initial_screen: Param<usize>,
    pub screens: Param<Vec<usize>>,
    pub locale: Param<String>,
    pub fallback_locales: Param<Vec<String>>,
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self {
            home_screen: Param::default_value(true),
            initial_screen: Param::default_value(0),
            screens: Param::default_value(Vec::new()),
            locale: Param::default_value("en".to_string()),
            fallback_locales: Param::default_value(Vec::new()),
        }
    }
}

impl QueryParameters {
    /// Parse a query string. A leading `?` is optional.
    ///
    /// When a key repeats, the last occurrence wins.
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let query = query.trim().trim_start_matches('?');
        let mut params = Self::default();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = match pair.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (pair, None),
            };
            let key = percent_decode(raw_key)?;
            let value = raw_value.map(percent_decode).transpose()?;

            match key.as_str() {
                "homeScreen" => {
                    params.home_screen = Param::specified(parse_bool("homeScreen", value)?);
                }
                "initialScreen" => {
                    let value = require("initialScreen", value)?;
                    params.initial_screen =
                        Param::specified(parse_index("initialScreen", &value)?);
                }
                "screens" => {
                    let value = require("screens", value)?;
                    let indices = value
                        .split(',')
                        .map(|item| parse_index("screens", item))
                        .collect::<Result<Vec<_>, _>>()?;
                    params.screens = Param::specified(indices);
                }
                "locale" => {
                    params.locale = Param::specified(require("locale", value)?);
                }
                "fallbackLocales" => {
                    let value = value.unwrap_or_default();
                    let locales = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                    params.fallback_locales = Param::specified(locales);
                }
                other => {
                    crate::debug!(key = other, "ignoring unrecognized launch parameter");
                }
            }
        }

        Ok(params)
    }
}

fn require(key: &'static str, value: Option<String>) -> Result<String, QueryError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(QueryError::EmptyValue { key }),
    }
}

/// A bare `homeScreen` flag means `true`.
fn parse_bool(key: &'static str, value: Option<String>) -> Result<bool, QueryError> {
    match value.as_deref().map(str::trim) {
        None | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(QueryError::InvalidBool {
            key,
            value: other.to_string(),
        }),
    }
}

fn parse_index(key: &'static str, raw: &str) -> Result<usize, QueryError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| QueryError::InvalidInteger {
            key,
            value: raw.to_string(),
        })
}

fn percent_decode(raw: &str) -> Result<String, QueryError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| QueryError::BadEscape(raw.to_string()))?;
                out.push(hex);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| QueryError::BadEscape(raw.to_string()))
}
