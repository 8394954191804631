//! Application settings.
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! mode = "production"
//! debug = false
//! base_path = "/blog/"
//! namespace = "Admin"
//! method_override_header = "X-HTTP-Method-Override"
//!
//! # anything else is kept as free-form application config
//! [mail]
//! from = "noreply@example.com"
//! ```
//!
//! The `WAYPOST_MODE` environment variable, when set, wins over `mode`.

use std::path::Path;

use serde::Deserialize;
use toml::{Table, Value};
use tracing::warn;

use crate::error::Error;

/// Environment variable overriding [`Settings::mode`].
pub const MODE_ENV: &str = "WAYPOST_MODE";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Application mode, e.g. `development` or `production`.
    pub mode: String,
    /// Re-raise dispatch errors to the diagnostics page instead of the
    /// error handler.
    pub debug: bool,
    /// Prefix stripped from request URIs. Derived from the request's script
    /// name when unset.
    pub base_path: Option<String>,
    /// Namespace qualifying `Controller@action` descriptors.
    pub namespace: String,
    pub method_override_header: String,
    /// Application keys not known to the dispatcher.
    #[serde(flatten)]
    pub extra: Table,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: "development".to_owned(),
            debug: true,
            base_path: None,
            namespace: String::new(),
            method_override_header: "X-HTTP-Method-Override".to_owned(),
            extra: Table::new(),
        }
    }
}

impl Settings {
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    /// Reads a TOML file and applies the environment override.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path)?;
        let mut settings = Self::from_toml(&source)?;
        settings.apply_env();
        Ok(settings)
    }

    /// Applies `WAYPOST_MODE` if it is set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(mode) = std::env::var(MODE_ENV) {
            if !mode.is_empty() {
                self.mode = mode;
            }
        }
    }

    /// Looks up a setting by key, known or free-form.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "mode"                   => Some(Value::String(self.mode.clone())),
            "debug"                  => Some(Value::Boolean(self.debug)),
            "base_path"              => self.base_path.clone().map(Value::String),
            "namespace"              => Some(Value::String(self.namespace.clone())),
            "method_override_header" => Some(Value::String(self.method_override_header.clone())),
            _                        => self.extra.get(key).cloned(),
        }
    }

    /// Sets one key. A known key given a value of the wrong type is ignored
    /// with a warning.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let slot = match key {
            "mode"                   => &mut self.mode,
            "namespace"              => &mut self.namespace,
            "method_override_header" => &mut self.method_override_header,
            "debug" => {
                match value {
                    Value::Boolean(debug) => self.debug = debug,
                    other => warn!(key, value = %other, "ignoring non-boolean setting"),
                }
                return;
            }
            "base_path" => {
                match value {
                    Value::String(path) => self.base_path = Some(path),
                    other => warn!(key, value = %other, "ignoring non-string setting"),
                }
                return;
            }
            _ => {
                self.extra.insert(key.to_owned(), value);
                return;
            }
        };
        match value {
            Value::String(s) => *slot = s,
            other => warn!(key, value = %other, "ignoring non-string setting"),
        }
    }

    /// Sets every key of `table`, replacing existing values whole.
    pub fn merge(&mut self, table: Table) {
        for (key, value) in table {
            self.set(&key, value);
        }
    }

    /// Like [`merge`](Self::merge), but free-form tables present on both
    /// sides are merged key by key instead of replaced.
    pub fn merge_recursive(&mut self, table: Table) {
        for (key, value) in table {
            match value {
                Value::Table(incoming) if matches!(self.extra.get(&key), Some(Value::Table(_))) => {
                    if let Some(Value::Table(existing)) = self.extra.get_mut(&key) {
                        merge_tables(existing, incoming);
                    }
                }
                value => self.set(&key, value),
            }
        }
    }
}

fn merge_tables(into: &mut Table, from: Table) {
    for (key, value) in from {
        match value {
            Value::Table(incoming) if matches!(into.get(&key), Some(Value::Table(_))) => {
                if let Some(Value::Table(existing)) = into.get_mut(&key) {
                    merge_tables(existing, incoming);
                }
            }
            value => {
                into.insert(key, value);
            }
        }
    }
}
