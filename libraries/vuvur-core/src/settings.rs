//! Layered runtime settings
//!
//! Values resolve as built-in defaults, then persisted user overrides, then
//! environment overrides. Environment values are read once at startup and
//! lock their key for the lifetime of the process: they are reported in
//! `locked_keys` and writes to them are rejected.
//!
//! # Example
//!
//! ```rust
//! use vuvur_core::settings::{SettingsResolver, SCAN_INTERVAL};
//! use std::collections::HashMap;
//!
//! let resolver = SettingsResolver::from_vars([("VUVUR_SCAN_INTERVAL", "0")]);
//! let resolved = resolver.resolve(&HashMap::new());
//!
//! assert!(resolved.scan_interval().is_zero());
//! assert!(resolved.locked_keys.contains(SCAN_INTERVAL));
//! ```

use crate::error::{Result, VuvurError};
use crate::types::MediaSort;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

/// Seconds between periodic scans, 0 disables periodic scanning
pub const SCAN_INTERVAL: &str = "scan_interval";

/// Gallery sort order used when a request does not name one
pub const DEFAULT_SORT: &str = "default_sort";

const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3600;

/// A setting the server understands
#[derive(Debug, Clone, Copy)]
pub struct SettingDescriptor {
    /// Setting key
    pub key: &'static str,
    /// Environment variable that locks the key
    pub env_var: &'static str,
}

/// Every known setting
pub const SETTINGS: &[SettingDescriptor] = &[
    SettingDescriptor {
        key: SCAN_INTERVAL,
        env_var: "VUVUR_SCAN_INTERVAL",
    },
    SettingDescriptor {
        key: DEFAULT_SORT,
        env_var: "VUVUR_DEFAULT_SORT",
    },
];

/// Settings after all layers are applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSettings {
    /// Effective values by key
    pub settings: BTreeMap<String, Value>,

    /// Keys fixed by the environment
    pub locked_keys: BTreeSet<String>,
}

impl ResolvedSettings {
    /// Periodic scan interval
    pub fn scan_interval(&self) -> Duration {
        let secs = self
            .settings
            .get(SCAN_INTERVAL)
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Default gallery sort
    pub fn default_sort(&self) -> MediaSort {
        self.settings
            .get(DEFAULT_SORT)
            .and_then(Value::as_str)
            .and_then(MediaSort::from_str)
            .unwrap_or_default()
    }
}

/// Resolves settings against the environment captured at startup
#[derive(Debug, Clone, Default)]
pub struct SettingsResolver {
    env_overrides: BTreeMap<String, Value>,
}

impl SettingsResolver {
    /// Capture overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Capture overrides from an explicit set of variables
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut env_overrides = BTreeMap::new();
        for (name, raw) in vars {
            let Some(descriptor) = SETTINGS.iter().find(|d| d.env_var == name.as_ref()) else {
                continue;
            };
            match parse_env_value(descriptor.key, raw.as_ref()) {
                Ok(value) => {
                    env_overrides.insert(descriptor.key.to_string(), value);
                }
                Err(e) => {
                    tracing::warn!("Ignoring {}: {}", descriptor.env_var, e);
                }
            }
        }
        Self { env_overrides }
    }

    /// Keys fixed by the environment
    pub fn locked_keys(&self) -> BTreeSet<String> {
        self.env_overrides.keys().cloned().collect()
    }

    /// Whether `key` is fixed by the environment
    pub fn is_locked(&self, key: &str) -> bool {
        self.env_overrides.contains_key(key)
    }

    /// Apply defaults, then `user_overrides`, then the environment
    pub fn resolve(&self, user_overrides: &HashMap<String, Value>) -> ResolvedSettings {
        let mut settings = defaults();

        for (key, value) in user_overrides {
            // Stored values from older versions may no longer validate
            if validate_value(key, value).is_ok() {
                settings.insert(key.clone(), value.clone());
            } else {
                tracing::debug!("Skipping invalid stored setting {}", key);
            }
        }

        for (key, value) in &self.env_overrides {
            settings.insert(key.clone(), value.clone());
        }

        ResolvedSettings {
            settings,
            locked_keys: self.locked_keys(),
        }
    }

    /// Check that a user write to `key` is allowed and well-typed
    pub fn validate_update(&self, key: &str, value: &Value) -> Result<()> {
        if self.is_locked(key) {
            return Err(VuvurError::SettingLocked(key.to_string()));
        }
        validate_value(key, value)
    }
}

fn defaults() -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    map.insert(
        SCAN_INTERVAL.to_string(),
        Value::from(DEFAULT_SCAN_INTERVAL_SECS),
    );
    map.insert(
        DEFAULT_SORT.to_string(),
        Value::from(MediaSort::default().as_str()),
    );
    map
}

fn validate_value(key: &str, value: &Value) -> Result<()> {
    match key {
        SCAN_INTERVAL => value.as_u64().map(|_| ()).ok_or_else(|| {
            VuvurError::invalid_input("scan_interval must be a non-negative integer")
        }),
        DEFAULT_SORT => value
            .as_str()
            .and_then(MediaSort::from_str)
            .map(|_| ())
            .ok_or_else(|| VuvurError::invalid_input(format!("unknown sort order: {}", value))),
        other => Err(VuvurError::UnknownSetting(other.to_string())),
    }
}

fn parse_env_value(key: &str, raw: &str) -> Result<Value> {
    let raw = raw.trim();
    let value = match key {
        SCAN_INTERVAL => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| VuvurError::invalid_input(format!("not an integer: {}", raw)))?,
        _ => Value::from(raw),
    };
    validate_value(key, &value)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let resolved = SettingsResolver::default().resolve(&HashMap::new());
        assert_eq!(resolved.scan_interval(), Duration::from_secs(3600));
        assert_eq!(resolved.default_sort(), MediaSort::DateDesc);
        assert!(resolved.locked_keys.is_empty());
    }

    #[test]
    fn test_user_override_applies() {
        let mut overrides = HashMap::new();
        overrides.insert(SCAN_INTERVAL.to_string(), json!(60));
        overrides.insert(DEFAULT_SORT.to_string(), json!("random"));

        let resolved = SettingsResolver::default().resolve(&overrides);
        assert_eq!(resolved.scan_interval(), Duration::from_secs(60));
        assert_eq!(resolved.default_sort(), MediaSort::Random);
    }

    #[test]
    fn test_env_wins_and_locks() {
        let resolver = SettingsResolver::from_vars([("VUVUR_SCAN_INTERVAL", "15")]);

        let mut overrides = HashMap::new();
        overrides.insert(SCAN_INTERVAL.to_string(), json!(60));

        let resolved = resolver.resolve(&overrides);
        assert_eq!(resolved.scan_interval(), Duration::from_secs(15));
        assert!(resolved.locked_keys.contains(SCAN_INTERVAL));
        assert!(!resolved.locked_keys.contains(DEFAULT_SORT));

        let err = resolver
            .validate_update(SCAN_INTERVAL, &json!(30))
            .unwrap_err();
        assert!(matches!(err, VuvurError::SettingLocked(_)));
        assert!(resolver.validate_update(DEFAULT_SORT, &json!("file_asc")).is_ok());
    }

    #[test]
    fn test_invalid_env_is_ignored() {
        let resolver = SettingsResolver::from_vars([
            ("VUVUR_SCAN_INTERVAL", "soon"),
            ("UNRELATED", "1"),
        ]);
        assert!(resolver.locked_keys().is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let resolver = SettingsResolver::default();
        assert!(resolver.validate_update(SCAN_INTERVAL, &json!(-5)).is_err());
        assert!(resolver.validate_update(SCAN_INTERVAL, &json!("60")).is_err());
        assert!(resolver.validate_update(DEFAULT_SORT, &json!("upside_down")).is_err());
        assert!(matches!(
            resolver.validate_update("theme", &json!("dark")),
            Err(VuvurError::UnknownSetting(_))
        ));
    }
}
