//! # Configuration
//!
//! Operators are configured from a flat string map, the shape language
//! bindings hand over. Keys are consumed as they are read; whatever is left
//! when building finishes is an unknown key and is rejected.
//!
//! | Key | Applies to | Value |
//! |-----|------------|-------|
//! | `timeout_ms` | every scheme | per-call deadline in ms, > 0 |
//! | `max_retries` | every scheme | retries after the first attempt |
//! | `retry_at_least_once` | every scheme | `true` / `false` |
//! | `remove_all_mode` | every scheme | `fail_fast` / `ignore_missing` |
//! | `root` | `memory` (optional), `fs` (required, absolute) | path |

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// String key/value configuration with consume-on-read semantics.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    entries: HashMap<String, String>,
}

impl ConfigMap {
    /// Wrap an existing map.
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Remove and return `key`.
    pub fn take(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Remove and return `key`, failing if it is absent.
    pub fn require(&mut self, key: &str) -> Result<String> {
        self.take(key)
            .ok_or_else(|| Error::invalid(format!("missing required config key `{key}`")))
    }

    /// Remove `key` and parse it.
    pub fn take_parsed<T>(&mut self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.take(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|err| {
                    Error::invalid(format!("config key `{key}`: cannot parse {raw:?}: {err}"))
                })
            })
            .transpose()
    }

    /// Succeed only if every key has been consumed.
    pub fn finish(self) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let mut unknown: Vec<String> = self.entries.into_keys().collect();
        unknown.sort();
        Err(Error::invalid(format!(
            "unknown config key(s): {}",
            unknown.join(", ")
        )))
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// How `remove_all` treats failed deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveAllMode {
    /// Stop at the first failure and report how many deletes committed.
    #[default]
    FailFast,
    /// Log each failure and keep going; the call reports success.
    IgnoreMissing,
}

impl FromStr for RemoveAllMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail_fast" => Ok(RemoveAllMode::FailFast),
            "ignore_missing" => Ok(RemoveAllMode::IgnoreMissing),
            other => Err(Error::invalid(format!(
                "remove_all_mode must be `fail_fast` or `ignore_missing`, got {other:?}"
            ))),
        }
    }
}

/// Operator-wide settings that are not tied to a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorOptions {
    /// Per-call deadline; installs a [`TimeoutLayer`](crate::TimeoutLayer).
    pub timeout: Option<Duration>,
    /// Retries after the first attempt; installs a
    /// [`RetryLayer`](crate::RetryLayer).
    pub max_retries: Option<usize>,
    /// Allow retrying non-idempotent writes and renames.
    pub retry_at_least_once: bool,
    /// Failure handling for `remove_all`.
    pub remove_all_mode: RemoveAllMode,
}

impl OperatorOptions {
    /// Consume the operator-wide keys from `config`.
    pub fn from_config(config: &mut ConfigMap) -> Result<Self> {
        let timeout = match config.take_parsed::<u64>("timeout_ms")? {
            Some(0) => return Err(Error::invalid("timeout_ms must be greater than zero")),
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };
        Ok(Self {
            timeout,
            max_retries: config.take_parsed("max_retries")?,
            retry_at_least_once: config
                .take_parsed("retry_at_least_once")?
                .unwrap_or(false),
            remove_all_mode: config
                .take_parsed("remove_all_mode")?
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn options_parse_all_keys() {
        let mut config = ConfigMap::from_iter([
            ("timeout_ms", "1500"),
            ("max_retries", " 4 "),
            ("retry_at_least_once", "true"),
            ("remove_all_mode", "ignore_missing"),
        ]);
        let options = OperatorOptions::from_config(&mut config).unwrap();
        assert_eq!(options.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(options.max_retries, Some(4));
        assert!(options.retry_at_least_once);
        assert_eq!(options.remove_all_mode, RemoveAllMode::IgnoreMissing);
        config.finish().unwrap();
    }

    #[test]
    fn options_default_when_absent() {
        let mut config = ConfigMap::default();
        let options = OperatorOptions::from_config(&mut config).unwrap();
        assert_eq!(options, OperatorOptions::default());
        assert_eq!(options.remove_all_mode, RemoveAllMode::FailFast);
    }

    #[test]
    fn malformed_values_are_invalid() {
        for (key, value) in [
            ("timeout_ms", "soon"),
            ("timeout_ms", "0"),
            ("max_retries", "-1"),
            ("retry_at_least_once", "yes"),
            ("remove_all_mode", "best_effort"),
        ] {
            let mut config = ConfigMap::from_iter([(key, value)]);
            let err = OperatorOptions::from_config(&mut config).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invalid, "{key}={value}");
        }
    }

    #[test]
    fn finish_lists_unknown_keys() {
        let mut config = ConfigMap::from_iter([("root", "/"), ("zeta", "1"), ("alpha", "2")]);
        assert_eq!(config.take("root").as_deref(), Some("/"));
        let err = config.finish().unwrap_err();
        assert_eq!(err.to_string(), "invalid: unknown config key(s): alpha, zeta");
    }
}
