// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for history tracking.
//!
//! The only tunable is the per-test history capacity:
//!
//! ```toml
//! [history]
//! capacity = 30
//! ```
//!
//! A zero or negative capacity is rejected here, so the rest of the crate can
//! assume a capacity of at least 1.

use crate::errors::{HistoryCapacityParseError, StabilityConfigError};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, io, num::NonZeroUsize, str::FromStr};
use tracing::{debug, warn};

/// The maximum number of outcome records kept per test.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HistoryCapacity(NonZeroUsize);

impl HistoryCapacity {
    /// The default capacity, 30 builds.
    pub const DEFAULT: Self = match NonZeroUsize::new(30) {
        Some(n) => Self(n),
        None => unreachable!(),
    };

    /// Creates a new capacity.
    pub const fn new(capacity: NonZeroUsize) -> Self {
        Self(capacity)
    }

    /// Returns the capacity as a `usize`. Always at least 1.
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for HistoryCapacity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for HistoryCapacity {
    type Err = HistoryCapacityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Err(e) => Err(HistoryCapacityParseError::new(s, e.to_string())),
            Ok(n) if n <= 0 => Err(HistoryCapacityParseError::new(
                s,
                "capacity must be at least 1",
            )),
            Ok(n) => usize::try_from(n)
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Self)
                .ok_or_else(|| HistoryCapacityParseError::new(s, "capacity is too large")),
        }
    }
}

impl fmt::Display for HistoryCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for HistoryCapacity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.get() as u64)
    }
}

impl<'de> Deserialize<'de> for HistoryCapacity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = HistoryCapacity;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a positive integer")
            }

            // Note that TOML uses i64, not u64.
            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v <= 0 {
                    return Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Signed(v),
                        &self,
                    ));
                }
                self.visit_u64(v as u64)
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                usize::try_from(v)
                    .ok()
                    .and_then(NonZeroUsize::new)
                    .map(HistoryCapacity)
                    .ok_or_else(|| {
                        serde::de::Error::invalid_value(serde::de::Unexpected::Unsigned(v), &self)
                    })
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// Specifies where to load stability configuration from.
#[derive(Clone, Copy, Debug)]
pub enum StabilityConfigLocation<'a> {
    /// Use only the built-in defaults.
    Default,

    /// Load configuration from an explicit path, layered over the defaults.
    ///
    /// Returns an error if the file does not exist.
    Explicit(&'a Utf8Path),
}

/// Stability configuration after the user's settings have been applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StabilityConfig {
    history_capacity: HistoryCapacity,
}

impl StabilityConfig {
    /// Creates a config with the given history capacity.
    pub fn new(history_capacity: HistoryCapacity) -> Self {
        Self { history_capacity }
    }

    /// Loads and resolves configuration from the given location.
    pub fn load(location: StabilityConfigLocation<'_>) -> Result<Self, StabilityConfigError> {
        Self::load_with_warnings(location, &mut DefaultConfigWarnings)
    }

    fn load_with_warnings(
        location: StabilityConfigLocation<'_>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, StabilityConfigError> {
        let defaults = DefaultStabilityConfig::from_embedded();
        let custom = match location {
            StabilityConfigLocation::Default => {
                debug!("stability config: using built-in defaults");
                None
            }
            StabilityConfigLocation::Explicit(path) => {
                match DeserializedStabilityConfig::from_path_with_warnings(path, warnings)? {
                    Some(config) => Some(config),
                    None => {
                        return Err(StabilityConfigError::FileNotFound {
                            path: path.to_owned(),
                        });
                    }
                }
            }
        };

        let history_capacity = custom
            .and_then(|custom| custom.history.capacity)
            .unwrap_or(defaults.history.capacity);

        Ok(Self { history_capacity })
    }

    /// Returns the history capacity applied to every test.
    pub fn history_capacity(&self) -> HistoryCapacity {
        self.history_capacity
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self::new(HistoryCapacity::DEFAULT)
    }
}

/// Handles warnings produced while loading a config file.
trait ConfigWarnings {
    /// Called with the set of keys in `config_file` that were not recognized.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Logs config warnings through `tracing`.
struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let keys = unknown.iter().cloned().collect::<Vec<_>>().join(", ");
        warn!("in stability config file {config_file}, ignoring unknown configuration keys: {keys}");
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedStabilityConfig {
    #[serde(default)]
    history: DeserializedHistoryConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedHistoryConfig {
    #[serde(default)]
    capacity: Option<HistoryCapacity>,
}

impl DeserializedStabilityConfig {
    /// Returns `Ok(None)` if the file does not exist.
    fn from_path_with_warnings(
        path: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, StabilityConfigError> {
        debug!("stability config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("stability config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(StabilityConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| StabilityConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(path, &unknown);
        }

        debug!("stability config: loaded successfully from {path}");
        Ok(Some(config))
    }

    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: DeserializedStabilityConfig =
            serde_ignored::deserialize(deserializer, |path| {
                unknown.insert(path.to_string());
            })?;
        Ok((config, unknown))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultStabilityConfig {
    history: DefaultHistoryConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultHistoryConfig {
    capacity: HistoryCapacity,
}

impl DefaultStabilityConfig {
    const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Panics if the embedded TOML is invalid or contains unknown keys.
    fn from_embedded() -> Self {
        let deserializer = toml::Deserializer::parse(Self::DEFAULT_CONFIG)
            .expect("embedded default stability config should parse");
        let mut unknown = BTreeSet::new();
        let config: DefaultStabilityConfig =
            serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })
            .expect("embedded default stability config should be valid");

        if !unknown.is_empty() {
            panic!(
                "found unknown keys in default stability config: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use camino_tempfile::tempdir;
    use indoc::indoc;
    use test_case::test_case;

    #[derive(Default)]
    struct TestConfigWarnings {
        unknown_keys: Option<(Utf8PathBuf, BTreeSet<String>)>,
    }

    impl ConfigWarnings for TestConfigWarnings {
        fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
            self.unknown_keys = Some((config_file.to_owned(), unknown.clone()));
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = DefaultStabilityConfig::from_embedded();
        assert_eq!(config.history.capacity, HistoryCapacity::DEFAULT);
        assert_eq!(
            StabilityConfig::load(StabilityConfigLocation::Default).unwrap(),
            StabilityConfig::default()
        );
    }

    #[test_case("30", Some(30) ; "default value")]
    #[test_case(" 5 ", Some(5) ; "surrounding whitespace")]
    #[test_case("1", Some(1) ; "minimum")]
    #[test_case("0", None ; "zero")]
    #[test_case("-3", None ; "negative")]
    #[test_case("thirty", None ; "not a number")]
    fn parse_capacity(input: &str, expected: Option<usize>) {
        let parsed = input.parse::<HistoryCapacity>();
        match expected {
            Some(n) => assert_eq!(parsed.unwrap().get(), n),
            None => assert!(parsed.is_err(), "{input} should be rejected"),
        }
    }

    #[test_case(
        indoc! {r#"
            [history]
            capacity = 5
        "#},
        Some(5)

        ; "explicit capacity"
    )]
    #[test_case(
        indoc! {r#"
            [history]
        "#},
        Some(30)

        ; "capacity falls back to default"
    )]
    #[test_case("", Some(30) ; "empty file")]
    #[test_case(
        indoc! {r#"
            [history]
            capacity = 0
        "#},
        None

        ; "zero capacity"
    )]
    #[test_case(
        indoc! {r#"
            [history]
            capacity = -1
        "#},
        None

        ; "negative capacity"
    )]
    fn load_capacity(config_contents: &str, expected: Option<usize>) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stability.toml");
        std::fs::write(&path, config_contents).unwrap();

        let config = StabilityConfig::load(StabilityConfigLocation::Explicit(&path));
        match expected {
            Some(n) => assert_eq!(config.unwrap().history_capacity().get(), n),
            None => assert!(
                matches!(config, Err(StabilityConfigError::Parse { .. })),
                "expected parse error, got {config:?}"
            ),
        }
    }

    #[test]
    fn ignored_keys() {
        let config_contents = indoc! {r#"
            ignored1 = "test"

            [history]
            capacity = 12
            ignored2 = true
        "#};

        let dir = tempdir().unwrap();
        let path = dir.path().join("stability.toml");
        std::fs::write(&path, config_contents).unwrap();

        let mut warnings = TestConfigWarnings::default();
        let config = StabilityConfig::load_with_warnings(
            StabilityConfigLocation::Explicit(&path),
            &mut warnings,
        )
        .expect("config is valid");
        assert_eq!(config.history_capacity().get(), 12);

        let (warned_path, unknown) = warnings.unknown_keys.expect("warnings were produced");
        assert_eq!(warned_path, path);
        assert_eq!(
            unknown,
            BTreeSet::from(["ignored1".to_owned(), "history.ignored2".to_owned()])
        );
    }

    #[test]
    fn explicit_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let err = StabilityConfig::load(StabilityConfigLocation::Explicit(&path)).unwrap_err();
        assert!(
            matches!(&err, StabilityConfigError::FileNotFound { path: p } if *p == path),
            "unexpected error: {err:?}"
        );
    }
}
