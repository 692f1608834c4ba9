// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by test-stability.
//!
//! History reconciliation itself never fails: every lookup failure degrades to
//! "no prior data". The errors here come from the boundaries around it, namely
//! configuration, stored history and the build log.

use crate::outcome::BuildNumber;
use camino::Utf8PathBuf;
use std::borrow::Cow;
use thiserror::Error;

/// An error that occurs while parsing a
/// [`HistoryCapacity`](crate::config::HistoryCapacity) from a string.
#[derive(Clone, Debug, Error)]
#[error("invalid history capacity `{input}`: {message}")]
#[non_exhaustive]
pub struct HistoryCapacityParseError {
    input: String,
    message: Cow<'static, str>,
}

impl HistoryCapacityParseError {
    pub(crate) fn new(input: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// An error that occurs while loading the stability config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StabilityConfigError {
    /// The config file was explicitly specified but does not exist.
    #[error("stability config file not found at {path}")]
    FileNotFound {
        /// The path that was specified.
        path: Utf8PathBuf,
    },

    /// The config file could not be read.
    #[error("failed to read stability config at {path}")]
    Read {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse stability config at {path}")]
    Parse {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying TOML error.
        #[source]
        error: toml::de::Error,
    },
}

/// An error that occurs while deserializing a stored
/// [`HistoryBuffer`](crate::history::HistoryBuffer).
#[derive(Clone, Debug, Error)]
#[error("history buffer holds {len} records, which exceeds its capacity of {capacity}")]
#[non_exhaustive]
pub struct HistoryBufferError {
    /// The number of stored records.
    pub len: usize,

    /// The stored capacity.
    pub capacity: usize,
}

impl HistoryBufferError {
    pub(crate) fn new(len: usize, capacity: usize) -> Self {
        Self { len, capacity }
    }
}

/// An error returned by [`BuildLog`](crate::build_log::BuildLog) operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum BuildLogError {
    /// A build was pushed whose number is not greater than the newest recorded build.
    #[error("build {build_number} is out of order: builds must come after build {latest}")]
    OutOfOrder {
        /// The number of the rejected build.
        build_number: BuildNumber,

        /// The number of the newest recorded build.
        latest: BuildNumber,
    },

    /// The requested build is not recorded.
    #[error("build {build_number} is not recorded")]
    UnknownBuild {
        /// The number of the requested build.
        build_number: BuildNumber,
    },

    /// A history map was already attached to this build.
    #[error("build {build_number} already has a history map attached")]
    HistoryAlreadyAttached {
        /// The number of the build.
        build_number: BuildNumber,
    },
}
