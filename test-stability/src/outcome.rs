// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test identities and per-build outcome classification.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt};

/// The number of a build. Builds are processed in increasing order.
pub type BuildNumber = u64;

/// A stable identifier for one test across builds.
///
/// Identities are opaque to the history engine: they are produced by the test
/// result model and only compared for equality and ordering.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(SmolStr);

impl TestId {
    /// Creates a new `TestId`.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The classified outcome of a test in a single build.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TestStatus {
    /// The test ran and passed.
    Passed,

    /// The test ran and failed or errored.
    Failed,

    /// The test did not run.
    Skipped,
}

impl TestStatus {
    /// Classifies a node from its fail count and pass count.
    ///
    /// Any failure makes the node failed. Otherwise the node passed if anything
    /// in it passed, and is skipped if nothing ran.
    pub fn from_counts(fail_count: usize, pass_count: usize) -> Self {
        if fail_count > 0 {
            TestStatus::Failed
        } else if pass_count > 0 {
            TestStatus::Passed
        } else {
            TestStatus::Skipped
        }
    }

    /// Returns true if this is [`TestStatus::Passed`].
    pub fn is_passed(self) -> bool {
        self == TestStatus::Passed
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Passed => write!(f, "passed"),
            TestStatus::Failed => write!(f, "failed"),
            TestStatus::Skipped => write!(f, "skipped"),
        }
    }
}
