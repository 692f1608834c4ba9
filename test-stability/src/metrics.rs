// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stability and flakiness percentages derived from a [`HistoryBuffer`].
//!
//! Both percentages are truncated toward zero: one pass out of three records
//! is a stability of 33, not 34.

use crate::history::HistoryBuffer;
use serde::Serialize;

/// Reliability metrics for one test, computed on demand from its history.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct StabilityMetrics {
    /// Percentage of recorded outcomes that passed, 0 to 100.
    pub stability: u8,

    /// Percentage of adjacent recorded outcomes whose result changed, 0 to 100.
    pub flakiness: u8,
}

impl StabilityMetrics {
    /// The metrics shown for a test that isn't tracked in a build with history
    /// attached: such a test has passed in every build since it last failed.
    pub const BASELINE: Self = Self {
        stability: 100,
        flakiness: 0,
    };

    /// Computes both metrics for `buffer`.
    pub fn compute(buffer: &HistoryBuffer) -> Self {
        Self {
            stability: stability(buffer),
            flakiness: flakiness(buffer),
        }
    }
}

/// Returns the percentage of records in `buffer` that passed.
///
/// Returns 0 for an empty buffer.
pub fn stability(buffer: &HistoryBuffer) -> u8 {
    let total = buffer.len();
    if total == 0 {
        return 0;
    }
    let passed = buffer.records().filter(|record| record.passed).count();
    percentage(passed, total)
}

/// Returns the percentage of adjacent record pairs in `buffer` whose outcome
/// differs.
///
/// Returns 0 for a buffer with fewer than two records.
pub fn flakiness(buffer: &HistoryBuffer) -> u8 {
    let total = buffer.len();
    if total < 2 {
        return 0;
    }
    let transitions = buffer
        .records()
        .zip(buffer.records().skip(1))
        .filter(|(older, newer)| older.passed != newer.passed)
        .count();
    percentage(transitions, total - 1)
}

fn percentage(count: usize, total: usize) -> u8 {
    // count <= total, so the result is at most 100.
    (100 * count / total) as u8
}
