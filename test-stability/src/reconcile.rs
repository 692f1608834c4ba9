// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Computing a build's [`HistoryMap`] from its outcomes and the previous
//! build's map.
//!
//! Per test, across builds, history moves between two states:
//!
//! | tracked before | outcome | result                                         |
//! |----------------|---------|------------------------------------------------|
//! | no             | failed  | tracked, history backfilled from earlier builds |
//! | no             | passed  | untracked                                      |
//! | no             | skipped | untracked                                      |
//! | yes            | failed  | tracked, failure appended                      |
//! | yes            | passed  | pass appended; untracked if all records passed |
//! | yes            | skipped | tracked, history carried over unchanged        |

use crate::{
    chain::{ChainWalk, TestResultNode},
    config::HistoryCapacity,
    history::{HistoryBuffer, HistoryMap, OutcomeRecord},
    outcome::{BuildNumber, TestStatus},
};
use std::collections::BTreeMap;
use tracing::debug;

/// Computes the history map for build `build_number`.
///
/// `outcomes` are the build's test result nodes, and `previous` is the map
/// attached to the immediately preceding build, if it has one. `previous` is
/// only read: histories carried forward are copied before being extended.
///
/// Each test's result depends only on its own outcome, its own entry in
/// `previous`, and, for a first failure, its own results in earlier builds.
pub fn reconcile<N: TestResultNode>(
    build_number: BuildNumber,
    outcomes: impl IntoIterator<Item = N>,
    previous: Option<&HistoryMap>,
    capacity: HistoryCapacity,
) -> HistoryMap {
    let mut buffers = BTreeMap::new();
    let mut count = 0usize;

    for node in outcomes {
        count += 1;
        let id = node.identity();
        let previous_buffer = previous.and_then(|map| map.get(id.as_str()));

        match next_history(&node, previous_buffer, build_number, capacity) {
            Some(buffer) => {
                buffers.insert(id, buffer);
            }
            None => {
                if previous_buffer.is_some() {
                    debug!("{id} passed in every tracked build, no longer tracking");
                }
                buffers.remove(&id);
            }
        }
    }

    debug!(
        "build {build_number}: found {count} test results, tracking {}",
        buffers.len()
    );
    buffers.into_iter().collect()
}

/// Returns the history to store for `node`, or `None` if it is not tracked.
fn next_history<N: TestResultNode>(
    node: &N,
    previous: Option<&HistoryBuffer>,
    build_number: BuildNumber,
    capacity: HistoryCapacity,
) -> Option<HistoryBuffer> {
    match (previous, node.status()) {
        (Some(previous), TestStatus::Passed) => {
            let mut buffer = previous.copy_with_capacity(capacity);
            buffer.append(OutcomeRecord::new(build_number, true));
            (!buffer.all_passed()).then_some(buffer)
        }
        (Some(previous), TestStatus::Failed) => {
            let mut buffer = previous.copy_with_capacity(capacity);
            buffer.append(OutcomeRecord::new(build_number, false));
            Some(buffer)
        }
        // A skip neither passes nor fails, so the series isn't extended.
        (Some(previous), TestStatus::Skipped) => Some(previous.copy_with_capacity(capacity)),
        (None, TestStatus::Failed) => Some(backfill(node, build_number, capacity)),
        (None, TestStatus::Passed | TestStatus::Skipped) => None,
    }
}

/// Builds the initial history for a test that failed with no tracked history.
///
/// Walks back through at most `capacity - 1` earlier builds, reserving the
/// last slot for the current failure.
fn backfill<N: TestResultNode>(
    node: &N,
    build_number: BuildNumber,
    capacity: HistoryCapacity,
) -> HistoryBuffer {
    let newest_first: Vec<_> = ChainWalk::new(node)
        .take(capacity.get() - 1)
        .map(|previous| OutcomeRecord::new(previous.build_number(), previous.status().is_passed()))
        .collect();

    debug!(
        "found failed test {} with no tracked history, backfilled {} earlier outcomes",
        node.identity(),
        newest_first.len(),
    );
    if newest_first.len() < capacity.get() - 1 {
        debug!("chain for {} exhausted before filling its history", node.identity());
    }

    let mut buffer = HistoryBuffer::new(capacity);
    for record in newest_first.into_iter().rev() {
        buffer.append(record);
    }
    buffer.append(OutcomeRecord::new(build_number, false));
    buffer
}
