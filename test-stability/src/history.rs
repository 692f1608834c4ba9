// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-test outcome history, and the per-build map of it.

use crate::{
    config::HistoryCapacity,
    errors::HistoryBufferError,
    outcome::{BuildNumber, TestId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque, btree_map};

/// The observed outcome of one test in one build.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutcomeRecord {
    /// The build the outcome was observed in.
    pub build_number: BuildNumber,

    /// Whether the test passed in that build.
    pub passed: bool,
}

impl OutcomeRecord {
    /// Creates a new `OutcomeRecord`.
    pub fn new(build_number: BuildNumber, passed: bool) -> Self {
        Self {
            build_number,
            passed,
        }
    }
}

/// A fixed-capacity sequence of outcome records for one test, oldest first.
///
/// Appending to a full buffer evicts the oldest record. Records are expected
/// to be appended in increasing build order; the buffer does not check this.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistoryBufferRepr")]
pub struct HistoryBuffer {
    capacity: HistoryCapacity,
    records: VecDeque<OutcomeRecord>,
}

impl HistoryBuffer {
    /// Creates an empty buffer with the given capacity.
    pub fn new(capacity: HistoryCapacity) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.get()),
        }
    }

    /// Returns the capacity of this buffer.
    pub fn capacity(&self) -> HistoryCapacity {
        self.capacity
    }

    /// Returns the number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds `record` as the newest entry, evicting the oldest entry if the
    /// buffer is full.
    pub fn append(&mut self, record: OutcomeRecord) {
        if self.records.len() == self.capacity.get() {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Returns an independent buffer with the same capacity and records.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Returns an independent buffer with a possibly different capacity,
    /// holding this buffer's records.
    ///
    /// If `capacity` is smaller than the number of records, the oldest records
    /// are evicted.
    pub fn copy_with_capacity(&self, capacity: HistoryCapacity) -> Self {
        if capacity == self.capacity {
            return self.copy();
        }
        let mut copy = Self::new(capacity);
        for record in &self.records {
            copy.append(*record);
        }
        copy
    }

    /// Returns true if every record passed. Vacuously true for an empty buffer.
    pub fn all_passed(&self) -> bool {
        self.records.iter().all(|record| record.passed)
    }

    /// Iterates over the records, oldest first.
    pub fn records(
        &self,
    ) -> impl ExactSizeIterator<Item = &OutcomeRecord> + DoubleEndedIterator + Clone {
        self.records.iter()
    }

    /// Returns the newest record, if any.
    pub fn latest(&self) -> Option<&OutcomeRecord> {
        self.records.back()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HistoryBufferRepr {
    capacity: HistoryCapacity,
    records: VecDeque<OutcomeRecord>,
}

impl TryFrom<HistoryBufferRepr> for HistoryBuffer {
    type Error = HistoryBufferError;

    fn try_from(repr: HistoryBufferRepr) -> Result<Self, Self::Error> {
        if repr.records.len() > repr.capacity.get() {
            return Err(HistoryBufferError::new(
                repr.records.len(),
                repr.capacity.get(),
            ));
        }
        Ok(Self {
            capacity: repr.capacity,
            records: repr.records,
        })
    }
}

/// The history of every tracked test, as attached to one build.
///
/// A `HistoryMap` is built once per build by
/// [`reconcile`](crate::reconcile::reconcile) and is not modified afterwards.
/// Tests that are not tracked have no entry.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryMap {
    buffers: BTreeMap<TestId, HistoryBuffer>,
}

impl HistoryMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the history for the given test, if it is tracked.
    pub fn get(&self, id: &str) -> Option<&HistoryBuffer> {
        self.buffers.get(id)
    }

    /// Returns true if the given test is tracked.
    pub fn contains(&self, id: &str) -> bool {
        self.buffers.contains_key(id)
    }

    /// Returns the number of tracked tests.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if no tests are tracked.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Iterates over tracked tests in identity order.
    pub fn iter(&self) -> btree_map::Iter<'_, TestId, HistoryBuffer> {
        self.buffers.iter()
    }
}

impl FromIterator<(TestId, HistoryBuffer)> for HistoryMap {
    fn from_iter<T: IntoIterator<Item = (TestId, HistoryBuffer)>>(iter: T) -> Self {
        Self {
            buffers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a HistoryMap {
    type Item = (&'a TestId, &'a HistoryBuffer);
    type IntoIter = btree_map::Iter<'a, TestId, HistoryBuffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}


#[cfg(test)]
mod tests {
    use super::{test_helpers::*, *};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test]
    fn append_evicts_oldest_when_full() {
        let mut buffer = buffer(3, &[(1, true), (2, false), (3, true)]);
        assert_eq!(buffer.len(), 3);

        buffer.append(OutcomeRecord::new(4, false));
        assert_eq!(pairs(&buffer), [(2, false), (3, true), (4, false)]);
        assert_eq!(buffer.latest(), Some(&OutcomeRecord::new(4, false)));
    }

    #[test]
    fn capacity_one_keeps_only_newest() {
        let buffer = buffer(1, &[(1, false), (2, true)]);
        assert_eq!(pairs(&buffer), [(2, true)]);
    }

    #[test_case(&[], true ; "empty")]
    #[test_case(&[(1, true), (2, true)], true ; "all passed")]
    #[test_case(&[(1, true), (2, false)], false ; "newest failed")]
    #[test_case(&[(1, false), (2, true)], false ; "oldest failed")]
    fn all_passed(records: &[(BuildNumber, bool)], expected: bool) {
        assert_eq!(buffer(5, records).all_passed(), expected);
    }

    #[test]
    fn copy_is_independent() {
        let original = buffer(2, &[(1, false), (2, true)]);
        let mut copy = original.copy();
        copy.append(OutcomeRecord::new(3, true));

        assert_eq!(pairs(&original), [(1, false), (2, true)]);
        assert_eq!(pairs(&copy), [(2, true), (3, true)]);
        assert_eq!(copy.capacity(), original.capacity());
    }

    #[test]
    fn copy_with_smaller_capacity_evicts_oldest() {
        let original = buffer(5, &[(1, false), (2, true), (3, false)]);
        let shrunk = original.copy_with_capacity(capacity(2));
        assert_eq!(pairs(&shrunk), [(2, true), (3, false)]);
        assert_eq!(shrunk.capacity(), capacity(2));

        let grown = original.copy_with_capacity(capacity(10));
        assert_eq!(pairs(&grown), pairs(&original));
        assert_eq!(grown.capacity(), capacity(10));
    }

    #[test]
    fn deserialize_rejects_overfull_buffer() {
        let json = r#"{"capacity":1,"records":[
            {"build-number":1,"passed":true},
            {"build-number":2,"passed":false}
        ]}"#;
        let err = serde_json::from_str::<HistoryBuffer>(json).unwrap_err();
        assert!(
            err.to_string().contains("exceeds its capacity of 1"),
            "unexpected error: {err}"
        );

        let json = r#"{"capacity":0,"records":[]}"#;
        assert!(serde_json::from_str::<HistoryBuffer>(json).is_err());
    }

    #[test]
    fn map_serializes_by_test_id() {
        let map: HistoryMap = [(
            TestId::new("pkg.Cls.case"),
            buffer(3, &[(4, false), (5, true)]),
        )]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "pkg.Cls.case": {
                    "capacity": 3,
                    "records": [
                        {"build-number": 4, "passed": false},
                        {"build-number": 5, "passed": true},
                    ],
                },
            })
        );
        let back: HistoryMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }

    #[proptest]
    fn len_never_exceeds_capacity(
        #[strategy(1usize..8)] cap: usize,
        #[strategy(proptest::collection::vec(any::<bool>(), 0..32))] outcomes: Vec<bool>,
    ) {
        let mut buffer = HistoryBuffer::new(capacity(cap));
        for (i, passed) in outcomes.iter().enumerate() {
            buffer.append(OutcomeRecord::new(i as BuildNumber, *passed));
            prop_assert!(buffer.len() <= cap);
        }

        // The buffer always holds the newest `cap` outcomes, in order.
        let expected: Vec<_> = outcomes
            .iter()
            .enumerate()
            .map(|(i, passed)| (i as BuildNumber, *passed))
            .skip(outcomes.len().saturating_sub(cap))
            .collect();
        prop_assert_eq!(pairs(&buffer), expected);
    }
}
