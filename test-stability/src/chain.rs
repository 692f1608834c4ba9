// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Walking from a test result to the same test's result in earlier builds.
//!
//! Test results form a tree per build: a build-level report contains suites,
//! which contain classes, which contain cases. Each node can usually name its
//! counterpart in the previous build directly. For class nodes that link is
//! unreliable in some execution contexts, and the lookup reports
//! [`PreviousResult::LinkBroken`]. In that case the counterpart is recovered
//! one level up: from the previous build's report, find the suite with the
//! same name, then the class with the same name within it.

use crate::outcome::{BuildNumber, TestId, TestStatus};
use std::iter::FusedIterator;
use tracing::debug;

/// The kind of a node in a build's test result tree.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    /// The build-level container of all results.
    Report,

    /// A package-level grouping of classes.
    Suite,

    /// A class-level grouping of cases.
    Class,

    /// A single test case.
    Case,
}

/// The result of asking a node for its counterpart in the previous build.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PreviousResult<N> {
    /// The counterpart was found.
    Found(N),

    /// There is no previous build, or the test did not exist in it.
    NotFound,

    /// The direct link to the previous build is unavailable for this node.
    LinkBroken,
}

impl<N> PreviousResult<N> {
    /// Converts into an `Option`, treating a broken link as not found.
    pub fn found(self) -> Option<N> {
        match self {
            PreviousResult::Found(node) => Some(node),
            PreviousResult::NotFound | PreviousResult::LinkBroken => None,
        }
    }
}

/// A node in a build's test result tree.
///
/// This is the capability the history engine needs from a test result model.
pub trait TestResultNode: Sized {
    /// Returns the stable identity of this node's test.
    fn identity(&self) -> TestId;

    /// Returns the name of this node within its parent.
    fn name(&self) -> &str;

    /// Returns the kind of this node.
    fn kind(&self) -> NodeKind;

    /// Returns the classified outcome of this node in its build.
    fn status(&self) -> TestStatus;

    /// Returns the number of the build this node belongs to.
    fn build_number(&self) -> BuildNumber;

    /// Looks up this node's counterpart in the immediately preceding build.
    fn previous(&self) -> PreviousResult<Self>;

    /// Returns the enclosing node, or `None` for the build-level report.
    fn parent(&self) -> Option<Self>;

    /// Returns the child with the given name.
    fn child_by_name(&self, name: &str) -> Option<Self>;
}

/// Returns `node`'s counterpart in the immediately preceding build.
///
/// Falls back to resolving through the build-level report if the direct link
/// is broken. Any failure along the way ends in `None`.
pub fn previous_result<N: TestResultNode>(node: &N) -> Option<N> {
    match node.previous() {
        PreviousResult::Found(previous) => Some(previous),
        PreviousResult::NotFound => None,
        PreviousResult::LinkBroken => {
            debug!(
                "previous-result link broken for {} in build {}, resolving through the build report",
                node.identity(),
                node.build_number(),
            );
            previous_through_report(node)
        }
    }
}

fn previous_through_report<N: TestResultNode>(node: &N) -> Option<N> {
    let suite = node.parent()?;
    let report = suite.parent()?;
    // The report-level link is reliable, so a broken link here is a dead end.
    let previous_report = report.previous().found()?;
    let previous_suite = previous_report.child_by_name(suite.name())?;
    previous_suite.child_by_name(node.name())
}

/// An iterator over a node's counterparts in successively older builds.
///
/// Each step is one [`previous_result`] lookup. The walk ends at the first
/// build where the test cannot be found.
#[derive(Clone, Debug)]
pub struct ChainWalk<N> {
    current: Option<N>,
}

impl<N: TestResultNode> ChainWalk<N> {
    /// Starts a walk backwards from `node`. The walk does not yield `node`
    /// itself.
    pub fn new(node: &N) -> Self {
        Self {
            current: previous_result(node),
        }
    }
}

impl<N: TestResultNode> Iterator for ChainWalk<N> {
    type Item = N;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        self.current = previous_result(&current);
        Some(current)
    }
}

impl<N: TestResultNode> FusedIterator for ChainWalk<N> {}
