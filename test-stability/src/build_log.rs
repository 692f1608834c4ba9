// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory log of recorded builds and the test result nodes within them.
//!
//! Each recorded build holds a [`Report`] and, once the recorder has run for
//! it, the [`HistoryMap`] attached to it. [`NodeRef`] implements
//! [`TestResultNode`] over the log, so the chain walk and reconciliation run
//! directly against recorded reports.

use crate::{
    chain::{NodeKind, PreviousResult, TestResultNode},
    errors::BuildLogError,
    history::HistoryMap,
    metrics::StabilityMetrics,
    outcome::{BuildNumber, TestId, TestStatus},
};
use stability_report::{Report, Testcase, TestcaseStatus, Testclass, Testsuite};
use std::{collections::BTreeMap, fmt};
use tracing::debug;

/// One build's report, along with the history attached to it.
#[derive(Clone, Debug)]
pub struct RecordedBuild {
    report: Report,
    history: Option<HistoryMap>,
    class_links_broken: bool,
}

impl RecordedBuild {
    /// Creates a new `RecordedBuild` with no history attached.
    pub fn new(report: Report) -> Self {
        Self {
            report,
            history: None,
            class_links_broken: false,
        }
    }

    /// Marks class-level previous-result links in this build as unavailable.
    ///
    /// Some execution contexts can't link a class result to its counterpart in
    /// the previous build. Lookups for class nodes in this build then report
    /// [`PreviousResult::LinkBroken`].
    pub fn set_class_links_broken(&mut self, broken: bool) -> &mut Self {
        self.class_links_broken = broken;
        self
    }

    /// Returns the report for this build.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Returns the build number.
    pub fn build_number(&self) -> BuildNumber {
        self.report.build_number
    }

    /// Returns the history map attached to this build, if any.
    ///
    /// Builds recorded while the recorder was disabled have no history.
    pub fn attached_history(&self) -> Option<&HistoryMap> {
        self.history.as_ref()
    }

    /// Returns true if class-level previous-result links are unavailable.
    pub fn class_links_broken(&self) -> bool {
        self.class_links_broken
    }

    /// Returns the metrics for `id` as of this build, if the test is tracked.
    pub fn metrics_for(&self, id: &str) -> Option<StabilityMetrics> {
        self.attached_history()?
            .get(id)
            .map(StabilityMetrics::compute)
    }
}

impl From<Report> for RecordedBuild {
    fn from(report: Report) -> Self {
        Self::new(report)
    }
}

/// Recorded builds, ordered by build number.
///
/// Removing a build splices it out: the build before it becomes the previous
/// build of the one after it.
#[derive(Clone, Debug, Default)]
pub struct BuildLog {
    builds: BTreeMap<BuildNumber, RecordedBuild>,
}

impl BuildLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new build.
    ///
    /// The build number must be greater than that of every build recorded so
    /// far.
    pub fn push(
        &mut self,
        build: impl Into<RecordedBuild>,
    ) -> Result<&RecordedBuild, BuildLogError> {
        let build = build.into();
        let build_number = build.build_number();
        if let Some((&latest, _)) = self.builds.last_key_value()
            && build_number <= latest
        {
            return Err(BuildLogError::OutOfOrder {
                build_number,
                latest,
            });
        }

        debug!(
            "recording build {build_number} with {} tests",
            build.report.counts.tests
        );
        Ok(&*self.builds.entry(build_number).or_insert(build))
    }

    /// Removes a build, along with any history attached to it.
    pub fn remove(&mut self, build_number: BuildNumber) -> Result<RecordedBuild, BuildLogError> {
        let build = self
            .builds
            .remove(&build_number)
            .ok_or(BuildLogError::UnknownBuild { build_number })?;
        debug!("removed build {build_number}");
        Ok(build)
    }

    /// Returns the build with the given number.
    pub fn get(&self, build_number: BuildNumber) -> Option<&RecordedBuild> {
        self.builds.get(&build_number)
    }

    /// Returns the newest recorded build.
    pub fn latest(&self) -> Option<&RecordedBuild> {
        self.builds.values().next_back()
    }

    /// Returns the newest build recorded before `build_number`.
    ///
    /// `build_number` itself doesn't need to be recorded.
    pub fn previous_build(&self, build_number: BuildNumber) -> Option<&RecordedBuild> {
        self.builds
            .range(..build_number)
            .next_back()
            .map(|(_, build)| build)
    }

    /// Returns the number of recorded builds.
    pub fn len(&self) -> usize {
        self.builds.len()
    }

    /// Returns true if no builds are recorded.
    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    /// Iterates over recorded builds, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RecordedBuild> + ExactSizeIterator {
        self.builds.values()
    }

    /// Attaches `history` to a build.
    ///
    /// History is attached at most once per build, and is not modified after.
    pub fn attach_history(
        &mut self,
        build_number: BuildNumber,
        history: HistoryMap,
    ) -> Result<&HistoryMap, BuildLogError> {
        let build = self
            .builds
            .get_mut(&build_number)
            .ok_or(BuildLogError::UnknownBuild { build_number })?;
        if build.history.is_some() {
            return Err(BuildLogError::HistoryAlreadyAttached { build_number });
        }
        Ok(&*build.history.insert(history))
    }

    /// Returns the report-level node for a build.
    pub fn root(&self, build_number: BuildNumber) -> Option<NodeRef<'_>> {
        let build = self.get(build_number)?;
        Some(NodeRef::root(self, build))
    }

    /// Returns the node at `path` within a build.
    ///
    /// `path` is a suite name, optionally followed by a class name and a case
    /// name.
    pub fn node(&self, build_number: BuildNumber, path: &[&str]) -> Option<NodeRef<'_>> {
        let mut node = self.root(build_number)?;
        for name in path {
            node = node.child_by_name(name)?;
        }
        Some(node)
    }

    /// Returns the class and case nodes of a build.
    ///
    /// Suites are visited in order. Within a suite, each class is followed by
    /// its cases.
    pub fn list_test_outcomes(
        &self,
        build_number: BuildNumber,
    ) -> Result<Vec<NodeRef<'_>>, BuildLogError> {
        let build = self
            .get(build_number)
            .ok_or(BuildLogError::UnknownBuild { build_number })?;
        let mut outcomes = Vec::with_capacity(build.report.counts.tests);
        for suite in build.report.testsuites() {
            for class in suite.testclasses() {
                outcomes.push(NodeRef::new(self, build, NodePath::Class(suite, class)));
                outcomes.extend(
                    class
                        .testcases()
                        .map(|case| NodeRef::new(self, build, NodePath::Case(suite, class, case))),
                );
            }
        }
        Ok(outcomes)
    }
}

#[derive(Clone, Copy, Debug)]
enum NodePath<'a> {
    Report,
    Suite(&'a Testsuite),
    Class(&'a Testsuite, &'a Testclass),
    Case(&'a Testsuite, &'a Testclass, &'a Testcase),
}

/// A reference to one node in a recorded build's report.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    log: &'a BuildLog,
    build: &'a RecordedBuild,
    path: NodePath<'a>,
}

impl<'a> NodeRef<'a> {
    fn new(log: &'a BuildLog, build: &'a RecordedBuild, path: NodePath<'a>) -> Self {
        Self { log, build, path }
    }

    fn root(log: &'a BuildLog, build: &'a RecordedBuild) -> Self {
        Self::new(log, build, NodePath::Report)
    }

    /// Returns the recorded build this node belongs to.
    pub fn build(&self) -> &'a RecordedBuild {
        self.build
    }

    /// Finds the node at the same path in another build.
    fn resolve_in(&self, build: &'a RecordedBuild) -> Option<Self> {
        let report = &build.report;
        let path = match self.path {
            NodePath::Report => NodePath::Report,
            NodePath::Suite(suite) => NodePath::Suite(report.suite(&suite.name)?),
            NodePath::Class(suite, class) => {
                let suite = report.suite(&suite.name)?;
                NodePath::Class(suite, suite.class(&class.name)?)
            }
            NodePath::Case(suite, class, case) => {
                let suite = report.suite(&suite.name)?;
                let class = suite.class(&class.name)?;
                NodePath::Case(suite, class, class.case(&case.name)?)
            }
        };
        Some(Self::new(self.log, build, path))
    }
}

impl TestResultNode for NodeRef<'_> {
    fn identity(&self) -> TestId {
        match self.path {
            NodePath::Report => TestId::new(&self.build.report.name),
            NodePath::Suite(suite) => TestId::new(&suite.name),
            NodePath::Class(suite, class) => TestId::new(format!("{}.{}", suite.name, class.name)),
            NodePath::Case(suite, class, case) => {
                TestId::new(format!("{}.{}.{}", suite.name, class.name, case.name))
            }
        }
    }

    fn name(&self) -> &str {
        match self.path {
            NodePath::Report => &self.build.report.name,
            NodePath::Suite(suite) => &suite.name,
            NodePath::Class(_, class) => &class.name,
            NodePath::Case(_, _, case) => &case.name,
        }
    }

    fn kind(&self) -> NodeKind {
        match self.path {
            NodePath::Report => NodeKind::Report,
            NodePath::Suite(_) => NodeKind::Suite,
            NodePath::Class(..) => NodeKind::Class,
            NodePath::Case(..) => NodeKind::Case,
        }
    }

    fn status(&self) -> TestStatus {
        let counts = match self.path {
            NodePath::Report => self.build.report.counts,
            NodePath::Suite(suite) => suite.counts,
            NodePath::Class(_, class) => class.counts,
            NodePath::Case(_, _, case) => {
                return match case.status {
                    TestcaseStatus::Success => TestStatus::Passed,
                    TestcaseStatus::NonSuccess { .. } => TestStatus::Failed,
                    TestcaseStatus::Skipped { .. } => TestStatus::Skipped,
                };
            }
        };
        // A group with some passes and some skips counts as passed.
        TestStatus::from_counts(counts.fail_count(), counts.passed())
    }

    fn build_number(&self) -> BuildNumber {
        self.build.build_number()
    }

    fn previous(&self) -> PreviousResult<Self> {
        if matches!(self.path, NodePath::Class(..)) && self.build.class_links_broken {
            return PreviousResult::LinkBroken;
        }
        match self
            .log
            .previous_build(self.build_number())
            .and_then(|previous| self.resolve_in(previous))
        {
            Some(node) => PreviousResult::Found(node),
            None => PreviousResult::NotFound,
        }
    }

    fn parent(&self) -> Option<Self> {
        let path = match self.path {
            NodePath::Report => return None,
            NodePath::Suite(_) => NodePath::Report,
            NodePath::Class(suite, _) => NodePath::Suite(suite),
            NodePath::Case(suite, class, _) => NodePath::Class(suite, class),
        };
        Some(Self::new(self.log, self.build, path))
    }

    fn child_by_name(&self, name: &str) -> Option<Self> {
        let path = match self.path {
            NodePath::Report => NodePath::Suite(self.build.report.suite(name)?),
            NodePath::Suite(suite) => NodePath::Class(suite, suite.class(name)?),
            NodePath::Class(suite, class) => NodePath::Case(suite, class, class.case(name)?),
            NodePath::Case(..) => return None,
        };
        Some(Self::new(self.log, self.build, path))
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("build_number", &self.build_number())
            .field("kind", &self.kind())
            .field("identity", &self.identity())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::{test_helpers::*, *};
    use crate::{chain::ChainWalk, history::test_helpers::buffer};
    use pretty_assertions::assert_eq;
    use stability_report::NonSuccessKind;
    use test_case::test_case;

    fn log_with(builds: &[Report]) -> BuildLog {
        let mut log = BuildLog::new();
        for report in builds {
            log.push(report.clone()).expect("builds are in order");
        }
        log
    }

    #[test]
    fn push_rejects_out_of_order_builds() {
        let mut log = BuildLog::new();
        log.push(report(3, &[])).unwrap();

        for number in [1, 3] {
            assert_eq!(
                log.push(report(number, &[])).unwrap_err(),
                BuildLogError::OutOfOrder {
                    build_number: number,
                    latest: 3,
                }
            );
        }
        assert_eq!(log.push(report(4, &[])).unwrap().build_number(), 4);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn removed_builds_are_spliced_out() {
        let mut log = log_with(&[report(1, &[]), report(2, &[]), report(3, &[])]);
        assert_eq!(log.previous_build(3).map(|b| b.build_number()), Some(2));

        log.remove(2).unwrap();
        assert_eq!(log.previous_build(3).map(|b| b.build_number()), Some(1));
        assert_eq!(log.previous_build(1).map(|b| b.build_number()), None);
        assert_eq!(
            log.remove(2).unwrap_err(),
            BuildLogError::UnknownBuild { build_number: 2 }
        );

        log.remove(3).unwrap();
        assert_eq!(log.latest().map(|b| b.build_number()), Some(1));
    }

    #[test]
    fn iterates_builds_in_order() {
        let log = log_with(&[
            report(2, &[("pkg", "Cls", "t", pass())]),
            report(5, &[("pkg", "Cls", "t", fail()), ("pkg", "Cls", "u", skip())]),
        ]);

        let numbers: Vec<_> = log.iter().map(|build| build.build_number()).collect();
        assert_eq!(numbers, [2, 5]);
        let newest = log.iter().next_back().unwrap();
        assert_eq!(newest.report().counts.tests, 2);
        assert_eq!(newest.report().counts.failures, 1);
        assert!(!newest.class_links_broken());
    }

    #[test]
    fn history_is_attached_once() {
        let mut log = log_with(&[report(1, &[])]);
        assert!(log.get(1).unwrap().attached_history().is_none());

        let history: HistoryMap = [(TestId::new("pkg.Cls.t"), buffer(3, &[(1, false)]))]
            .into_iter()
            .collect();
        log.attach_history(1, history.clone()).unwrap();
        assert_eq!(log.get(1).unwrap().attached_history(), Some(&history));
        assert_eq!(
            log.get(1).unwrap().metrics_for("pkg.Cls.t"),
            Some(StabilityMetrics {
                stability: 0,
                flakiness: 0,
            })
        );
        assert_eq!(log.get(1).unwrap().metrics_for("pkg.Cls.other"), None);

        assert_eq!(
            log.attach_history(1, HistoryMap::new()).unwrap_err(),
            BuildLogError::HistoryAlreadyAttached { build_number: 1 }
        );
        assert_eq!(
            log.attach_history(2, HistoryMap::new()).unwrap_err(),
            BuildLogError::UnknownBuild { build_number: 2 }
        );
    }

    #[test]
    fn outcomes_list_classes_then_cases() {
        let log = log_with(&[report(
            1,
            &[
                ("b.pkg", "Second", "x", pass()),
                ("a.pkg", "First", "y", fail()),
                ("b.pkg", "Second", "w", skip()),
                ("a.pkg", "Other", "z", pass()),
            ],
        )]);

        let outcomes: Vec<_> = log
            .list_test_outcomes(1)
            .unwrap()
            .iter()
            .map(|node| (node.identity().to_string(), node.kind(), node.status()))
            .collect();
        assert_eq!(
            outcomes,
            [
                ("b.pkg.Second".to_owned(), NodeKind::Class, TestStatus::Passed),
                ("b.pkg.Second.x".to_owned(), NodeKind::Case, TestStatus::Passed),
                ("b.pkg.Second.w".to_owned(), NodeKind::Case, TestStatus::Skipped),
                ("a.pkg.First".to_owned(), NodeKind::Class, TestStatus::Failed),
                ("a.pkg.First.y".to_owned(), NodeKind::Case, TestStatus::Failed),
                ("a.pkg.Other".to_owned(), NodeKind::Class, TestStatus::Passed),
                ("a.pkg.Other.z".to_owned(), NodeKind::Case, TestStatus::Passed),
            ]
        );

        assert_eq!(
            log.list_test_outcomes(7).unwrap_err(),
            BuildLogError::UnknownBuild { build_number: 7 }
        );
    }

    #[test_case(&[pass(), pass()], TestStatus::Passed ; "all passed")]
    #[test_case(&[pass(), skip()], TestStatus::Passed ; "passed with a skip")]
    #[test_case(&[skip(), skip()], TestStatus::Skipped ; "all skipped")]
    #[test_case(&[pass(), fail()], TestStatus::Failed ; "one failure")]
    #[test_case(
        &[pass(), TestcaseStatus::non_success(NonSuccessKind::Error)],
        TestStatus::Failed
        ; "one error"
    )]
    fn class_status(cases: &[TestcaseStatus], expected: TestStatus) {
        let names = ["a", "b"];
        let rows: Vec<_> = names
            .iter()
            .zip(cases)
            .map(|(name, status)| ("pkg", "Cls", *name, status.clone()))
            .collect();
        let log = log_with(&[report(1, &rows)]);
        assert_eq!(log.node(1, &["pkg", "Cls"]).unwrap().status(), expected);
    }

    #[test]
    fn navigation() {
        let log = log_with(&[report(1, &[("pkg", "Cls", "t", pass())])]);
        let case = log.node(1, &["pkg", "Cls", "t"]).unwrap();
        assert_eq!(case.name(), "t");
        assert_eq!(case.kind(), NodeKind::Case);

        let class = case.parent().unwrap();
        assert_eq!(class.identity(), TestId::new("pkg.Cls"));
        let suite = class.parent().unwrap();
        assert_eq!(suite.kind(), NodeKind::Suite);
        let root = suite.parent().unwrap();
        assert_eq!(root.kind(), NodeKind::Report);
        assert!(root.parent().is_none());

        assert!(case.child_by_name("anything").is_none());
        assert!(log.node(1, &["pkg", "Missing"]).is_none());
    }

    #[test]
    fn previous_resolves_by_name() {
        let log = log_with(&[
            report(1, &[("pkg", "Cls", "t", fail())]),
            report(2, &[("pkg", "Other", "u", pass())]),
            report(3, &[("pkg", "Cls", "t", pass())]),
        ]);

        // Build 2 has no such case, so the chain ends there.
        let case = log.node(3, &["pkg", "Cls", "t"]).unwrap();
        assert!(matches!(case.previous(), PreviousResult::NotFound));

        let suite = log.node(3, &["pkg"]).unwrap();
        let walked: Vec<_> = ChainWalk::new(&suite).map(|n| n.build_number()).collect();
        assert_eq!(walked, [2, 1]);
    }

    #[test]
    fn broken_class_links() {
        let mut log = log_with(&[report(1, &[("pkg", "Cls", "t", fail())])]);
        let mut build = RecordedBuild::new(report(2, &[("pkg", "Cls", "t", pass())]));
        build.set_class_links_broken(true);
        log.push(build).unwrap();

        let class = log.node(2, &["pkg", "Cls"]).unwrap();
        assert!(matches!(class.previous(), PreviousResult::LinkBroken));
        let case = log.node(2, &["pkg", "Cls", "t"]).unwrap();
        assert!(matches!(case.previous(), PreviousResult::Found(_)));

        // The walk recovers the class through the previous build's report.
        let walked: Vec<_> = ChainWalk::new(&class)
            .map(|n| (n.build_number(), n.status()))
            .collect();
        assert_eq!(walked, [(1, TestStatus::Failed)]);
    }
}
