// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{DuplicateNameError, ReportLevel};
use indexmap::map::{Entry, IndexMap};

/// Tallies of testcase outcomes, kept at every level of a [`Report`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TestCounts {
    /// The total number of testcases.
    pub tests: usize,

    /// The number of testcases that failed in an expected way.
    pub failures: usize,

    /// The number of testcases that failed in an unexpected way.
    pub errors: usize,

    /// The number of testcases that were not run.
    pub skipped: usize,
}

impl TestCounts {
    /// Returns the number of testcases that passed.
    pub fn passed(&self) -> usize {
        self.tests - self.failures - self.errors - self.skipped
    }

    /// Returns the number of testcases that did not pass, counting failures and errors together.
    pub fn fail_count(&self) -> usize {
        self.failures + self.errors
    }

    fn record(&mut self, status: &TestcaseStatus) {
        self.tests += 1;
        match status {
            TestcaseStatus::Success => {}
            TestcaseStatus::NonSuccess { kind, .. } => match kind {
                NonSuccessKind::Failure => self.failures += 1,
                NonSuccessKind::Error => self.errors += 1,
            },
            TestcaseStatus::Skipped { .. } => self.skipped += 1,
        }
    }

    fn merge(&mut self, other: TestCounts) {
        self.tests += other.tests;
        self.failures += other.failures;
        self.errors += other.errors;
        self.skipped += other.skipped;
    }
}

/// The root element of a report: all test results produced by a single build.
#[derive(Clone, Debug)]
pub struct Report {
    /// The name of this report, typically the job name.
    pub name: String,

    /// The number of the build that produced this report.
    pub build_number: u64,

    /// Counts over all testsuites.
    pub counts: TestCounts,

    testsuites: IndexMap<String, Testsuite>,
}

impl Report {
    /// Creates a new, empty `Report` for the given build.
    pub fn new(name: impl Into<String>, build_number: u64) -> Self {
        Self {
            name: name.into(),
            build_number,
            counts: TestCounts::default(),
            testsuites: IndexMap::new(),
        }
    }

    /// Adds a new testsuite and updates the counts.
    ///
    /// Returns an error if a testsuite with the same name was already added.
    pub fn add_testsuite(&mut self, testsuite: Testsuite) -> Result<&mut Self, DuplicateNameError> {
        let counts = testsuite.counts;
        insert_unique(
            &mut self.testsuites,
            testsuite.name.clone(),
            testsuite,
            ReportLevel::Testsuite,
            &self.name,
        )?;
        self.counts.merge(counts);
        Ok(self)
    }

    /// Adds several testsuites and updates the counts.
    pub fn add_testsuites(
        &mut self,
        testsuites: impl IntoIterator<Item = Testsuite>,
    ) -> Result<&mut Self, DuplicateNameError> {
        for testsuite in testsuites {
            self.add_testsuite(testsuite)?;
        }
        Ok(self)
    }

    /// Returns the testsuite with the given name.
    pub fn suite(&self, name: &str) -> Option<&Testsuite> {
        self.testsuites.get(name)
    }

    /// Iterates over the testsuites in insertion order.
    pub fn testsuites(&self) -> impl ExactSizeIterator<Item = &Testsuite> {
        self.testsuites.values()
    }
}

/// A package-level grouping of testclasses.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Testsuite {
    /// The name of this testsuite.
    pub name: String,

    /// Counts over all testclasses in this suite.
    pub counts: TestCounts,

    testclasses: IndexMap<String, Testclass>,
}

impl Testsuite {
    /// Creates a new `Testsuite`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counts: TestCounts::default(),
            testclasses: IndexMap::new(),
        }
    }

    /// Adds a testclass to this testsuite and updates the counts.
    pub fn add_testclass(&mut self, testclass: Testclass) -> Result<&mut Self, DuplicateNameError> {
        let counts = testclass.counts;
        insert_unique(
            &mut self.testclasses,
            testclass.name.clone(),
            testclass,
            ReportLevel::Testclass,
            &self.name,
        )?;
        self.counts.merge(counts);
        Ok(self)
    }

    /// Adds several testclasses and updates the counts.
    ///
    /// Stops at the first duplicate name. Testclasses added before it are kept.
    pub fn add_testclasses(
        &mut self,
        testclasses: impl IntoIterator<Item = Testclass>,
    ) -> Result<&mut Self, DuplicateNameError> {
        for testclass in testclasses {
            self.add_testclass(testclass)?;
        }
        Ok(self)
    }

    /// Returns the testclass with the given name.
    pub fn class(&self, name: &str) -> Option<&Testclass> {
        self.testclasses.get(name)
    }

    /// Iterates over the testclasses in insertion order.
    pub fn testclasses(&self) -> impl ExactSizeIterator<Item = &Testclass> {
        self.testclasses.values()
    }
}

/// A class-level grouping of testcases.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Testclass {
    /// The simple name of the class, without its package.
    pub name: String,

    /// Counts over all testcases in this class.
    pub counts: TestCounts,

    testcases: IndexMap<String, Testcase>,
}

impl Testclass {
    /// Creates a new `Testclass`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counts: TestCounts::default(),
            testcases: IndexMap::new(),
        }
    }

    /// Adds a testcase to this testclass and updates the counts.
    pub fn add_testcase(&mut self, testcase: Testcase) -> Result<&mut Self, DuplicateNameError> {
        let status = testcase.status.clone();
        insert_unique(
            &mut self.testcases,
            testcase.name.clone(),
            testcase,
            ReportLevel::Testcase,
            &self.name,
        )?;
        self.counts.record(&status);
        Ok(self)
    }

    /// Adds several testcases and updates the counts.
    ///
    /// Stops at the first duplicate name. Testcases added before it are kept.
    pub fn add_testcases(
        &mut self,
        testcases: impl IntoIterator<Item = Testcase>,
    ) -> Result<&mut Self, DuplicateNameError> {
        for testcase in testcases {
            self.add_testcase(testcase)?;
        }
        Ok(self)
    }

    /// Returns the testcase with the given name.
    pub fn case(&self, name: &str) -> Option<&Testcase> {
        self.testcases.get(name)
    }

    /// Iterates over the testcases in insertion order.
    pub fn testcases(&self) -> impl ExactSizeIterator<Item = &Testcase> {
        self.testcases.values()
    }
}

/// Represents a single testcase.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Testcase {
    /// The name of the testcase.
    pub name: String,

    /// The status of this test.
    pub status: TestcaseStatus,
}

impl Testcase {
    /// Creates a new testcase.
    pub fn new(name: impl Into<String>, status: TestcaseStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Represents the success or failure of a testcase.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestcaseStatus {
    /// This testcase passed.
    Success,

    /// This testcase did not pass.
    NonSuccess {
        /// Whether this testcase failed in an expected way (failure) or an unexpected way (error).
        kind: NonSuccessKind,

        /// The failure message.
        message: Option<String>,

        /// The "type" of failure that occurred.
        ty: Option<String>,
    },

    /// This testcase was not run.
    Skipped {
        /// The skip message.
        message: Option<String>,

        /// The "type" of skip that occurred.
        ty: Option<String>,
    },
}

impl TestcaseStatus {
    /// Creates a new `TestcaseStatus` that represents a successful test.
    pub fn success() -> Self {
        TestcaseStatus::Success
    }

    /// Creates a new `TestcaseStatus` that represents an unsuccessful test.
    pub fn non_success(kind: NonSuccessKind) -> Self {
        TestcaseStatus::NonSuccess {
            kind,
            message: None,
            ty: None,
        }
    }

    /// Creates a new `TestcaseStatus` that represents a failed test.
    pub fn failure() -> Self {
        Self::non_success(NonSuccessKind::Failure)
    }

    /// Creates a new `TestcaseStatus` that represents a test that errored.
    pub fn error() -> Self {
        Self::non_success(NonSuccessKind::Error)
    }

    /// Creates a new `TestcaseStatus` that represents a skipped test.
    pub fn skipped() -> Self {
        TestcaseStatus::Skipped {
            message: None,
            ty: None,
        }
    }

    /// Returns true if this testcase passed.
    pub fn is_success(&self) -> bool {
        matches!(self, TestcaseStatus::Success)
    }

    /// Sets the message. No-op if this is a success case.
    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        let message_mut = match self {
            TestcaseStatus::Success => return self,
            TestcaseStatus::NonSuccess { message, .. } => message,
            TestcaseStatus::Skipped { message, .. } => message,
        };
        *message_mut = Some(message.into());
        self
    }

    /// Sets the type. No-op if this is a success case.
    pub fn set_type(&mut self, ty: impl Into<String>) -> &mut Self {
        let ty_mut = match self {
            TestcaseStatus::Success => return self,
            TestcaseStatus::NonSuccess { ty, .. } => ty,
            TestcaseStatus::Skipped { ty, .. } => ty,
        };
        *ty_mut = Some(ty.into());
        self
    }
}

/// The way in which a testcase did not pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NonSuccessKind {
    /// This is an expected failure, such as a failed assertion.
    Failure,

    /// This is an unexpected error, such as an uncaught exception.
    Error,
}

fn insert_unique<T>(
    map: &mut IndexMap<String, T>,
    name: String,
    value: T,
    level: ReportLevel,
    parent: &str,
) -> Result<(), DuplicateNameError> {
    match map.entry(name) {
        Entry::Occupied(entry) => Err(DuplicateNameError::new(level, parent, entry.key())),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}
