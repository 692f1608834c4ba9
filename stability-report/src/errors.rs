// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// The level of a [`Report`](crate::Report) at which a duplicate name was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportLevel {
    /// A [`Testsuite`](crate::Testsuite) within a report.
    Testsuite,

    /// A [`Testclass`](crate::Testclass) within a testsuite.
    Testclass,

    /// A [`Testcase`](crate::Testcase) within a testclass.
    Testcase,
}

impl ReportLevel {
    fn as_str(self) -> &'static str {
        match self {
            ReportLevel::Testsuite => "testsuite",
            ReportLevel::Testclass => "testclass",
            ReportLevel::Testcase => "testcase",
        }
    }
}

/// An error returned when a child with the same name already exists.
///
/// Returned by [`Report::add_testsuite`](crate::Report::add_testsuite),
/// [`Testsuite::add_testclass`](crate::Testsuite::add_testclass) and
/// [`Testclass::add_testcase`](crate::Testclass::add_testcase).
#[derive(Clone, Debug, Error)]
#[error("duplicate {} name `{name}` in `{parent}`", .level.as_str())]
#[non_exhaustive]
pub struct DuplicateNameError {
    /// The level at which the duplicate was found.
    pub level: ReportLevel,

    /// The name of the parent the child was being added to.
    pub parent: String,

    /// The duplicated name.
    pub name: String,
}

impl DuplicateNameError {
    pub(crate) fn new(level: ReportLevel, parent: &str, name: &str) -> Self {
        Self {
            level,
            parent: parent.to_owned(),
            name: name.to_owned(),
        }
    }
}
