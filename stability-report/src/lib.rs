// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory model of one build's test results, shaped like a JUnit report.
//!
//! A [`Report`] is the build-level container. It holds package-level
//! [`Testsuite`]s, which hold class-level [`Testclass`]es, which hold the leaf
//! [`Testcase`]s. Every level can be looked up by name, and counts are kept up
//! to date as children are added.

mod errors;
mod report;

pub use errors::*;
pub use report::*;
