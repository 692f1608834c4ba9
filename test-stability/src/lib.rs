// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Per-test outcome history across a sequence of builds, and the stability and
//! flakiness metrics derived from it.
//!
//! For each build, [`reconcile`](reconcile::reconcile) takes the build's test
//! outcomes and the previous build's [`HistoryMap`](history::HistoryMap), and
//! produces the current build's map:
//!
//! * tests that keep failing, or that are still recovering, get one more
//!   outcome appended to a copy of their previous history;
//! * tests that fail with no history get their history backfilled by walking
//!   backwards through earlier builds with a [`ChainWalk`](chain::ChainWalk);
//! * tests whose whole history is passing again are dropped until the next
//!   failure.
//!
//! Maps attached to past builds are never mutated. Metrics are computed on
//! demand with [`StabilityMetrics`](metrics::StabilityMetrics).
//!
//! The [`build_log`] and [`recorder`] modules provide an in-memory host for the
//! engine, built on the `stability-report` data model.

pub mod build_log;
pub mod chain;
pub mod config;
pub mod errors;
pub mod history;
pub mod metrics;
pub mod outcome;
pub mod recorder;
pub mod reconcile;
