// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording stability history for builds as they complete.

use crate::{
    build_log::{BuildLog, RecordedBuild},
    config::StabilityConfig,
    errors::BuildLogError,
    history::HistoryMap,
    metrics::StabilityMetrics,
    outcome::BuildNumber,
    reconcile::reconcile,
};
use tracing::debug;

/// Computes and attaches a [`HistoryMap`] to each build it is run for.
///
/// Builds recorded directly into the [`BuildLog`] without going through the
/// recorder have no history attached. The first build recorded after them
/// starts from scratch, backfilling history for any failing test.
#[derive(Clone, Debug, Default)]
pub struct StabilityRecorder {
    config: StabilityConfig,
}

impl StabilityRecorder {
    /// Creates a new recorder with the given config.
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    /// Returns the config this recorder was created with.
    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Adds `build` to the log and attaches its history.
    pub fn record_build<'log>(
        &self,
        log: &'log mut BuildLog,
        build: impl Into<RecordedBuild>,
    ) -> Result<&'log HistoryMap, BuildLogError> {
        let build_number = log.push(build)?.build_number();
        self.publish(log, build_number)
    }

    /// Computes the history for an already-recorded build and attaches it.
    ///
    /// The history is reconciled against the build immediately before
    /// `build_number` in the log.
    pub fn publish<'log>(
        &self,
        log: &'log mut BuildLog,
        build_number: BuildNumber,
    ) -> Result<&'log HistoryMap, BuildLogError> {
        let history = {
            let log = &*log;
            let build = log
                .get(build_number)
                .ok_or(BuildLogError::UnknownBuild { build_number })?;
            if build.attached_history().is_some() {
                return Err(BuildLogError::HistoryAlreadyAttached { build_number });
            }

            let previous = log
                .previous_build(build_number)
                .and_then(RecordedBuild::attached_history);
            if previous.is_none() {
                debug!("build {build_number}: no history attached to the previous build");
            }

            reconcile(
                build_number,
                log.list_test_outcomes(build_number)?,
                previous,
                self.config.history_capacity(),
            )
        };

        log.attach_history(build_number, history)
    }

    /// Returns the metrics for `id` as of build `build_number`.
    ///
    /// Returns `None` if the build is unknown, has no history attached, or
    /// isn't tracking the test.
    pub fn metrics_for(
        &self,
        log: &BuildLog,
        build_number: BuildNumber,
        id: &str,
    ) -> Option<StabilityMetrics> {
        log.get(build_number)?.metrics_for(id)
    }
}
