//! The traversal state machine.
//!
//! One sequential loop: scan the window for the topmost group, filter it
//! against the date range, process or skip it, then advance the scroll
//! cursor far enough that the group can never be seen again. The surface is
//! eventually consistent and flaky; every call's failure is classified
//! before it is allowed to change engine state.

use std::sync::Arc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::{EngineConfig, EngineLimits};
use crate::daterange::{DateRange, RangePosition};
use crate::errors::SurfaceError;
use crate::locator::GroupLocator;
use crate::report::{ReportBuilder, RunReport};
use crate::scroll::ScrollCursor;
use crate::selection::{ProcessResult, SelectionController};
use crate::surface::Surface;
use crate::types::{settle, Pacing};

/// Counters owned by the engine, mutated only inside the loop body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraversalState {
    /// Groups whose download was started.
    pub processed: u64,
    /// Groups outside the date range, advanced past without processing.
    pub skipped: u64,
    /// Groups that could not be acted on but still count as handled.
    pub failed: u64,
    pub consecutive_empty_rounds: u32,
    pub consecutive_errors: u32,
}

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// The configured number of consecutive empty scan rounds passed;
    /// the timeline has nothing left to show.
    Exhausted,
    /// A heading predating the range appeared. Only sound while the surface
    /// renders groups in non-increasing date order; a re-sorted or pinned
    /// timeline would make this stop early. Known limitation, kept to match
    /// the surface as it behaves today.
    RangeStopped,
    /// A fatal fault: the session ended, or the deadline passed. No surface
    /// call is issued after this.
    FatalAbort { reason: String },
}

/// Drives the scan/filter/process/advance loop over one surface session.
pub struct TraversalEngine {
    surface: Arc<dyn Surface>,
    locator: GroupLocator,
    selection: SelectionController,
    cursor: ScrollCursor,
    range: DateRange,
    pacing: Pacing,
    limits: EngineLimits,
    batch_size: usize,
    deadline: Option<Instant>,
    state: TraversalState,
    report: ReportBuilder,
}

impl TraversalEngine {
    pub fn new(surface: Arc<dyn Surface>, config: EngineConfig) -> Self {
        Self {
            surface,
            locator: GroupLocator::new(config.band),
            selection: SelectionController::new(config.pacing.clone()),
            cursor: ScrollCursor::default(),
            range: config.range,
            pacing: config.pacing,
            limits: config.limits,
            batch_size: config.batch_size,
            deadline: config.deadline,
            state: TraversalState::default(),
            report: ReportBuilder::new(),
        }
    }

    /// Attach a pre-configured report builder (e.g. with the download dir).
    pub fn with_report(mut self, report: ReportBuilder) -> Self {
        self.report = report;
        self
    }

    /// Run to a terminal state and return the final report. The engine
    /// signals completion through the report; whether the session stays
    /// open afterwards is the caller's decision.
    pub async fn run(mut self) -> RunReport {
        info!(range = %self.range, "starting traversal");
        let outcome = self.drive().await;
        match &outcome {
            Outcome::Exhausted => info!("timeline exhausted"),
            Outcome::RangeStopped => info!("date range exhausted"),
            Outcome::FatalAbort { reason } => error!(%reason, "traversal aborted"),
        }
        let report = self.report.finish(self.state, outcome, self.cursor.offset());
        info!("{}", report.summary());
        report
    }

    async fn drive(&mut self) -> Outcome {
        loop {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return self.abort(SurfaceError::SessionClosed(
                        "session deadline exceeded".into(),
                    ));
                }
            }

            // Pre-check: drop anything still selected. Covers leftovers
            // from a previous run on the first pass, and a deselect that
            // gave up on the previous iteration after that.
            if let Err(e) = self.selection.clear_pending(self.surface.as_ref()).await {
                return self.abort(e);
            }

            let located = match self.locator.locate_next(self.surface.as_ref()).await {
                Ok(found) => found,
                Err(e) if e.is_fatal() => return self.abort(e),
                Err(e) => {
                    if self.note_transient("scan", &e).await {
                        return self.abort(SurfaceError::SessionClosed(
                            "session gone after repeated scan failures".into(),
                        ));
                    }
                    settle(self.pacing.retry).await;
                    continue;
                }
            };

            let Some(group) = located else {
                self.state.consecutive_empty_rounds += 1;
                info!(
                    round = self.state.consecutive_empty_rounds,
                    "no group visible, scrolling on"
                );
                match self.cursor.advance_default(self.surface.as_ref()).await {
                    Ok(()) => self.state.consecutive_errors = 0,
                    Err(e) if e.is_fatal() => return self.abort(e),
                    Err(e) => {
                        if self.note_transient("scroll", &e).await {
                            return self.abort(SurfaceError::SessionClosed(
                                "session gone after repeated scroll failures".into(),
                            ));
                        }
                    }
                }
                settle(self.pacing.empty_round).await;
                if self.state.consecutive_empty_rounds >= self.limits.max_empty_rounds {
                    return Outcome::Exhausted;
                }
                continue;
            };

            self.state.consecutive_empty_rounds = 0;

            let position = match self.range.classify(&group.label) {
                Ok(position) => position,
                Err(e) => {
                    // Never drop a group just because its heading drifted
                    // from the expected format; record it and process.
                    warn!(label = %group.label, "unparsable heading, processing anyway: {e}");
                    self.report
                        .record_failure(&group.label, &format!("unparsable date label: {e}"));
                    RangePosition::Within
                }
            };

            match position {
                RangePosition::Before => {
                    info!(label = %group.label, "heading predates the range, stopping");
                    return Outcome::RangeStopped;
                }
                RangePosition::After => {
                    self.state.skipped += 1;
                    info!(
                        label = %group.label,
                        skipped = self.state.skipped,
                        "heading after the range, skipping"
                    );
                }
                RangePosition::Within => {
                    match self.selection.process(self.surface.as_ref(), &group).await {
                        Ok(ProcessResult::Started) => {
                            self.state.processed += 1;
                            info!(
                                label = %group.label,
                                processed = self.state.processed,
                                "group handled"
                            );
                            if self.batch_size > 0
                                && self.state.processed % self.batch_size as u64 == 0
                            {
                                info!(
                                    batch = self.batch_size,
                                    total = self.state.processed,
                                    "batch finished"
                                );
                            }
                        }
                        Ok(ProcessResult::ActionFailed { reason }) => {
                            // Handled anyway: after the next scroll this
                            // rendering can never be re-identified, so a
                            // retry could double-process.
                            self.state.failed += 1;
                            warn!(label = %group.label, %reason, "group could not be processed");
                            self.report.record_failure(&group.label, &reason);
                        }
                        Err(e) => return self.abort(e),
                    }
                }
            }

            // Processed, failed or skipped: the group is handled, move it
            // out of the scan band for good.
            match self
                .cursor
                .advance_past(self.surface.as_ref(), group.y)
                .await
            {
                Ok(_) => self.state.consecutive_errors = 0,
                Err(e) if e.is_fatal() => return self.abort(e),
                Err(e) => {
                    if self.note_transient("advance", &e).await {
                        return self.abort(SurfaceError::SessionClosed(
                            "session gone after repeated scroll failures".into(),
                        ));
                    }
                }
            }
            settle(self.pacing.post_scroll).await;
        }
    }

    fn abort(&mut self, cause: SurfaceError) -> Outcome {
        self.report.record_failure("session", &cause.to_string());
        Outcome::FatalAbort {
            reason: cause.to_string(),
        }
    }

    /// Count a transient failure. Past the bound the session gets one
    /// liveness probe: repeated transient failures are not inherently
    /// fatal, but a dead session is. Returns true when the run must abort.
    async fn note_transient(&mut self, context: &str, error: &SurfaceError) -> bool {
        self.state.consecutive_errors += 1;
        warn!(
            context,
            errors = self.state.consecutive_errors,
            "transient fault: {error}"
        );
        if self.state.consecutive_errors > self.limits.max_consecutive_errors {
            if !self.surface.is_alive().await {
                return true;
            }
            self.state.consecutive_errors = 0;
        }
        false
    }
}
