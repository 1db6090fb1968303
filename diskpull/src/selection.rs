//! Select → trigger download → deselect, for one group at a time.
//!
//! Interaction with the timeline is flaky by nature, so selection runs
//! through an ordered ladder of strategies and an explicit verification
//! step. Transient failures are absorbed rung by rung; fatal faults
//! propagate unchanged. This module never scrolls; progress is the scroll
//! cursor's job alone.

use tracing::{debug, info, warn};

use crate::errors::SurfaceError;
use crate::surface::Surface;
use crate::types::{settle, Group, Pacing, Point, RetryPolicy};

/// Vertical distance within which a checkbox counts as belonging to a group.
pub const CHECKBOX_TOLERANCE: f64 = 40.0;

/// Hover target sits left of the heading, where the hover-only checkbox
/// appears; clamped so it stays on screen.
const HOVER_OFFSET_X: f64 = 30.0;
const HOVER_MIN_X: f64 = 10.0;

/// A dead patch of page used to drop a stuck selection.
const EMPTY_AREA: Point = Point { x: 800.0, y: 400.0 };

/// Ways to engage the selection control for a group, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectStrategy {
    /// Toggle a checkbox rendered near the heading's row.
    CheckboxNearLabel,
    /// Activate the first checkbox-like element stacked under the point.
    ElementUnderPoint,
    /// Raw click at the hover point.
    DirectClick,
}

/// The fallback ladder. Order matters: the precise strategies go first and
/// the blunt one last.
pub const SELECT_LADDER: &[SelectStrategy] = &[
    SelectStrategy::CheckboxNearLabel,
    SelectStrategy::ElementUnderPoint,
    SelectStrategy::DirectClick,
];

/// What happened to one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// Selection confirmed and the download control activated.
    Started,
    /// The group could not be acted on; it still counts as handled.
    ActionFailed { reason: String },
}

fn hover_point(group: &Group) -> Point {
    Point::new((group.x - HOVER_OFFSET_X).max(HOVER_MIN_X), group.y)
}

/// Runs the per-group interaction sequence.
pub struct SelectionController {
    pacing: Pacing,
    deselect_retry: RetryPolicy,
}

impl SelectionController {
    pub fn new(pacing: Pacing) -> Self {
        let deselect_retry = RetryPolicy::new(3, pacing.retry);
        Self {
            pacing,
            deselect_retry,
        }
    }

    /// Process one group. Returns `Err` only for fatal faults; every
    /// transient problem is folded into the result.
    pub async fn process(
        &self,
        surface: &dyn Surface,
        group: &Group,
    ) -> Result<ProcessResult, SurfaceError> {
        let hover = hover_point(group);

        // Reveal hover-only controls near the heading.
        if let Err(e) = surface.move_pointer(hover).await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(label = %group.label, "pointer move failed: {e}");
        }
        settle(self.pacing.reveal).await;

        let mut engaged = false;
        for strategy in SELECT_LADDER {
            match self.apply(surface, *strategy, group, hover).await {
                Ok(true) => {
                    debug!(label = %group.label, ?strategy, "selection strategy engaged");
                    engaged = true;
                    break;
                }
                Ok(false) => continue,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(label = %group.label, ?strategy, "selection strategy failed: {e}");
                    continue;
                }
            }
        }
        if engaged {
            settle(self.pacing.post_select).await;
        }

        // A group only counts as selected once the indicator confirms it.
        let confirmed = match surface.selection_active().await {
            Ok(v) => v,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(label = %group.label, "selection check failed: {e}");
                false
            }
        };
        if !confirmed {
            return Ok(ProcessResult::ActionFailed {
                reason: "selection could not be confirmed".into(),
            });
        }
        info!(label = %group.label, "group selected");
        settle(self.pacing.pre_action).await;

        let triggered = match surface.trigger_download().await {
            Ok(found) => found,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(label = %group.label, "download trigger failed: {e}");
                false
            }
        };
        if triggered {
            info!(label = %group.label, "download started");
        }
        settle(self.pacing.post_action).await;

        // Always release the selection; the protocol allows only one group
        // selected at a time.
        self.deselect(surface).await?;

        if triggered {
            Ok(ProcessResult::Started)
        } else {
            Ok(ProcessResult::ActionFailed {
                reason: "download control not found".into(),
            })
        }
    }

    async fn apply(
        &self,
        surface: &dyn Surface,
        strategy: SelectStrategy,
        group: &Group,
        hover: Point,
    ) -> Result<bool, SurfaceError> {
        match strategy {
            SelectStrategy::CheckboxNearLabel => {
                surface
                    .toggle_checkbox_near(Point::new(hover.x, group.y), CHECKBOX_TOLERANCE)
                    .await
            }
            SelectStrategy::ElementUnderPoint => surface.activate_under_point(hover).await,
            SelectStrategy::DirectClick => surface.click(hover).await.map(|_| true),
        }
    }

    /// Clear the active selection: dismiss control first, Escape as the
    /// fallback, bounded retries. Giving up is a warning, not an error;
    /// the next iteration's pre-check gets another chance.
    pub async fn deselect(&self, surface: &dyn Surface) -> Result<(), SurfaceError> {
        for attempt in 1..=self.deselect_retry.max_attempts {
            match surface.dismiss_selection().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("deselect control not found, sending cancel gesture");
                    match surface.press_cancel().await {
                        Ok(()) => {}
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => warn!("cancel gesture failed: {e}"),
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(attempt, "deselect failed: {e}"),
            }
            settle(self.pacing.post_deselect).await;

            match surface.residual_selection().await {
                Ok(true) => {
                    debug!("residual selection markers, clicking empty area");
                    match surface.click(EMPTY_AREA).await {
                        Ok(()) => {}
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => warn!("empty-area click failed: {e}"),
                    }
                    settle(self.pacing.post_select).await;
                }
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("residual selection check failed: {e}"),
            }

            match surface.selection_active().await {
                Ok(false) => {
                    debug!("selection cleared");
                    return Ok(());
                }
                Ok(true) => warn!(attempt, "selection still active"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("selection check failed: {e}"),
            }
            settle(self.deselect_retry.backoff).await;
        }

        warn!(
            attempts = self.deselect_retry.max_attempts,
            "selection still active after retries, leaving it for the next pre-check"
        );
        Ok(())
    }

    /// Pre-check used at the top of every engine iteration: clears a
    /// selection left over from a previous iteration or run.
    pub async fn clear_pending(&self, surface: &dyn Surface) -> Result<(), SurfaceError> {
        match surface.selection_active().await {
            Ok(true) => {
                warn!("pending selection detected, clearing");
                self.deselect(surface).await?;
                settle(self.pacing.post_deselect).await;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("pre-check failed: {e}");
                Ok(())
            }
        }
    }
}
