//! Common types shared by the traversal components.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The vertical region of the viewport eligible for candidate detection.
///
/// The fixed toolbar at the top and a strip at the bottom are excluded so
/// that the controls around a candidate stay reachable after a hover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanBand {
    /// Top edge of the band, below the toolbar.
    pub top: f64,
    /// Excluded strip above the bottom edge of the viewport.
    pub bottom_margin: f64,
}

impl Default for ScanBand {
    fn default() -> Self {
        Self {
            top: 80.0,
            bottom_margin: 50.0,
        }
    }
}

/// One date group as currently rendered.
///
/// A `Group` is only valid for the scan iteration that produced it; after
/// any scroll the same heading re-renders at a different position and must
/// be re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// The displayed heading, e.g. "12 January" or "12 January 2023".
    #[serde(rename = "text")]
    pub label: String,
    /// Left edge of the heading in viewport coordinates.
    pub x: f64,
    /// Vertical centre of the heading in viewport coordinates.
    pub y: f64,
}

/// Bounded retry applied uniformly wherever an interaction is re-attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// Settle delays inserted after surface writes.
///
/// The rendering on the far side is asynchronous: a read that depends on the
/// effect of a prior write is only meaningful after the corresponding settle
/// delay. These are a correctness mechanism, not tuning knobs.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// After navigating to the timeline.
    pub page_load: Duration,
    /// After moving the pointer to reveal hover-only controls.
    pub reveal: Duration,
    /// After a selection attempt, before verifying it.
    pub post_select: Duration,
    /// After verified selection, before triggering the download control.
    pub pre_action: Duration,
    /// After triggering the download control.
    pub post_action: Duration,
    /// After a deselect attempt, before re-checking the indicator.
    pub post_deselect: Duration,
    /// After any scroll.
    pub post_scroll: Duration,
    /// After an empty scan round.
    pub empty_round: Duration,
    /// Between retries of a failed step.
    pub retry: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(5),
            reveal: Duration::from_secs(2),
            post_select: Duration::from_millis(500),
            pre_action: Duration::from_millis(1500),
            post_action: Duration::from_secs(4),
            post_deselect: Duration::from_secs(1),
            post_scroll: Duration::from_secs(1),
            empty_round: Duration::from_secs(3),
            retry: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// All delays zeroed. For tests driving a scripted surface.
    pub fn immediate() -> Self {
        Self {
            page_load: Duration::ZERO,
            reveal: Duration::ZERO,
            post_select: Duration::ZERO,
            pre_action: Duration::ZERO,
            post_action: Duration::ZERO,
            post_deselect: Duration::ZERO,
            post_scroll: Duration::ZERO,
            empty_round: Duration::ZERO,
            retry: Duration::ZERO,
        }
    }
}

/// Sleep helper that skips the timer entirely for zero delays.
pub(crate) async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
