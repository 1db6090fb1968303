//! The capability seam between the traversal engine and the live page.
//!
//! Every probe here is either a pure read of the rendered window or a single
//! interaction primitive. The engine and its components only ever talk to
//! the surface through this trait, which is what lets the traversal run
//! against a scripted double in tests.

use async_trait::async_trait;

use crate::errors::SurfaceError;
use crate::types::{Group, Point, ScanBand};

/// A live, scroll-only view onto the remote timeline.
///
/// Implementations must not retry internally: every call is one observable
/// surface operation, and the caller owns the fallback and retry policy.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Read the date-group headings currently rendered inside `band`,
    /// in no particular order. Pure read, no side effects.
    async fn groups_in_band(&self, band: ScanBand) -> Result<Vec<Group>, SurfaceError>;

    /// Move the pointer without pressing, to surface hover-only controls.
    async fn move_pointer(&self, point: Point) -> Result<(), SurfaceError>;

    /// Dispatch a trusted left click at the point.
    async fn click(&self, point: Point) -> Result<(), SurfaceError>;

    /// Toggle a checkbox-like control whose centre lies within `tolerance`
    /// pixels of `point.y`. Returns whether one was found and toggled.
    async fn toggle_checkbox_near(&self, point: Point, tolerance: f64)
        -> Result<bool, SurfaceError>;

    /// Walk the elements stacked under the point and activate the first
    /// checkbox-like one. Returns whether one was activated.
    async fn activate_under_point(&self, point: Point) -> Result<bool, SurfaceError>;

    /// Whether an active-selection indicator is currently present.
    async fn selection_active(&self) -> Result<bool, SurfaceError>;

    /// Weaker probe for selection leftovers (checked markers on tiles)
    /// used after a dismiss attempt.
    async fn residual_selection(&self) -> Result<bool, SurfaceError>;

    /// Find and activate the download control for the current selection.
    /// Returns whether the control was found.
    async fn trigger_download(&self) -> Result<bool, SurfaceError>;

    /// Activate the close/deselect control in the toolbar region.
    /// Returns whether one was found.
    async fn dismiss_selection(&self) -> Result<bool, SurfaceError>;

    /// Send a cancel gesture (Escape) to the page.
    async fn press_cancel(&self) -> Result<(), SurfaceError>;

    /// Scroll the viewport down by `delta_y` pixels. Callers must never
    /// pass a negative delta; forward-only progress depends on it.
    async fn scroll_by(&self, delta_y: f64) -> Result<(), SurfaceError>;

    /// Non-blocking liveness probe of the underlying session.
    async fn is_alive(&self) -> bool;
}
