//! Forward-only scroll cursor.
//!
//! Scrolling is the only way this system makes progress, and scrolling is
//! exclusively this module's job: once a group has been handled the cursor
//! moves it above the scan band so the locator can never hand it out again.

use tracing::debug;

use crate::errors::SurfaceError;
use crate::surface::Surface;

/// Pixels scrolled when a scan round finds no group at all.
pub const DEFAULT_SCROLL_STEP: f64 = 600.0;

/// Where a handled heading is parked, measured from the viewport top.
/// Must stay below the scan band's top edge so the heading leaves the band
/// with room to spare rather than flapping on the exact boundary.
pub const CLEAR_MARGIN: f64 = 50.0;

/// Tracks cumulative scroll distance and enforces that it never decreases.
#[derive(Debug, Clone)]
pub struct ScrollCursor {
    offset: f64,
    step: f64,
    margin: f64,
}

impl Default for ScrollCursor {
    fn default() -> Self {
        Self {
            offset: 0.0,
            step: DEFAULT_SCROLL_STEP,
            margin: CLEAR_MARGIN,
        }
    }
}

impl ScrollCursor {
    pub fn new(step: f64, margin: f64) -> Self {
        Self {
            offset: 0.0,
            step,
            margin,
        }
    }

    /// Total distance scrolled so far. Monotonically non-decreasing for the
    /// lifetime of the session.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Scroll so that a heading currently at `vertical_position` lands at
    /// the clear margin, above the scan band. Returns the applied delta.
    pub async fn advance_past(
        &mut self,
        surface: &dyn Surface,
        vertical_position: f64,
    ) -> Result<f64, SurfaceError> {
        let delta = clearance_delta(vertical_position, self.margin);
        if delta > 0.0 {
            surface.scroll_by(delta).await?;
            self.offset += delta;
        }
        debug!(
            y = vertical_position,
            delta,
            offset = self.offset,
            "advanced cursor past handled group"
        );
        Ok(delta)
    }

    /// Fixed-step advance for rounds where no group was visible.
    pub async fn advance_default(&mut self, surface: &dyn Surface) -> Result<(), SurfaceError> {
        surface.scroll_by(self.step).await?;
        self.offset += self.step;
        debug!(offset = self.offset, "advanced cursor by default step");
        Ok(())
    }
}

/// Distance that moves `vertical_position` to the clear margin. Never
/// negative: a heading already above the margin needs no scroll, and the
/// cursor must not move backwards for it.
fn clearance_delta(vertical_position: f64, margin: f64) -> f64 {
    (vertical_position - margin).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_parks_heading_at_margin() {
        assert_eq!(clearance_delta(300.0, 50.0), 250.0);
        assert_eq!(clearance_delta(85.0, 50.0), 35.0);
    }

    #[test]
    fn delta_never_negative() {
        assert_eq!(clearance_delta(50.0, 50.0), 0.0);
        assert_eq!(clearance_delta(10.0, 50.0), 0.0);
    }
}
