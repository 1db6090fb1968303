//! Locates the next unprocessed group inside the scan band.

use tracing::debug;

use crate::errors::SurfaceError;
use crate::surface::Surface;
use crate::types::{Group, ScanBand};

/// Picks the topmost date heading currently rendered inside the scan band.
///
/// Groups carry no stable identity, so the locator re-derives its answer
/// from the rendered window on every call and never caches.
#[derive(Debug, Clone, Default)]
pub struct GroupLocator {
    band: ScanBand,
}

impl GroupLocator {
    pub fn new(band: ScanBand) -> Self {
        Self { band }
    }

    pub fn band(&self) -> ScanBand {
        self.band
    }

    /// The topmost candidate in the band, or `None` when the window shows
    /// no group at all.
    pub async fn locate_next(
        &self,
        surface: &dyn Surface,
    ) -> Result<Option<Group>, SurfaceError> {
        let candidates = surface.groups_in_band(self.band).await?;
        let found = topmost(candidates);
        if let Some(group) = &found {
            debug!(label = %group.label, y = group.y, "topmost visible group");
        }
        Ok(found)
    }
}

/// Smallest vertical position wins; ties keep their input order (stable
/// sort), so identical windows always yield the identical candidate.
fn topmost(mut candidates: Vec<Group>) -> Option<Group> {
    candidates.sort_by(|a, b| a.y.total_cmp(&b.y));
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(label: &str, y: f64) -> Group {
        Group {
            label: label.to_string(),
            x: 120.0,
            y,
        }
    }

    #[test]
    fn picks_smallest_vertical_position() {
        let found = topmost(vec![
            group("12 March 2024", 640.0),
            group("14 March 2024", 210.0),
            group("13 March 2024", 430.0),
        ]);
        assert_eq!(found.unwrap().label, "14 March 2024");
    }

    #[test]
    fn empty_window_yields_none() {
        assert_eq!(topmost(Vec::new()), None);
    }

    #[test]
    fn ties_resolve_deterministically_by_input_order() {
        let found = topmost(vec![
            group("first", 300.0),
            group("second", 300.0),
        ]);
        assert_eq!(found.unwrap().label, "first");
    }
}
