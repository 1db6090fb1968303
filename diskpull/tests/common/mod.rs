//! A scripted stand-in for the live timeline.
//!
//! The mock keeps a strip of date headings at absolute positions and a
//! virtual viewport offset; scrolling moves the offset and changes what
//! `groups_in_band` reports, exactly like the real window. Interactions
//! mutate a single `selected` slot, and every call is counted so tests can
//! assert that nothing happens after a fatal fault.

use std::sync::Mutex;

use async_trait::async_trait;
use diskpull::{Group, Point, ScanBand, Surface, SurfaceError};

pub const VIEWPORT_HEIGHT: f64 = 1080.0;

struct Inner {
    /// (label, absolute vertical position) per heading.
    strip: Vec<(String, f64)>,
    offset: f64,
    selected: Option<String>,
    downloads: Vec<String>,
    select_attempts: Vec<(String, f64)>,
    scroll_deltas: Vec<f64>,
    calls: u64,
    /// After this many calls every further call fails fatally.
    fail_after: Option<u64>,
    alive: bool,
    /// The active-selection indicator renders when something is selected.
    selection_indicator: bool,
    /// The download control exists in the toolbar.
    download_control: bool,
    /// The checkbox-near-label strategy can engage.
    checkbox_enabled: bool,
    /// The element-under-point fallback can engage.
    under_point_selects: bool,
    /// Dismiss attempts that leave the selection in place before one works.
    dismiss_sticky_rounds: u32,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            strip: Vec::new(),
            offset: 0.0,
            selected: None,
            downloads: Vec::new(),
            select_attempts: Vec::new(),
            scroll_deltas: Vec::new(),
            calls: 0,
            fail_after: None,
            alive: true,
            selection_indicator: true,
            download_control: true,
            checkbox_enabled: true,
            under_point_selects: false,
            dismiss_sticky_rounds: 0,
        }
    }
}

pub struct MockSurface {
    inner: Mutex<Inner>,
}

impl MockSurface {
    pub fn new(strip: &[(&str, f64)]) -> Self {
        let inner = Inner {
            strip: strip
                .iter()
                .map(|(label, y)| (label.to_string(), *y))
                .collect(),
            ..Inner::default()
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn fail_after(self, calls: u64) -> Self {
        self.inner.lock().unwrap().fail_after = Some(calls);
        self
    }

    pub fn without_download_control(self) -> Self {
        self.inner.lock().unwrap().download_control = false;
        self
    }

    pub fn without_selection_indicator(self) -> Self {
        self.inner.lock().unwrap().selection_indicator = false;
        self
    }

    pub fn without_checkboxes(self) -> Self {
        self.inner.lock().unwrap().checkbox_enabled = false;
        self
    }

    pub fn with_under_point_fallback(self) -> Self {
        self.inner.lock().unwrap().under_point_selects = true;
        self
    }

    pub fn with_sticky_selection(self, rounds: u32) -> Self {
        self.inner.lock().unwrap().dismiss_sticky_rounds = rounds;
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.inner.lock().unwrap().downloads.clone()
    }

    pub fn select_attempts(&self) -> Vec<(String, f64)> {
        self.inner.lock().unwrap().select_attempts.clone()
    }

    pub fn scroll_deltas(&self) -> Vec<f64> {
        self.inner.lock().unwrap().scroll_deltas.clone()
    }

    pub fn calls(&self) -> u64 {
        self.inner.lock().unwrap().calls
    }
}

/// Count the call and fail fatally once the configured limit is spent.
fn tick(inner: &mut Inner) -> Result<(), SurfaceError> {
    inner.calls += 1;
    if let Some(limit) = inner.fail_after {
        if inner.calls > limit {
            inner.alive = false;
            return Err(SurfaceError::SessionClosed("target closed".into()));
        }
    }
    Ok(())
}

fn visible(inner: &Inner, band: ScanBand) -> Vec<(String, f64)> {
    inner
        .strip
        .iter()
        .filter_map(|(label, absolute)| {
            let screen = absolute - inner.offset;
            (screen >= band.top && screen < VIEWPORT_HEIGHT - band.bottom_margin)
                .then(|| (label.clone(), screen))
        })
        .collect()
}

fn select_near(inner: &mut Inner, y: f64, tolerance: f64) -> bool {
    let band = ScanBand::default();
    let hit = visible(inner, band)
        .into_iter()
        .find(|(_, screen)| (screen - y).abs() < tolerance);
    match hit {
        Some((label, screen)) => {
            inner.selected = Some(label.clone());
            inner.select_attempts.push((label, screen));
            true
        }
        None => false,
    }
}

#[async_trait]
impl Surface for MockSurface {
    async fn groups_in_band(&self, band: ScanBand) -> Result<Vec<Group>, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        Ok(visible(&inner, band)
            .into_iter()
            .map(|(label, screen)| Group {
                label,
                x: 120.0,
                y: screen,
            })
            .collect())
    }

    async fn move_pointer(&self, _point: Point) -> Result<(), SurfaceError> {
        tick(&mut self.inner.lock().unwrap())
    }

    async fn click(&self, _point: Point) -> Result<(), SurfaceError> {
        tick(&mut self.inner.lock().unwrap())
    }

    async fn toggle_checkbox_near(
        &self,
        point: Point,
        tolerance: f64,
    ) -> Result<bool, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        if !inner.checkbox_enabled {
            return Ok(false);
        }
        Ok(select_near(&mut inner, point.y, tolerance))
    }

    async fn activate_under_point(&self, point: Point) -> Result<bool, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        if !inner.under_point_selects {
            return Ok(false);
        }
        Ok(select_near(&mut inner, point.y, 40.0))
    }

    async fn selection_active(&self) -> Result<bool, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        Ok(inner.selected.is_some() && inner.selection_indicator)
    }

    async fn residual_selection(&self) -> Result<bool, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        Ok(false)
    }

    async fn trigger_download(&self) -> Result<bool, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        if !inner.download_control {
            return Ok(false);
        }
        if let Some(label) = inner.selected.clone() {
            inner.downloads.push(label);
        }
        Ok(true)
    }

    async fn dismiss_selection(&self) -> Result<bool, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        if inner.dismiss_sticky_rounds > 0 {
            inner.dismiss_sticky_rounds -= 1;
        } else {
            inner.selected = None;
        }
        Ok(true)
    }

    async fn press_cancel(&self) -> Result<(), SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        inner.selected = None;
        Ok(())
    }

    async fn scroll_by(&self, delta_y: f64) -> Result<(), SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        tick(&mut inner)?;
        inner.scroll_deltas.push(delta_y);
        inner.offset += delta_y;
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        self.inner.lock().unwrap().alive
    }
}
