//! The Yandex Disk photo timeline as a [`Surface`].
//!
//! Every probe evaluates one script from [`crate::scripts`] in the page;
//! interaction primitives (pointer, clicks, Escape) go through the trusted
//! DevTools input events instead so the page cannot tell them from a user.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::cdp::CdpSession;
use crate::config::SessionConfig;
use crate::errors::SurfaceError;
use crate::scripts;
use crate::surface::Surface;
use crate::types::{settle, Group, Pacing, Point, ScanBand};

pub const PHOTOS_URL: &str = "https://disk.yandex.com/client/photo";

const FILTER_PAGE_SETTLE: Duration = Duration::from_secs(2);
const FILTER_MENU_SETTLE: Duration = Duration::from_millis(500);
const FILTER_PICK_SETTLE: Duration = Duration::from_millis(300);

/// Live photo timeline backed by a [`CdpSession`]. Cheap to clone; all
/// clones share the one session.
#[derive(Clone)]
pub struct DiskSurface {
    session: Arc<CdpSession>,
    pacing: Pacing,
}

impl DiskSurface {
    /// Launch the browser and attach. The caller owns the teardown via
    /// [`DiskSurface::close`]; dropping the last clone also tears down.
    pub async fn open(config: &SessionConfig) -> Result<Self, SurfaceError> {
        let session = CdpSession::open(config).await?;
        Ok(Self {
            session: Arc::new(session),
            pacing: Pacing::default(),
        })
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn navigate_to_photos(&self) -> Result<(), SurfaceError> {
        info!(url = PHOTOS_URL, "opening photo timeline");
        self.session.navigate(PHOTOS_URL).await?;
        settle(self.pacing.page_load).await;
        Ok(())
    }

    pub async fn configure_downloads(&self, dir: &Path) -> Result<(), SurfaceError> {
        self.session.set_download_dir(dir).await?;
        info!(dir = %dir.display(), "downloads will be saved here");
        Ok(())
    }

    /// Switch the timeline to "From unlimited storage". Best effort: the
    /// caller treats a failure as a warning, not a stop.
    pub async fn apply_unlimited_storage_filter(&self) -> Result<(), SurfaceError> {
        info!("applying filter: from unlimited storage");
        settle(FILTER_PAGE_SETTLE).await;

        if !self.session.evaluate_bool(scripts::FILTER_MENU_OPEN).await? {
            return Err(SurfaceError::ElementNotFound("filter menu button".into()));
        }
        settle(FILTER_MENU_SETTLE).await;

        if !self
            .session
            .evaluate_bool(scripts::FILTER_PICK_UNLIMITED)
            .await?
        {
            return Err(SurfaceError::ElementNotFound(
                "'From unlimited storage' option".into(),
            ));
        }
        settle(FILTER_PICK_SETTLE).await;

        // Closing the menu is cosmetic; ignore a miss.
        let _ = self.session.evaluate_bool(scripts::FILTER_MENU_CLOSE).await;
        settle(FILTER_PAGE_SETTLE).await;

        info!("filter applied");
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, SurfaceError> {
        self.session.current_url().await
    }

    pub(crate) async fn login_page_markers(&self) -> Result<bool, SurfaceError> {
        self.session.evaluate_bool(scripts::LOGIN_PAGE_PROBE).await
    }

    pub(crate) async fn app_marker_count(&self) -> Result<i64, SurfaceError> {
        Ok(self
            .session
            .evaluate(scripts::APP_MARKER_COUNT_PROBE)
            .await?
            .as_i64()
            .unwrap_or(0))
    }

    pub async fn close(&self) {
        self.session.close().await;
    }
}

#[async_trait]
impl Surface for DiskSurface {
    async fn groups_in_band(&self, band: ScanBand) -> Result<Vec<Group>, SurfaceError> {
        let value = self
            .session
            .evaluate(&scripts::visible_groups(band.top, band.bottom_margin))
            .await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value)
            .map_err(|e| SurfaceError::Protocol(format!("unexpected group payload: {e}")))
    }

    async fn move_pointer(&self, point: Point) -> Result<(), SurfaceError> {
        self.session.move_pointer(point).await
    }

    async fn click(&self, point: Point) -> Result<(), SurfaceError> {
        self.session.click(point).await
    }

    async fn toggle_checkbox_near(
        &self,
        point: Point,
        tolerance: f64,
    ) -> Result<bool, SurfaceError> {
        self.session
            .evaluate_bool(&scripts::toggle_checkbox_near(point.y, tolerance))
            .await
    }

    async fn activate_under_point(&self, point: Point) -> Result<bool, SurfaceError> {
        self.session
            .evaluate_bool(&scripts::activate_under_point(point.x, point.y))
            .await
    }

    async fn selection_active(&self) -> Result<bool, SurfaceError> {
        self.session
            .evaluate_bool(scripts::SELECTION_ACTIVE_PROBE)
            .await
    }

    async fn residual_selection(&self) -> Result<bool, SurfaceError> {
        self.session
            .evaluate_bool(scripts::RESIDUAL_SELECTION_PROBE)
            .await
    }

    async fn trigger_download(&self) -> Result<bool, SurfaceError> {
        self.session.evaluate_bool(scripts::TRIGGER_DOWNLOAD).await
    }

    async fn dismiss_selection(&self) -> Result<bool, SurfaceError> {
        let value = self.session.evaluate(scripts::FIND_DISMISS_CONTROL).await?;
        if !value.get("found").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(false);
        }
        let x = value.get("x").and_then(Value::as_f64).unwrap_or(0.0);
        let y = value.get("y").and_then(Value::as_f64).unwrap_or(0.0);
        let info = value
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("button");
        debug!(x, y, info, "clicking deselect control");
        self.session.click(Point::new(x, y)).await?;
        Ok(true)
    }

    async fn press_cancel(&self) -> Result<(), SurfaceError> {
        self.session.press_escape().await
    }

    async fn scroll_by(&self, delta_y: f64) -> Result<(), SurfaceError> {
        self.session
            .evaluate(&scripts::scroll_by(delta_y))
            .await
            .map(drop)
    }

    async fn is_alive(&self) -> bool {
        self.session.is_alive()
    }
}
