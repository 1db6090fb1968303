//! Sign-in verification and the bounded wait for a manual login.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::disk::DiskSurface;
use crate::errors::SurfaceError;

/// How often sign-in is re-checked while waiting for the user.
pub const LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// How long the user gets to sign in before the run aborts.
pub const LOGIN_WAIT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Whether the user is signed in, judged from the current URL and page
/// content. `false` also covers a page that is still loading.
pub async fn check_signed_in(surface: &DiskSurface) -> Result<bool, SurfaceError> {
    let url = surface.current_url().await?;
    if url.contains("passport") || url.contains("auth") {
        info!(%url, "sign-in page detected by URL");
        return Ok(false);
    }

    if surface.login_page_markers().await? {
        info!("sign-in form detected in the page");
        return Ok(false);
    }

    match surface.app_marker_count().await {
        Ok(count) if count >= 2 => {
            debug!(count, "application shell detected, user is signed in");
            Ok(true)
        }
        Ok(count) => {
            info!(count, "could not confirm sign-in yet, page may still be loading");
            Ok(false)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            // URL and form checks already passed; assume signed in rather
            // than block the run on a flaky probe.
            warn!("marker probe failed, assuming signed in: {e}");
            Ok(true)
        }
    }
}

/// Poll until the user signs in. Times out with the distinguished
/// [`SurfaceError::LoginTimeout`], which is fatal at startup.
pub async fn await_sign_in(
    surface: &DiskSurface,
    poll: Duration,
    timeout: Duration,
) -> Result<(), SurfaceError> {
    info!(?poll, ?timeout, "waiting for sign-in in the browser window");
    let deadline = Instant::now() + timeout;
    loop {
        tokio::time::sleep(poll).await;

        match check_signed_in(surface).await {
            Ok(true) => {
                info!("sign-in detected");
                return Ok(());
            }
            Ok(false) => info!("still waiting for sign-in..."),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("sign-in check failed: {e}"),
        }

        if Instant::now() >= deadline {
            return Err(SurfaceError::LoginTimeout(timeout));
        }
    }
}
