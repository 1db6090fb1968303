//! Browser executable detection and platform default directories.

use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Find a Chromium-family executable on this system.
///
/// Checks well-known install locations first (Chrome before the
/// alternates), then falls back to `$PATH`.
pub fn detect_browser() -> Option<PathBuf> {
    for candidate in candidate_paths() {
        if candidate.as_os_str().is_empty() {
            continue;
        }
        if candidate.is_file() {
            debug!(path = %candidate.display(), "browser executable found");
            return Some(candidate);
        }
    }

    for name in ["chrome", "chromium", "chromium-browser", "google-chrome"] {
        if let Some(found) = search_path(name) {
            debug!(path = %found.display(), "browser executable found on PATH");
            return Some(found);
        }
    }

    None
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(exe_name(name));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

// Priority everywhere: Chrome > Chromium > Edge > Vivaldi > Opera > Brave.

#[cfg(target_os = "windows")]
fn candidate_paths() -> Vec<PathBuf> {
    let local_app_data = env::var("LOCALAPPDATA").unwrap_or_default();
    let program_files = env::var("ProgramFiles").unwrap_or_default();
    let program_files_x86 = env::var("ProgramFiles(x86)").unwrap_or_default();

    [
        format!(r"{program_files}\Google\Chrome\Application\chrome.exe"),
        format!(r"{program_files_x86}\Google\Chrome\Application\chrome.exe"),
        format!(r"{local_app_data}\Google\Chrome\Application\chrome.exe"),
        format!(r"{program_files}\Chromium\Application\chrome.exe"),
        format!(r"{program_files_x86}\Chromium\Application\chrome.exe"),
        format!(r"{local_app_data}\Chromium\Application\chrome.exe"),
        format!(r"{program_files}\Microsoft\Edge\Application\msedge.exe"),
        format!(r"{program_files_x86}\Microsoft\Edge\Application\msedge.exe"),
        format!(r"{local_app_data}\Vivaldi\Application\vivaldi.exe"),
        format!(r"{program_files}\Vivaldi\Application\vivaldi.exe"),
        format!(r"{local_app_data}\Programs\Opera\opera.exe"),
        format!(r"{program_files}\Opera\opera.exe"),
        format!(r"{program_files}\BraveSoftware\Brave-Browser\Application\brave.exe"),
        format!(r"{local_app_data}\BraveSoftware\Brave-Browser\Application\brave.exe"),
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(target_os = "macos")]
fn candidate_paths() -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_default();
    vec![
        PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        home.join("Applications/Chromium.app/Contents/MacOS/Chromium"),
        PathBuf::from("/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"),
        PathBuf::from("/Applications/Vivaldi.app/Contents/MacOS/Vivaldi"),
        PathBuf::from("/Applications/Opera.app/Contents/MacOS/Opera"),
        PathBuf::from("/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"),
    ]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn candidate_paths() -> Vec<PathBuf> {
    [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/var/lib/flatpak/exports/bin/com.google.Chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/microsoft-edge-stable",
        "/usr/bin/microsoft-edge",
        "/usr/bin/vivaldi",
        "/usr/bin/vivaldi-stable",
        "/usr/bin/opera",
        "/usr/bin/brave-browser",
        "/opt/brave.com/brave/brave-browser",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

/// Default profile directory. A dedicated one on Windows/macOS so runs do
/// not fight the user's main browser; on Linux the snap chromium profile is
/// preferred when it exists.
pub fn default_profile_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

    #[cfg(target_os = "windows")]
    {
        home.join(".diskpull-profile")
    }
    #[cfg(target_os = "macos")]
    {
        home.join("Library/Application Support/diskpull-profile")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let snap = home.join("snap/chromium/common/chromium");
        if snap.is_dir() {
            snap
        } else {
            home.join(".config/chromium")
        }
    }
}

/// The user's downloads location, or `~/Downloads` when the platform does
/// not report one.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Downloads")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_outranks_the_alternates() {
        let candidates = candidate_paths();
        assert!(!candidates.is_empty());
        let first = candidates[0].to_string_lossy().to_lowercase();
        assert!(first.contains("chrome"));
        let last = candidates.last().unwrap().to_string_lossy().to_lowercase();
        assert!(last.contains("brave"));
    }

    #[test]
    fn default_directories_are_not_empty() {
        assert!(!default_profile_dir().as_os_str().is_empty());
        assert!(!default_download_dir().as_os_str().is_empty());
    }
}
