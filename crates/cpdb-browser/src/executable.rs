//! Chromium-family executable discovery.

use std::path::{Path, PathBuf};

use crate::BrowserError;

const PATH_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

#[cfg(target_os = "linux")]
const WELL_KNOWN: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
];

#[cfg(target_os = "macos")]
const WELL_KNOWN: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(target_os = "windows")]
const WELL_KNOWN: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const WELL_KNOWN: &[&str] = &[];

/// Find a Chromium-family browser on this machine.
///
/// Order: `CHROME_EXECUTABLE`, a `PATH` scan, then OS-specific install paths.
#[must_use]
pub fn find_chrome_executable() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        let p = PathBuf::from(p);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            for exe in PATH_CANDIDATES {
                let full = dir.join(exe);
                if full.is_file() {
                    return Some(full);
                }
            }
        }
    }

    WELL_KNOWN
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// An explicitly configured executable wins and must exist; otherwise fall
/// back to [`find_chrome_executable`].
///
/// # Errors
///
/// Returns [`BrowserError::Launch`] when no usable executable is found.
pub fn resolve_executable(configured: Option<&Path>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(BrowserError::Launch(format!(
            "configured browser executable not found: {}",
            path.display()
        )));
    }

    find_chrome_executable().ok_or_else(|| {
        BrowserError::Launch(
            "no Chromium-family browser found; set CPDB_BROWSER_EXECUTABLE or CHROME_EXECUTABLE"
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configured_path_is_a_launch_error() {
        let err = resolve_executable(Some(Path::new("/nonexistent/cpdb/chrome"))).unwrap_err();
        assert!(matches!(err, BrowserError::Launch(ref msg) if msg.contains("/nonexistent/cpdb/chrome")));
    }

    #[test]
    fn existing_configured_path_is_used_verbatim() {
        let exe = std::env::current_exe().unwrap();
        assert_eq!(resolve_executable(Some(&exe)).unwrap(), exe);
    }
}
