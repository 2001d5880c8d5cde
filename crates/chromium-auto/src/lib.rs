//! # chromium-auto
//!
//! Locate, or auto-download and cache, a headless Chrome binary at runtime so
//! that users of `headless_chrome` do not need to install a browser by hand
//! before the first render.
//!
//! ## How it works
//!
//! On the first call to [`ensure_chrome_binary`] in a process:
//!
//! 1. Honours `CHROME_PATH` if it points to an existing file.
//! 2. Searches the usual system install locations and `PATH`
//!    (`google-chrome`, `chromium`, `chrome-headless-shell`, …).
//! 3. Checks `~/.cache/html2pdf/chrome-headless-shell-{VERSION}/` for a
//!    previously downloaded copy.
//! 4. If absent, downloads the platform `chrome-headless-shell` archive from
//!    [Chrome for Testing](https://googlechromelabs.github.io/chrome-for-testing/)
//!    and extracts it into a staging directory that is renamed into place
//!    only once the executable is present.
//!
//! The outcome (path or error) is memoised for the lifetime of the process:
//! resolution is attempted at most once, and concurrent callers block on the
//! first attempt instead of racing their own downloads.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chromium_auto::ensure_chrome_binary;
//!
//! let chrome = ensure_chrome_binary(Some(&|downloaded, total| {
//!     if let Some(t) = total {
//!         eprint!("\rDownloading Chrome: {}/{} bytes", downloaded, t);
//!     }
//! })).expect("Chrome unavailable");
//! println!("using {}", chrome.display());
//! ```
//!
//! ## Platform support
//!
//! | OS      | Arch    | Archive platform |
//! |---------|---------|------------------|
//! | macOS   | arm64   | `mac-arm64`      |
//! | macOS   | x86_64  | `mac-x64`        |
//! | Linux   | x86_64  | `linux64`        |
//! | Windows | x86_64  | `win64`          |
//! | Windows | x86     | `win32`          |
//!
//! Linux on aarch64 has no Chrome for Testing build; install `chromium` from
//! the distribution or set `CHROME_PATH`.
//!
//! ## Environment variable overrides
//!
//! - `CHROME_PATH`: path to an existing Chrome/Chromium executable.
//! - `CHROMIUM_AUTO_CACHE_DIR`: override the default cache directory.
//! - `CHROMIUM_AUTO_NO_DOWNLOAD`: never download; fail if nothing is found.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// The Chrome for Testing release used for downloads.
pub const CHROME_VERSION: &str = "131.0.6778.85";

/// Chrome for Testing storage bucket.
const BASE_URL: &str = "https://storage.googleapis.com/chrome-for-testing-public";

/// Executable names probed on `PATH`, most specific first.
const SYSTEM_BINARIES: &[&str] = &[
    "chrome-headless-shell",
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
];

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chromium-auto operations.
///
/// Variants carry strings rather than source errors so the memoised outcome
/// can be handed out to every caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChromiumAutoError {
    /// No Chrome for Testing build exists for this OS/architecture.
    #[error("Unsupported platform: {os}/{arch}; install Chromium and set CHROME_PATH")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create or write the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(String),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// Zip extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// Nothing found locally and downloading is disabled.
    #[error("No Chrome executable found (CHROMIUM_AUTO_NO_DOWNLOAD is set)")]
    NotFound,
}

// ── Internal: platform metadata ──────────────────────────────────────────────

#[derive(Debug)]
struct PlatformInfo {
    /// Chrome for Testing platform key, e.g. `linux64`.
    platform: &'static str,
    /// Executable path relative to the extraction root.
    exe_in_archive: &'static str,
}

fn detect_platform() -> Result<PlatformInfo, ChromiumAutoError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    match (os, arch) {
        ("macos", "aarch64") => Ok(PlatformInfo {
            platform: "mac-arm64",
            exe_in_archive: "chrome-headless-shell-mac-arm64/chrome-headless-shell",
        }),
        ("macos", "x86_64") => Ok(PlatformInfo {
            platform: "mac-x64",
            exe_in_archive: "chrome-headless-shell-mac-x64/chrome-headless-shell",
        }),
        ("linux", "x86_64") => Ok(PlatformInfo {
            platform: "linux64",
            exe_in_archive: "chrome-headless-shell-linux64/chrome-headless-shell",
        }),
        ("windows", "x86_64") => Ok(PlatformInfo {
            platform: "win64",
            exe_in_archive: "chrome-headless-shell-win64/chrome-headless-shell.exe",
        }),
        ("windows", "x86") => Ok(PlatformInfo {
            platform: "win32",
            exe_in_archive: "chrome-headless-shell-win32/chrome-headless-shell.exe",
        }),
        (os, arch) => Err(ChromiumAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

fn download_url(info: &PlatformInfo) -> String {
    format!(
        "{}/{}/{}/chrome-headless-shell-{}.zip",
        BASE_URL, CHROME_VERSION, info.platform, info.platform
    )
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the per-version cache directory for the downloaded browser.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/html2pdf/chrome-headless-shell-{VERSION}/`
/// - **Linux**: `~/.cache/html2pdf/chrome-headless-shell-{VERSION}/`
/// - **Windows**: `%LOCALAPPDATA%\html2pdf\chrome-headless-shell-{VERSION}\`
///
/// Override by setting `CHROMIUM_AUTO_CACHE_DIR`.
pub fn chrome_cache_dir() -> PathBuf {
    let leaf = format!("chrome-headless-shell-{CHROME_VERSION}");
    if let Ok(override_dir) = std::env::var("CHROMIUM_AUTO_CACHE_DIR") {
        return PathBuf::from(override_dir).join(leaf);
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("html2pdf").join(leaf)
}

// ── Process-wide memo ────────────────────────────────────────────────────────

static RESOLVED: OnceLock<Result<PathBuf, ChromiumAutoError>> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns `true` if a Chrome executable can be found without any network
/// access: `CHROME_PATH`, a system install, or the download cache.
pub fn is_chrome_available() -> bool {
    env_override().is_some() || find_system_chrome().is_some() || cached_chrome_path().is_some()
}

/// Returns the path of a previously downloaded browser, or `None`.
pub fn cached_chrome_path() -> Option<PathBuf> {
    let info = detect_platform().ok()?;
    let p = chrome_cache_dir().join(info.exe_in_archive);
    p.is_file().then_some(p)
}

/// Ensures a Chrome executable is available and returns its path.
///
/// `on_progress` receives `(bytes_downloaded, total_size_option)` during a
/// download. Pass `None` to suppress progress callbacks.
///
/// # Thread safety
///
/// Safe to call from multiple threads simultaneously. The first caller
/// performs the resolution; everyone else blocks until it finishes and then
/// receives the same result. A failed resolution is **not** retried within
/// the same process.
pub fn ensure_chrome_binary(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, ChromiumAutoError> {
    RESOLVED.get_or_init(|| resolve_or_download(on_progress)).clone()
}

/// Returns the memoised outcome without triggering resolution.
pub fn resolved_chrome_binary() -> Option<Result<PathBuf, ChromiumAutoError>> {
    RESOLVED.get().cloned()
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn env_override() -> Option<PathBuf> {
    let p = PathBuf::from(std::env::var_os("CHROME_PATH")?);
    p.is_file().then_some(p)
}

fn find_system_chrome() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let app = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if app.is_file() {
            return Some(app);
        }
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        for name in SYSTEM_BINARIES {
            let candidate = dir.join(if cfg!(windows) {
                format!("{name}.exe")
            } else {
                (*name).to_string()
            });
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn resolve_or_download(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, ChromiumAutoError> {
    // 1. Environment variable override.
    if let Some(p) = env_override() {
        return Ok(p);
    }
    if let Some(p) = std::env::var_os("CHROME_PATH") {
        // Fall through: env var set but file missing → keep looking.
        eprintln!(
            "chromium-auto: CHROME_PATH '{}' not found; searching …",
            PathBuf::from(p).display()
        );
    }

    // 2. System install.
    if let Some(p) = find_system_chrome() {
        return Ok(p);
    }

    // 3. Already cached on disk.
    if let Some(p) = cached_chrome_path() {
        return Ok(p);
    }

    if std::env::var_os("CHROMIUM_AUTO_NO_DOWNLOAD").is_some() {
        return Err(ChromiumAutoError::NotFound);
    }

    // 4. Download and extract.
    let info = detect_platform()?;
    let archive_bytes = download_bytes(&download_url(&info), on_progress)?;
    install_archive(&archive_bytes, &chrome_cache_dir(), info.exe_in_archive)
}

/// Unpacks `archive_bytes` into a private staging directory next to
/// `cache_dir` and renames it into place once `exe_in_archive` is present.
///
/// `cache_dir` therefore either does not exist or holds a complete tree; an
/// interrupted run leaves only a `-partial-<pid>` sibling, which the next
/// install removes.
fn install_archive(
    archive_bytes: &[u8],
    cache_dir: &Path,
    exe_in_archive: &str,
) -> Result<PathBuf, ChromiumAutoError> {
    let parent = cache_dir
        .parent()
        .ok_or_else(|| ChromiumAutoError::CacheDir(format!("{} has no parent", cache_dir.display())))?;
    std::fs::create_dir_all(parent).map_err(|e| ChromiumAutoError::CacheDir(e.to_string()))?;

    let leaf = cache_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = parent.join(format!("{leaf}-partial-{}", std::process::id()));
    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(|e| ChromiumAutoError::CacheDir(e.to_string()))?;
    }
    std::fs::create_dir_all(&staging).map_err(|e| ChromiumAutoError::CacheDir(e.to_string()))?;

    let staged = extract_archive(archive_bytes, &staging).and_then(|()| {
        if staging.join(exe_in_archive).is_file() {
            Ok(())
        } else {
            Err(ChromiumAutoError::Extract(format!(
                "executable '{exe_in_archive}' not found in archive"
            )))
        }
    });
    if let Err(e) = staged {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(e);
    }

    // A tree without the executable is an older partial install.
    let exe = cache_dir.join(exe_in_archive);
    if cache_dir.exists() && !exe.is_file() {
        std::fs::remove_dir_all(cache_dir).map_err(|e| ChromiumAutoError::CacheDir(e.to_string()))?;
    }

    if let Err(e) = std::fs::rename(&staging, cache_dir) {
        let _ = std::fs::remove_dir_all(&staging);
        // Another process finished the same install first.
        if exe.is_file() {
            return Ok(exe);
        }
        return Err(ChromiumAutoError::Extract(format!(
            "moving {} into place failed: {e}",
            staging.display()
        )));
    }
    Ok(exe)
}

/// Streams a URL into a `Vec<u8>`, calling `on_progress` every 64 KiB.
fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, ChromiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("chromium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(std::time::Duration::from_secs(600))
        .build()
        .map_err(|e| ChromiumAutoError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| ChromiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(ChromiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let capacity = total.unwrap_or(100 * 1024 * 1024) as usize;
    let mut buf = Vec::with_capacity(capacity);

    let mut stream = response;
    let mut chunk = vec![0u8; 64 * 1024]; // 64 KiB
    let mut downloaded: u64 = 0;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ChromiumAutoError::Download(format!("Read error: {e}")));
            }
        }
    }

    Ok(buf)
}

/// Extracts every entry of a zip archive below `dest_dir`, keeping unix
/// permission bits so the browser and its helpers stay executable.
fn extract_archive(archive_bytes: &[u8], dest_dir: &Path) -> Result<(), ChromiumAutoError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| ChromiumAutoError::Extract(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ChromiumAutoError::Extract(e.to_string()))?;

        // Skip entries that would escape the destination (`../` etc.).
        let Some(rel) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            continue;
        };
        let out_path = dest_dir.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)
                .map_err(|e| ChromiumAutoError::Extract(format!("mkdir failed: {e}")))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChromiumAutoError::Extract(format!("mkdir failed: {e}")))?;
        }
        let mut out = std::fs::File::create(&out_path)
            .map_err(|e| ChromiumAutoError::Extract(format!("create failed: {e}")))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| ChromiumAutoError::Extract(format!("Unpack failed: {e}")))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| ChromiumAutoError::Extract(format!("chmod failed: {e}")))?;
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
