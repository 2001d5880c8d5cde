//! A browser that cannot be resolved surfaces as a `Launch` attempt error.
//!
//! Own test binary: it rewrites `PATH` and fills chromium-auto's
//! process-wide memo.

use html2pdf_fit::render::chrome::ChromeEngine;
use html2pdf_fit::render::{BrowserEngine, Viewport};
use html2pdf_fit::AttemptError;
use std::time::Duration;

#[test]
fn unresolvable_browser_is_a_launch_error_every_time() {
    let empty = tempfile::tempdir().unwrap();
    std::env::remove_var("CHROME_PATH");
    std::env::set_var("PATH", empty.path());
    std::env::set_var("CHROMIUM_AUTO_CACHE_DIR", empty.path());
    std::env::set_var("CHROMIUM_AUTO_NO_DOWNLOAD", "1");

    if chromium_auto::is_chrome_available() {
        println!("SKIP: a Chrome install outside PATH is visible on this machine");
        return;
    }

    let engine = ChromeEngine::new(None, true, Duration::from_secs(5));
    let viewport = Viewport {
        width: 1024,
        height: 800,
    };
    for _ in 0..2 {
        match engine.launch(viewport) {
            Err(AttemptError::Launch(msg)) => assert!(msg.contains("No Chrome"), "{msg}"),
            Err(other) => panic!("expected a launch error, got {other:?}"),
            Ok(_) => panic!("launch without a browser succeeded"),
        }
    }
    assert!(matches!(
        chromium_auto::resolved_chrome_binary(),
        Some(Err(chromium_auto::ChromiumAutoError::NotFound))
    ));
}
