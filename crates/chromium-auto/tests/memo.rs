//! The resolution outcome is memoised per process, failures included.
//!
//! Lives in its own test binary: it rewrites `PATH` and fills the
//! process-wide memo, which would leak into any other test.

use chromium_auto::{
    ensure_chrome_binary, is_chrome_available, resolved_chrome_binary, ChromiumAutoError,
};

#[test]
fn failed_resolution_is_memoised_and_not_retried() {
    let empty = tempfile::tempdir().unwrap();
    std::env::remove_var("CHROME_PATH");
    std::env::set_var("PATH", empty.path());
    std::env::set_var("CHROMIUM_AUTO_CACHE_DIR", empty.path());
    std::env::set_var("CHROMIUM_AUTO_NO_DOWNLOAD", "1");

    if is_chrome_available() {
        println!("SKIP: a Chrome install outside PATH is visible on this machine");
        return;
    }
    assert_eq!(resolved_chrome_binary(), None);

    assert_eq!(ensure_chrome_binary(None), Err(ChromiumAutoError::NotFound));

    // A browser appearing later does not change the memoised outcome.
    let chrome = empty.path().join("chrome");
    std::fs::write(&chrome, b"#!/bin/sh\n").unwrap();
    std::env::set_var("CHROME_PATH", &chrome);

    assert_eq!(ensure_chrome_binary(None), Err(ChromiumAutoError::NotFound));
    assert_eq!(resolved_chrome_binary(), Some(Err(ChromiumAutoError::NotFound)));
}
