//! Input resolution for the CLI: read HTML from a local file, a URL or stdin.

use crate::error::ConvertError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the HTML named by `input`.
///
/// `-` reads standard input, `http(s)://` URLs are fetched, anything else is
/// treated as a file path.
pub async fn resolve_html(input: &str, timeout_secs: u64) -> Result<String, ConvertError> {
    if input == "-" {
        read_stdin().await
    } else if is_url(input) {
        download(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_stdin() -> Result<String, ConvertError> {
    use tokio::io::AsyncReadExt;
    let mut html = String::new();
    tokio::io::stdin()
        .read_to_string(&mut html)
        .await
        .map_err(|e| ConvertError::InvalidRequest(format!("Could not read stdin: {e}")))?;
    Ok(html)
}

async fn read_local(path_str: &str) -> Result<String, ConvertError> {
    let path = PathBuf::from(path_str);
    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConvertError::FileNotFound { path });
        }
        Err(e) => {
            return Err(ConvertError::InvalidRequest(format!(
                "Could not read '{}': {e}",
                path.display()
            )))
        }
    };
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    // Lossy so a stray Latin-1 byte doesn't abort an otherwise fine page.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn download(url: &str, timeout_secs: u64) -> Result<String, ConvertError> {
    info!("Downloading HTML from: {}", url);
    let failed = |reason: String| ConvertError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    response.text().await.map_err(|e| failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/page.html"));
        assert!(is_url("http://localhost:8080/"));
        assert!(!is_url("page.html"));
        assert!(!is_url("ftp://example.com/page.html"));
    }

    #[tokio::test]
    async fn reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<h1>hi</h1>").unwrap();
        let html = resolve_html(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(html, "<h1>hi</h1>");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_html("/definitely/not/here.html", 5).await.unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn unreachable_url_is_a_download_error() {
        let err = resolve_html("http://127.0.0.1:9/page.html", 2).await.unwrap_err();
        assert!(matches!(err, ConvertError::DownloadFailed { .. }));
    }
}
