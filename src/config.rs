//! Configuration types for HTML-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`] or read from the environment with
//! [`ConversionConfig::from_env`]. The config is consumed once at startup to
//! build the immutable provider list; nothing in it changes afterwards.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default endpoint of the html2pdf.app conversion API.
pub const HTML2PDF_APP_ENDPOINT: &str = "https://api.html2pdf.app/v1/generate";

/// Configuration for HTML-to-PDF conversion.
///
/// # Example
/// ```rust
/// use html2pdf_fit::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .viewport(1280, 720)
///     .content_timeout_secs(20)
///     .gateway("https://pdf.internal.example/api/html-to-pdf", 15)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Fixed page width in CSS pixels. Range: 200–4096. Default: 1024.
    ///
    /// The PDF page is exactly this wide; the height follows the content.
    pub viewport_width: u32,

    /// Provisional viewport height in CSS pixels. Default: 800.
    ///
    /// Only affects layout of viewport-relative units (`vh`) and the initial
    /// window size. The exported page height is the measured scroll height.
    pub viewport_height: u32,

    /// Stability window for network quiescence, in milliseconds. Default: 500.
    ///
    /// The page counts as ready once the document has loaded and no new
    /// network activity has been seen for this long.
    pub network_idle_ms: u64,

    /// Hard cap on the wait for quiescence, in seconds. Default: 30.
    pub content_timeout_secs: u64,

    /// Try the local headless browser first. Default: true.
    pub local_enabled: bool,

    /// Budget for one local render attempt (launch to teardown). Default: 45.
    pub local_timeout_secs: u64,

    /// Explicit Chrome/Chromium executable. If None, resolved by `chromium-auto`.
    pub chrome_path: Option<PathBuf>,

    /// Launch Chrome with `--no-sandbox`. Default: true.
    ///
    /// Required when running as root inside containers.
    pub no_sandbox: bool,

    /// The html2pdf.app remote backend.
    pub html2pdf_app: RemoteProviderConfig,

    /// Optional JSON gateway backend (another instance of this service works).
    pub gateway: Option<GatewayConfig>,

    /// Receives per-attempt events from the fallback chain.
    pub progress_callback: Option<ProgressCallback>,
}

/// Settings of the html2pdf.app adapter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProviderConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Per-attempt budget in seconds. Default: 8.
    pub timeout_secs: u64,
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: HTML2PDF_APP_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: 8,
        }
    }
}

impl fmt::Debug for RemoteProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteProviderConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Settings of the JSON gateway adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: String,
    /// Per-attempt budget in seconds. Default: 15.
    pub timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1024,
            viewport_height: 800,
            network_idle_ms: 500,
            content_timeout_secs: 30,
            local_enabled: true,
            local_timeout_secs: 45,
            chrome_path: None,
            no_sandbox: true,
            html2pdf_app: RemoteProviderConfig::default(),
            gateway: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("viewport_width", &self.viewport_width)
            .field("viewport_height", &self.viewport_height)
            .field("network_idle_ms", &self.network_idle_ms)
            .field("content_timeout_secs", &self.content_timeout_secs)
            .field("local_enabled", &self.local_enabled)
            .field("local_timeout_secs", &self.local_timeout_secs)
            .field("chrome_path", &self.chrome_path)
            .field("no_sandbox", &self.no_sandbox)
            .field("html2pdf_app", &self.html2pdf_app)
            .field("gateway", &self.gateway)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn FallbackProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Reopen a finished configuration for further changes.
    pub fn into_builder(self) -> ConversionConfigBuilder {
        ConversionConfigBuilder { config: self }
    }

    /// Build a configuration from `HTML2PDF_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// | Variable | Effect |
    /// |----------|--------|
    /// | `HTML2PDF_VIEWPORT_WIDTH` / `_HEIGHT` | viewport size |
    /// | `HTML2PDF_NETWORK_IDLE_MS` | quiescence window |
    /// | `HTML2PDF_CONTENT_TIMEOUT` | quiescence hard cap (s) |
    /// | `HTML2PDF_LOCAL_TIMEOUT` | local attempt budget (s) |
    /// | `HTML2PDF_DISABLE_LOCAL` | skip the local browser |
    /// | `CHROME_PATH` | browser executable |
    /// | `HTML2PDF_APP_API_KEY` / `_ENDPOINT` / `_TIMEOUT` | html2pdf.app adapter |
    /// | `HTML2PDF_DISABLE_REMOTE` | skip html2pdf.app |
    /// | `HTML2PDF_GATEWAY_URL` / `_TIMEOUT` | JSON gateway adapter |
    pub fn from_env() -> Result<Self, ConvertError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ConversionConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConvertError> {
        let num = |key: &str| -> Result<Option<u64>, ConvertError> {
            match get(key) {
                Some(v) if !v.trim().is_empty() => v.trim().parse::<u64>().map(Some).map_err(|e| {
                    ConvertError::InvalidConfig(format!("{key}={v:?} is not a number: {e}"))
                }),
                _ => Ok(None),
            }
        };
        let px = |key: &str, default: u32| -> Result<u32, ConvertError> {
            num(key)?.map_or(Ok(default), |v| {
                u32::try_from(v).map_err(|_| {
                    ConvertError::InvalidConfig(format!("{key}={v} is out of range for a pixel size"))
                })
            })
        };
        let flag = |key: &str| {
            get(key).is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
        };

        let mut b = ConversionConfig::builder();
        let d = ConversionConfig::default();
        b = b.viewport(
            px("HTML2PDF_VIEWPORT_WIDTH", d.viewport_width)?,
            px("HTML2PDF_VIEWPORT_HEIGHT", d.viewport_height)?,
        );
        if let Some(ms) = num("HTML2PDF_NETWORK_IDLE_MS")? {
            b = b.network_idle_ms(ms);
        }
        if let Some(s) = num("HTML2PDF_CONTENT_TIMEOUT")? {
            b = b.content_timeout_secs(s);
        }
        if let Some(s) = num("HTML2PDF_LOCAL_TIMEOUT")? {
            b = b.local_timeout_secs(s);
        }
        b = b.local_enabled(!flag("HTML2PDF_DISABLE_LOCAL"));
        if let Some(p) = get("CHROME_PATH").filter(|p| !p.is_empty()) {
            b = b.chrome_path(p);
        }

        let mut remote = RemoteProviderConfig {
            enabled: !flag("HTML2PDF_DISABLE_REMOTE"),
            api_key: get("HTML2PDF_APP_API_KEY").filter(|k| !k.is_empty()),
            ..RemoteProviderConfig::default()
        };
        if let Some(endpoint) = get("HTML2PDF_APP_ENDPOINT").filter(|e| !e.is_empty()) {
            remote.endpoint = endpoint;
        }
        if let Some(s) = num("HTML2PDF_APP_TIMEOUT")? {
            remote.timeout_secs = s;
        }
        b = b.html2pdf_app(remote);

        if let Some(url) = get("HTML2PDF_GATEWAY_URL").filter(|u| !u.is_empty()) {
            b = b.gateway(url, num("HTML2PDF_GATEWAY_TIMEOUT")?.unwrap_or(15));
        }

        b.build()
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn local_timeout(&self) -> Duration {
        Duration::from_secs(self.local_timeout_secs)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height.max(1);
        self
    }

    pub fn network_idle_ms(mut self, ms: u64) -> Self {
        self.config.network_idle_ms = ms;
        self
    }

    pub fn content_timeout_secs(mut self, secs: u64) -> Self {
        self.config.content_timeout_secs = secs.max(1);
        self
    }

    pub fn local_enabled(mut self, v: bool) -> Self {
        self.config.local_enabled = v;
        self
    }

    pub fn local_timeout_secs(mut self, secs: u64) -> Self {
        self.config.local_timeout_secs = secs.max(1);
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn no_sandbox(mut self, v: bool) -> Self {
        self.config.no_sandbox = v;
        self
    }

    pub fn html2pdf_app(mut self, remote: RemoteProviderConfig) -> Self {
        self.config.html2pdf_app = remote;
        self
    }

    pub fn html2pdf_app_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.html2pdf_app.api_key = Some(key.into());
        self
    }

    pub fn remote_enabled(mut self, v: bool) -> Self {
        self.config.html2pdf_app.enabled = v;
        self
    }

    pub fn gateway(mut self, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        self.config.gateway = Some(GatewayConfig {
            endpoint: endpoint.into(),
            timeout_secs: timeout_secs.max(1),
        });
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.viewport_width < 200 || c.viewport_width > 4096 {
            return Err(ConvertError::InvalidConfig(format!(
                "Viewport width must be 200–4096, got {}",
                c.viewport_width
            )));
        }
        if c.network_idle_ms >= c.content_timeout_secs * 1000 {
            return Err(ConvertError::InvalidConfig(format!(
                "Network idle window ({}ms) must be shorter than the content timeout ({}s)",
                c.network_idle_ms, c.content_timeout_secs
            )));
        }
        if c.html2pdf_app.enabled && c.html2pdf_app.timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "html2pdf.app timeout must be ≥ 1s".into(),
            ));
        }
        if let Some(gw) = &c.gateway {
            if !(gw.endpoint.starts_with("http://") || gw.endpoint.starts_with("https://")) {
                return Err(ConvertError::InvalidConfig(format!(
                    "Gateway endpoint must be an HTTP(S) URL, got '{}'",
                    gw.endpoint
                )));
            }
        }
        if !c.local_enabled && !c.html2pdf_app.enabled && c.gateway.is_none() {
            return Err(ConvertError::InvalidConfig(
                "At least one provider must be enabled".into(),
            ));
        }
        Ok(self.config)
    }
}
