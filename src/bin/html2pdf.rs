//! CLI binary for html2pdf-fit.
//!
//! `html2pdf serve` runs the HTTP service; `html2pdf render` converts one
//! document from a file, URL or stdin.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use html2pdf_fit::{
    input, server, ConversionConfig, ConversionOutput, ConversionRequest, Converter,
    FailureReport, FallbackProgressCallback, ProgressCallback, ReturnType,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the provider currently being tried and logs each
/// failed attempt above it.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Converting");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }
}

impl FallbackProgressCallback for CliProgressCallback {
    fn on_attempt_start(&self, provider_id: &str, index: usize, total: usize) {
        self.bar
            .set_message(format!("{provider_id} {}", dim(&format!("({}/{total})", index + 1))));
    }

    fn on_attempt_failed(&self, failure: &FailureReport, _index: usize, _total: usize) {
        let mut detail = failure.detail.clone();
        if detail.chars().count() > 80 {
            detail = detail.chars().take(79).chain(['…']).collect();
        }
        self.bar.println(format!(
            "  {} {:<14} {}",
            red("✗"),
            failure.provider_id,
            red(&detail)
        ));
    }

    fn on_conversion_complete(&self, provider_id: &str, byte_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} via {}  {}",
            green("✔"),
            bold(&format!("{byte_len} bytes")),
            provider_id,
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64())),
        );
    }

    fn on_chain_exhausted(&self, failures: &[FailureReport]) {
        self.bar.finish_and_clear();
        eprintln!("{} all {} providers failed", red("✘"), failures.len());
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 5000
  html2pdf serve --addr 0.0.0.0:5000

  # Convert a local file (writes ./page.pdf)
  html2pdf render page.html

  # Convert a URL to a named file
  html2pdf render https://example.com -o example.pdf

  # Read stdin, print the base64 JSON payload
  echo '<h1>Hi</h1>' | html2pdf render - --base64

  # Remote providers only
  html2pdf --no-local render page.html

HTTP API:
  POST /api/html-to-pdf   {"html": "...", "filename": "...", "returnType": "file|base64"}
  GET  /api/health
  GET  /

ENVIRONMENT VARIABLES:
  HTML2PDF_VIEWPORT_WIDTH     Page width in CSS px (default 1024)
  HTML2PDF_VIEWPORT_HEIGHT    Provisional viewport height (default 800)
  HTML2PDF_NETWORK_IDLE_MS    Network quiescence window (default 500)
  HTML2PDF_CONTENT_TIMEOUT    Max wait for quiescence in seconds (default 30)
  HTML2PDF_LOCAL_TIMEOUT      Local attempt budget in seconds (default 45)
  HTML2PDF_DISABLE_LOCAL      Skip the local browser
  HTML2PDF_APP_API_KEY        html2pdf.app API key
  HTML2PDF_APP_ENDPOINT       html2pdf.app endpoint override
  HTML2PDF_APP_TIMEOUT        html2pdf.app budget in seconds (default 8)
  HTML2PDF_DISABLE_REMOTE     Skip html2pdf.app
  HTML2PDF_GATEWAY_URL        JSON gateway endpoint (tried last)
  HTML2PDF_GATEWAY_TIMEOUT    Gateway budget in seconds (default 15)
  CHROME_PATH                 Chrome/Chromium executable (skips auto-download)
  CHROMIUM_AUTO_CACHE_DIR     Override the browser download cache
  CHROMIUM_AUTO_NO_DOWNLOAD   Never download a browser
  RUST_LOG                    Log filter (default: info)

SETUP:
  If no Chrome is installed, chrome-headless-shell (~100 MB) is downloaded
  on first use and cached under ~/.cache/html2pdf/. No manual setup needed.
"#;

#[derive(Parser, Debug)]
#[command(
    name = "html2pdf",
    version,
    about = "Convert HTML to a single content-sized PDF page",
    long_about = "Convert HTML to a PDF whose single page is exactly as tall as the rendered \
content. Uses a local headless Chrome first and falls back to remote conversion services.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    engine: EngineArgs,

    #[arg(short, long, global = true, env = "HTML2PDF_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "HTML2PDF_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Page width in CSS pixels.
    #[arg(long, global = true,
          value_parser = clap::value_parser!(u32).range(200..=4096))]
    width: Option<u32>,

    /// Provisional viewport height in CSS pixels.
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Chrome/Chromium executable.
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,

    /// Keep Chrome's sandbox on (needs a non-root user).
    #[arg(long, global = true)]
    sandbox: bool,

    /// Skip the local browser.
    #[arg(long, global = true)]
    no_local: bool,

    /// Skip html2pdf.app.
    #[arg(long, global = true)]
    no_remote: bool,

    /// JSON gateway endpoint, tried after every other provider.
    #[arg(long, global = true)]
    gateway: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        #[arg(long, env = "HTML2PDF_ADDR", default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
    },
    /// Convert one document.
    Render {
        /// HTML file, http(s) URL, or `-` for stdin.
        input: String,

        /// Output PDF path. Default: `<filename>` in the current directory.
        #[arg(short, long, conflicts_with = "base64")]
        output: Option<PathBuf>,

        /// Name used when no output path is given; `.pdf` is appended if missing.
        #[arg(long)]
        filename: Option<String>,

        /// Print `{success, pdf, size}` JSON to stdout instead of writing a file.
        #[arg(long)]
        base64: bool,

        #[arg(long, env = "HTML2PDF_NO_PROGRESS")]
        no_progress: bool,

        #[arg(long, env = "HTML2PDF_DOWNLOAD_TIMEOUT", default_value_t = 60)]
        download_timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Rendering with the spinner keeps library INFO logs out of the way.
    let spinner = matches!(cli.command, Command::Render { no_progress: false, .. }) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if spinner {
        Some(CliProgressCallback::new() as Arc<dyn FallbackProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli.engine, progress)?;

    if config.local_enabled && config.chrome_path.is_none() {
        ensure_browser(cli.quiet);
    }

    let converter = Converter::from_config(&config).context("Invalid provider configuration")?;

    match cli.command {
        Command::Serve { addr } => server::serve(addr, converter)
            .await
            .with_context(|| format!("HTTP server on {addr} failed")),
        Command::Render {
            input,
            output,
            filename,
            base64,
            download_timeout,
            ..
        } => {
            let html = input::resolve_html(&input, download_timeout)
                .await
                .with_context(|| format!("Failed to read HTML from {input}"))?;
            let name = filename.unwrap_or_else(|| default_filename(&input));
            let request = ConversionRequest::new(html).with_filename(name).with_return_type(
                if base64 {
                    ReturnType::Encoded
                } else {
                    ReturnType::File
                },
            );
            render(&converter, &request, output.as_deref(), cli.quiet || spinner).await
        }
    }
}

async fn render(
    converter: &Converter,
    request: &ConversionRequest,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    if request.return_type() == ReturnType::Encoded {
        let out = converter.convert(request).await.context("Conversion failed")?;
        if let ConversionOutput::Encoded(encoded) = out {
            println!(
                "{}",
                serde_json::to_string(&encoded).context("Failed to serialise output")?
            );
        }
        return Ok(());
    }

    let (path, result) = match output {
        Some(path) => {
            let result = converter
                .convert_result(request)
                .await
                .context("Conversion failed")?;
            html2pdf_fit::convert::write_atomic(path, &result.bytes).await?;
            (path.to_path_buf(), result)
        }
        None => converter
            .convert_to_file(request, ".")
            .await
            .context("Conversion failed")?,
    };

    if !quiet {
        eprintln!(
            "{}  {} bytes via {}{}  →  {}",
            green("✔"),
            result.byte_length,
            result.provider_id,
            result
                .content_height_px
                .map(|h| format!(" ({}x{h}px)", converter.viewport().0))
                .unwrap_or_default(),
            bold(&path.display().to_string()),
        );
    }
    Ok(())
}

fn build_config(args: &EngineArgs, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let base = ConversionConfig::from_env().context("Invalid HTML2PDF_* environment")?;
    let (w, h) = (
        args.width.unwrap_or(base.viewport_width),
        args.height.unwrap_or(base.viewport_height),
    );
    let mut b = base.into_builder().viewport(w, h);

    if let Some(ref p) = args.chrome_path {
        b = b.chrome_path(p);
    }
    if args.sandbox {
        b = b.no_sandbox(false);
    }
    if args.no_local {
        b = b.local_enabled(false);
    }
    if args.no_remote {
        b = b.remote_enabled(false);
    }
    if let Some(ref url) = args.gateway {
        b = b.gateway(url, 15);
    }
    if let Some(cb) = progress {
        b = b.progress_callback(cb);
    }
    b.build().context("Invalid configuration")
}

/// Make sure a browser is on disk before the first request, showing a
/// progress bar if it has to be downloaded.
fn ensure_browser(quiet: bool) {
    if chromium_auto::is_chrome_available() {
        return;
    }

    // Failure is not fatal: the chain simply falls back to remote providers.
    let outcome = if quiet {
        tokio::task::block_in_place(|| chromium_auto::ensure_chrome_binary(None))
    } else {
        let dl_bar = ProgressBar::new(0);
        dl_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        dl_bar.set_prefix("Browser");
        dl_bar.enable_steady_tick(Duration::from_millis(80));

        let bar = dl_bar.clone();
        let outcome = tokio::task::block_in_place(|| {
            chromium_auto::ensure_chrome_binary(Some(&|downloaded, total| {
                if let Some(t) = total {
                    if bar.length().unwrap_or(0) != t {
                        bar.set_length(t);
                    }
                }
                bar.set_position(downloaded);
            }))
        });
        dl_bar.finish_and_clear();
        outcome
    };

    match outcome {
        Ok(path) => tracing::info!("Using browser at {}", path.display()),
        Err(e) => {
            if !quiet {
                eprintln!("{} local browser unavailable: {e}", red("!"));
            }
            tracing::warn!("Local browser unavailable, remote providers only: {e}");
        }
    }
}

/// `page.html` → `page.pdf`, URLs and stdin → `document.pdf`.
fn default_filename(input: &str) -> String {
    if input == "-" || input::is_url(input) {
        return html2pdf_fit::request::DEFAULT_FILENAME.to_string();
    }
    Path::new(input)
        .file_stem()
        .map(|s| format!("{}.pdf", s.to_string_lossy()))
        .unwrap_or_else(|| html2pdf_fit::request::DEFAULT_FILENAME.to_string())
}
