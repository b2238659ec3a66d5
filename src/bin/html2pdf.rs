//! CLI binary for edgequake-html2pdf.
//!
//! A thin shim over the library crate that maps CLI flags onto a
//! `RenderRequest` and a `RendererConfig`, then writes the rendered bytes to
//! a file or stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_html2pdf::{
    ConversionOptions, Environment, FileViewRenderer, FormatOptions, ImageFormat, ImageOptions,
    Margins, Orientation, PageSize, PdfOptions, RenderError, RenderObserver, RenderRequest,
    Renderer, RendererConfig, SharedObserver, SourceSpec, StaticRequestContext,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
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

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Spinner shown while the binary runs.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Rendering");
        bar.set_message("Preparing…");
        Arc::new(Self { bar })
    }
}

impl RenderObserver for CliObserver {
    fn on_invoke_start(&self, program: &Path, argc: usize) {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        self.bar.set_message(format!("{name} {}", dim(&format!("({argc} args)"))));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_invoke_complete(&self, bytes: usize, elapsed_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} bytes  {}",
            green("✔"),
            bold(&bytes.to_string()),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        );
    }

    fn on_invoke_failed(&self, error: &RenderError) {
        self.bar.finish_and_clear();
        let msg = error.to_string();
        let first_line = msg.lines().next().unwrap_or_default();
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render a URL to report.pdf
  html2pdf https://example.com/report -o report.pdf

  # Render a local HTML file, resolving relative assets against a site
  html2pdf invoice.html --base-url https://app.example -o invoice.pdf

  # Pipe HTML through stdin, PDF to stdout
  cat page.html | html2pdf - > page.pdf

  # A4 landscape with 10mm margins and no JavaScript
  html2pdf https://example.com -s A4 --orientation landscape --margin 10 -n -o out.pdf

  # Screenshot as PNG
  html2pdf https://example.com --image --format png --width 1280 -o shot.png

  # Render a view template with a JSON model
  html2pdf view:Invoice --views-dir templates --model invoice.json -o invoice.pdf

  # Replay a session cookie so protected pages render
  html2pdf https://app.example/private --auth-cookie .ASPXAUTH=abc123 -o private.pdf

  # Show the command line that would run, without running it
  html2pdf https://example.com -s Letter --print-args

ENVIRONMENT VARIABLES:
  WKHTML_PATH        Directory holding wkhtmltopdf / wkhtmltoimage
  HTML2PDF_*         Every flag can also be set through the environment
  RUST_LOG           Overrides the log filter
"#;

/// Render URLs, HTML files and views to PDF or images through wkhtmltopdf.
#[derive(Parser, Debug)]
#[command(
    name = "html2pdf",
    version,
    about = "Render URLs, HTML files and views to PDF or images through wkhtmltopdf",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// http(s) URL, HTML file path, `view:<Name>`, or `-` for stdin.
    input: String,

    /// Write output to this path instead of stdout.
    #[arg(short, long, env = "HTML2PDF_OUTPUT")]
    output: Option<String>,

    // ── Binary / runtime ────────────────────────────────────────────────────
    /// Directory holding the wkhtmltopdf binaries.
    #[arg(long, env = "HTML2PDF_BINARY_DIR")]
    binary_dir: Option<PathBuf>,

    /// Web root searched for `wkhtml/` when no binary dir is given.
    #[arg(long, env = "HTML2PDF_WEB_ROOT")]
    web_root: Option<PathBuf>,

    /// Look for the binaries next to this executable under `wwwroot/wkhtml`.
    #[arg(long, env = "HTML2PDF_DEVELOPMENT")]
    development: bool,

    /// Seconds before the binary is killed.
    #[arg(long, env = "HTML2PDF_TIMEOUT", default_value_t = edgequake_html2pdf::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Base URL for relative links in HTML input, e.g. https://app.example.
    #[arg(long, env = "HTML2PDF_BASE_URL")]
    base_url: Option<String>,

    /// Session cookie to replay to the binary, as NAME=VALUE.
    #[arg(long, env = "HTML2PDF_AUTH_COOKIE", value_parser = parse_key_val)]
    auth_cookie: Option<(String, String)>,

    /// JSON file with option defaults; flags override its values.
    #[arg(long, env = "HTML2PDF_OPTIONS_FILE")]
    options_file: Option<PathBuf>,

    /// Directory searched for `view:` templates (repeatable).
    #[arg(long = "views-dir", env = "HTML2PDF_VIEWS_DIR", value_delimiter = ',')]
    views_dirs: Vec<PathBuf>,

    /// JSON model for `view:` input.
    #[arg(long, env = "HTML2PDF_MODEL")]
    model: Option<PathBuf>,

    /// Print the composed command line and exit.
    #[arg(long)]
    print_args: bool,

    // ── Common options ──────────────────────────────────────────────────────
    /// Extra HTTP header sent by the binary, as KEY=VALUE (repeatable).
    #[arg(long = "header", value_parser = parse_key_val)]
    headers: Vec<(String, String)>,

    /// Cookie sent by the binary, as NAME=VALUE (repeatable).
    #[arg(long = "cookie", value_parser = parse_key_val)]
    cookies: Vec<(String, String)>,

    /// Form field posted to the source URL, as NAME=VALUE (repeatable).
    #[arg(long = "post", value_parser = parse_key_val)]
    post: Vec<(String, String)>,

    /// Do not run JavaScript in the page.
    #[arg(short = 'n', long, env = "HTML2PDF_DISABLE_JAVASCRIPT")]
    disable_javascript: bool,

    /// Minimum font size in points.
    #[arg(long, env = "HTML2PDF_MINIMUM_FONT_SIZE")]
    minimum_font_size: Option<u32>,

    /// HTTP proxy used by the binary.
    #[arg(short = 'p', long, env = "HTML2PDF_PROXY")]
    proxy: Option<String>,

    /// HTTP authentication username.
    #[arg(long, env = "HTML2PDF_USERNAME")]
    username: Option<String>,

    /// HTTP authentication password.
    #[arg(long, env = "HTML2PDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Raw switches appended verbatim, e.g. "--no-outline --zoom 1.2".
    #[arg(long, env = "HTML2PDF_CUSTOM_SWITCHES", allow_hyphen_values = true)]
    custom_switches: Option<String>,

    // ── PDF options ─────────────────────────────────────────────────────────
    /// Paper size: A4, Letter, Legal, …
    #[arg(short = 's', long, env = "HTML2PDF_PAGE_SIZE")]
    page_size: Option<PageSize>,

    /// Page width in millimetres.
    #[arg(long, env = "HTML2PDF_PAGE_WIDTH")]
    page_width: Option<f64>,

    /// Page height in millimetres.
    #[arg(long, env = "HTML2PDF_PAGE_HEIGHT")]
    page_height: Option<f64>,

    /// Page orientation.
    #[arg(short = 'O', long, env = "HTML2PDF_ORIENTATION", value_enum)]
    orientation: Option<OrientationArg>,

    /// Margin on all sides, in millimetres.
    #[arg(long, env = "HTML2PDF_MARGIN")]
    margin: Option<f64>,

    #[arg(short = 'T', long, env = "HTML2PDF_MARGIN_TOP")]
    margin_top: Option<f64>,

    #[arg(short = 'R', long, env = "HTML2PDF_MARGIN_RIGHT")]
    margin_right: Option<f64>,

    #[arg(short = 'B', long, env = "HTML2PDF_MARGIN_BOTTOM")]
    margin_bottom: Option<f64>,

    #[arg(short = 'L', long, env = "HTML2PDF_MARGIN_LEFT")]
    margin_left: Option<f64>,

    /// Smaller, lower-quality PDF.
    #[arg(short = 'l', long, env = "HTML2PDF_LOW_QUALITY")]
    low_quality: bool,

    /// Grayscale PDF.
    #[arg(short = 'g', long, env = "HTML2PDF_GRAYSCALE")]
    grayscale: bool,

    /// Number of copies.
    #[arg(long, env = "HTML2PDF_COPIES")]
    copies: Option<u32>,

    // ── Image options ───────────────────────────────────────────────────────
    /// Produce an image with wkhtmltoimage instead of a PDF.
    #[arg(long, env = "HTML2PDF_IMAGE")]
    image: bool,

    /// Image format.
    #[arg(short = 'f', long, env = "HTML2PDF_FORMAT", value_enum, requires = "image")]
    format: Option<ImageFormatArg>,

    /// Viewport width in pixels.
    #[arg(long, env = "HTML2PDF_WIDTH", requires = "image")]
    width: Option<u32>,

    /// Viewport height in pixels.
    #[arg(long, env = "HTML2PDF_HEIGHT", requires = "image")]
    height: Option<u32>,

    /// JPEG quality (0–100).
    #[arg(long, env = "HTML2PDF_QUALITY", requires = "image",
          value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,

    // ── Output ──────────────────────────────────────────────────────────────
    /// Disable the spinner.
    #[arg(long, env = "HTML2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HTML2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HTML2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImageFormatArg {
    Jpg,
    Png,
    Bmp,
    Svg,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(v: ImageFormatArg) -> Self {
        match v {
            ImageFormatArg::Jpg => ImageFormat::Jpg,
            ImageFormatArg::Png => ImageFormat::Png,
            ImageFormatArg::Bmp => ImageFormat::Bmp,
            ImageFormatArg::Svg => ImageFormat::Svg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress; keep library INFO logs out of its way.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.print_args;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config ─────────────────────────────────────────────────────
    let observer: Option<SharedObserver> = if show_progress {
        Some(CliObserver::new() as Arc<dyn RenderObserver>)
    } else {
        None
    };
    let config = build_config(&cli, observer)?;

    let mut renderer = Renderer::new(config);
    if !cli.views_dirs.is_empty() {
        renderer = renderer.with_views(Arc::new(FileViewRenderer::new(cli.views_dirs.clone())));
    }

    // ── Build request ────────────────────────────────────────────────────
    let source = read_source(&cli).await?;
    let format = build_format(&cli).await?;
    let ctx = build_context(&cli, &source)?;
    let request = RenderRequest::new(source, format);
    let ctx_ref = ctx
        .as_ref()
        .map(|c| c as &dyn edgequake_html2pdf::RequestContext);

    if cli.print_args {
        let invocation = renderer
            .build_invocation(ctx_ref, &request)
            .await
            .context("Failed to compose the command line")?;
        println!(
            "{} {}",
            invocation.program().display(),
            invocation.command_line()
        );
        return Ok(());
    }

    // ── Render ───────────────────────────────────────────────────────────
    match cli.output.as_deref() {
        Some(output) => {
            let saved = renderer
                .save_to_path(ctx_ref, &request, Some(output))
                .await
                .context("Rendering failed")?;
            if !saved {
                bail!("Could not write output to '{output}'");
            }
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(output));
            }
        }
        None => {
            let bytes = renderer
                .render(ctx_ref, &request)
                .await
                .context("Rendering failed")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}

/// Map CLI args to `RendererConfig`.
fn build_config(cli: &Cli, observer: Option<SharedObserver>) -> Result<RendererConfig> {
    let mut builder = RendererConfig::builder().timeout_secs(cli.timeout);

    if let Some(dir) = &cli.binary_dir {
        builder = builder.binary_dir(dir);
    }
    if let Some(root) = &cli.web_root {
        builder = builder.web_root(root);
    }
    if cli.development {
        builder = builder.environment(Environment::Development);
    }
    if let Some((name, _)) = &cli.auth_cookie {
        builder = builder.auth_cookie_name(name);
    }
    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }

    builder.build().context("Invalid configuration")
}

/// Classify INPUT and load its content.
async fn read_source(cli: &Cli) -> Result<SourceSpec> {
    let input = cli.input.trim();

    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok(SourceSpec::Url(input.to_string()));
    }

    if let Some(name) = input.strip_prefix("view:") {
        if cli.views_dirs.is_empty() {
            bail!("view input needs at least one --views-dir");
        }
        let model = match &cli.model {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read model from {:?}", path))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Model {:?} is not valid JSON", path))?
            }
            None => serde_json::Value::Null,
        };
        return Ok(SourceSpec::View {
            name: name.to_string(),
            model,
        });
    }

    if input == "-" {
        let mut html = String::new();
        tokio::io::stdin()
            .read_to_string(&mut html)
            .await
            .context("Failed to read HTML from stdin")?;
        return Ok(SourceSpec::Html(html));
    }

    let html = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read HTML from {:?}", input))?;
    Ok(SourceSpec::Html(html))
}

/// Request context from `--base-url`, or from the input URL itself.
///
/// Without a context there is no cookie replay and no `<base href>`.
fn build_context(cli: &Cli, source: &SourceSpec) -> Result<Option<StaticRequestContext>> {
    let origin = match (&cli.base_url, source) {
        (Some(base), _) => Some(base.as_str()),
        (None, SourceSpec::Url(url)) => Some(url.as_str()),
        (None, _) => None,
    };

    let Some(origin) = origin else {
        if cli.auth_cookie.is_some() {
            bail!("--auth-cookie needs --base-url for HTML and view input");
        }
        return Ok(None);
    };

    let parsed = url::Url::parse(origin).with_context(|| format!("Invalid URL '{origin}'"))?;
    let host = parsed
        .host_str()
        .with_context(|| format!("URL '{origin}' has no host"))?;
    let host = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut ctx = StaticRequestContext::new(parsed.scheme(), host);
    if let Some((name, value)) = &cli.auth_cookie {
        ctx = ctx.with_cookie(name, value);
    }
    Ok(Some(ctx))
}

/// Options file first, then flags on top.
async fn build_format(cli: &Cli) -> Result<FormatOptions> {
    let raw = match &cli.options_file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read options from {:?}", path))?,
        ),
        None => None,
    };

    if cli.image {
        let mut options: ImageOptions = match &raw {
            Some(json) => serde_json::from_str(json).context("Invalid image options file")?,
            None => ImageOptions::default(),
        };
        if let Some(format) = cli.format {
            options.format = Some(format.into());
        }
        options.width = cli.width.or(options.width);
        options.height = cli.height.or(options.height);
        options.quality = cli.quality.or(options.quality);
        apply_common(cli, &mut options.common);
        return Ok(FormatOptions::Image(options));
    }

    let mut options: PdfOptions = match &raw {
        Some(json) => serde_json::from_str(json).context("Invalid PDF options file")?,
        None => PdfOptions::default(),
    };
    options.page_size = cli.page_size.or(options.page_size);
    options.page_width = cli.page_width.or(options.page_width);
    options.page_height = cli.page_height.or(options.page_height);
    if let Some(orientation) = cli.orientation {
        options.orientation = Some(orientation.into());
    }
    if let Some(mm) = cli.margin {
        options.margins = Margins::uniform(mm);
    }
    options.margins.top = cli.margin_top.or(options.margins.top);
    options.margins.right = cli.margin_right.or(options.margins.right);
    options.margins.bottom = cli.margin_bottom.or(options.margins.bottom);
    options.margins.left = cli.margin_left.or(options.margins.left);
    options.low_quality |= cli.low_quality;
    options.grayscale |= cli.grayscale;
    options.copies = cli.copies.or(options.copies);
    apply_common(cli, &mut options.common);
    Ok(FormatOptions::Pdf(options))
}

fn apply_common(cli: &Cli, common: &mut ConversionOptions) {
    common.custom_headers.extend(cli.headers.iter().cloned());
    common.cookies.extend(cli.cookies.iter().cloned());
    common.post.extend(cli.post.iter().cloned());
    common.disable_javascript |= cli.disable_javascript;
    common.minimum_font_size = cli.minimum_font_size.or(common.minimum_font_size);
    if cli.proxy.is_some() {
        common.proxy = cli.proxy.clone();
    }
    if cli.username.is_some() {
        common.username = cli.username.clone();
    }
    if cli.password.is_some() {
        common.password = cli.password.clone();
    }
    if cli.custom_switches.is_some() {
        common.custom_switches = cli.custom_switches.clone();
    }
}

/// Parse `KEY=VALUE`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
