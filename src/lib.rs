//! # edgequake-html2pdf
//!
//! Render URLs, inline HTML, and application views to PDF or images through
//! the `wkhtmltopdf` / `wkhtmltoimage` binaries, and deliver the result as an
//! HTTP response or a file.
//!
//! ## Why a declarative switch table?
//!
//! The binaries are driven entirely by command-line switches. Each option
//! this crate understands is one row in a `static` table ([`options`]):
//! field name, switch token, and an accessor. Serialising a request is a
//! pure walk over that table, so the command line for a given set of options
//! is always the same and easy to assert on.
//!
//! ## Pipeline Overview
//!
//! ```text
//! RenderRequest
//!  │
//!  ├─ 1. Auth     replay the caller's session cookie (--cookie)
//!  ├─ 2. Options  format switches, then common switches
//!  ├─ 3. Source   URL, or HTML on stdin with <base href> injected
//!  ├─ 4. Invoke   spawn the binary, bounded by a timeout
//!  └─ 5. Deliver  Content-Type / Content-Disposition response, or disk
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{extract::Request, response::IntoResponse};
//! use edgequake_html2pdf::{
//!     Disposition, HttpRequestContext, RenderRequest, Renderer, RendererConfig,
//! };
//!
//! async fn invoice(renderer: Renderer, req: Request) -> impl IntoResponse {
//!     let (parts, _) = req.into_parts();
//!     let ctx = HttpRequestContext::from_parts(&parts);
//!     let request = RenderRequest::pdf_from_url("https://app.example/invoice/42")
//!         .file_name("invoice-42.pdf")
//!         .disposition(Disposition::Attachment);
//!     renderer
//!         .document(Some(&ctx), &request)
//!         .await
//!         .map_err(|e| e.to_string())
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let renderer = Renderer::new(RendererConfig::builder().web_root("wwwroot").build()?);
//! # let _ = renderer;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `html2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-html2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RendererConfig, RendererConfigBuilder, DEFAULT_TIMEOUT_SECS};
pub use convert::Renderer;
pub use error::RenderError;
pub use options::{
    ConversionOptions, ImageFormat, ImageOptions, Margins, Orientation, PageSize, PdfOptions,
};
pub use pipeline::arguments::{Arguments, Segment, ToArguments};
pub use pipeline::auth::{
    HttpRequestContext, RequestContext, StaticRequestContext, DEFAULT_AUTH_COOKIE,
};
pub use pipeline::invoke::{Driver, DriverOutput, Invocation, ProcessDriver};
pub use pipeline::respond::{
    build_response, sanitize_file_name, save_bytes_to_path, Disposition, RenderedDocument,
    ResponsePolicy,
};
pub use pipeline::source::SourceSpec;
pub use progress::{NoopObserver, RenderObserver, SharedObserver};
pub use request::{FormatOptions, RenderRequest};
pub use view::{FileViewRenderer, ViewError, ViewRenderer};
pub use wkhtml_locate::{BinaryKind, Environment};
