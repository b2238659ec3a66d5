//! Option holders and the static switch registry.
//!
//! Each option the renderer understands is one [`OptionSpec`] row: a field
//! name, the literal switch token, and an accessor that reads the value out
//! of a plain holder struct. The tables are `static` slices, built at compile
//! time and never mutated, so concurrent requests read them without locking.
//!
//! Table order is output order. Format-specific rows come first, then the
//! [`COMMON_OPTIONS`]; the raw passthrough row (empty switch) is declared last
//! so unmodeled switches trail the modeled ones.
//!
//! ```rust
//! use edgequake_html2pdf::options::{ConversionOptions, PdfOptions, PageSize};
//! use edgequake_html2pdf::pipeline::arguments::ToArguments;
//!
//! let options = PdfOptions {
//!     page_size: Some(PageSize::A4),
//!     common: ConversionOptions {
//!         disable_javascript: true,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert_eq!(options.to_arguments().to_command_line(), "-s A4 -n");
//! ```

use crate::pipeline::arguments::{serialize, Arguments, ToArguments};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key/value mapping emitted as repeated `switch key value` triples.
pub type KeyedPairs = BTreeMap<String, String>;

// ── Registry types ───────────────────────────────────────────────────────

/// How an option's value turns into command-line tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// `switch` when true, nothing otherwise.
    Flag,
    /// `switch value` when present; bare `value` when the switch is empty.
    Scalar,
    /// `switch key value` once per entry.
    KeyedPairs,
}

/// Reads one option's value from a holder of type `T`.
pub enum Accessor<T> {
    Flag(fn(&T) -> bool),
    Scalar(fn(&T) -> Option<String>),
    KeyedPairs(for<'a> fn(&'a T) -> &'a KeyedPairs),
}

/// One row of a switch registry.
pub struct OptionSpec<T> {
    /// Field name, used in logs and diagnostics.
    pub name: &'static str,
    /// Literal switch token, e.g. `--cookie`. Empty for raw passthrough.
    pub switch: &'static str,
    pub accessor: Accessor<T>,
}

impl<T> OptionSpec<T> {
    pub const fn flag(name: &'static str, switch: &'static str, read: fn(&T) -> bool) -> Self {
        Self {
            name,
            switch,
            accessor: Accessor::Flag(read),
        }
    }

    pub const fn scalar(
        name: &'static str,
        switch: &'static str,
        read: fn(&T) -> Option<String>,
    ) -> Self {
        Self {
            name,
            switch,
            accessor: Accessor::Scalar(read),
        }
    }

    pub const fn pairs(
        name: &'static str,
        switch: &'static str,
        read: for<'a> fn(&'a T) -> &'a KeyedPairs,
    ) -> Self {
        Self {
            name,
            switch,
            accessor: Accessor::KeyedPairs(read),
        }
    }

    pub fn kind(&self) -> OptionKind {
        match self.accessor {
            Accessor::Flag(_) => OptionKind::Flag,
            Accessor::Scalar(_) => OptionKind::Scalar,
            Accessor::KeyedPairs(_) => OptionKind::KeyedPairs,
        }
    }
}

impl<T> fmt::Debug for OptionSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("name", &self.name)
            .field("switch", &self.switch)
            .field("kind", &self.kind())
            .finish()
    }
}

// ── Common options ───────────────────────────────────────────────────────

/// Options accepted by both the PDF and the image binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Extra HTTP headers sent with every request the binary makes.
    pub custom_headers: KeyedPairs,
    /// Cookies sent with every request the binary makes.
    pub cookies: KeyedPairs,
    /// Form fields posted to the source URL.
    pub post: KeyedPairs,
    /// Do not allow the page to run JavaScript.
    pub disable_javascript: bool,
    /// Minimum font size, in points.
    pub minimum_font_size: Option<u32>,
    /// HTTP proxy, e.g. `http://proxy:3128`.
    pub proxy: Option<String>,
    /// HTTP authentication username.
    pub username: Option<String>,
    /// HTTP authentication password.
    pub password: Option<String>,
    /// Switches this crate does not model, appended verbatim.
    pub custom_switches: Option<String>,
}

pub static COMMON_OPTIONS: &[OptionSpec<ConversionOptions>] = &[
    OptionSpec::pairs("custom_headers", "--custom-header", |o| &o.custom_headers),
    OptionSpec::pairs("cookies", "--cookie", |o| &o.cookies),
    OptionSpec::pairs("post", "--post", |o| &o.post),
    OptionSpec::flag("disable_javascript", "-n", |o| o.disable_javascript),
    OptionSpec::scalar("minimum_font_size", "--minimum-font-size", |o| {
        o.minimum_font_size.map(|v| v.to_string())
    }),
    OptionSpec::scalar("proxy", "-p", |o| o.proxy.clone()),
    OptionSpec::scalar("username", "--username", |o| o.username.clone()),
    OptionSpec::scalar("password", "--password", |o| o.password.clone()),
    OptionSpec::scalar("custom_switches", "", |o| o.custom_switches.clone()),
];

impl ToArguments for ConversionOptions {
    fn to_arguments(&self) -> Arguments {
        serialize(COMMON_OPTIONS, self)
    }
}

// ── PDF options ──────────────────────────────────────────────────────────

/// Paper size accepted by `-s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    B8,
    B9,
    B10,
    C5E,
    Comm10E,
    DLE,
    Executive,
    Folio,
    Ledger,
    Legal,
    Letter,
    Tabloid,
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The binary's paper names match the variant names exactly.
        fmt::Debug::fmt(self, f)
    }
}

impl std::str::FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown page size '{s}'"))
    }
}

/// Page orientation accepted by `-O`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => f.write_str("Portrait"),
            Orientation::Landscape => f.write_str("Landscape"),
        }
    }
}

/// Page margins in millimetres. Unset sides keep the binary's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

impl Margins {
    /// Same margin on all four sides.
    pub fn uniform(mm: f64) -> Self {
        Self {
            top: Some(mm),
            right: Some(mm),
            bottom: Some(mm),
            left: Some(mm),
        }
    }
}

/// Options for `wkhtmltopdf`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    pub page_size: Option<PageSize>,
    /// Page width in millimetres; overrides `page_size` when both are set.
    pub page_width: Option<f64>,
    /// Page height in millimetres.
    pub page_height: Option<f64>,
    pub orientation: Option<Orientation>,
    pub margins: Margins,
    /// Lower-quality output, smaller files.
    pub low_quality: bool,
    pub grayscale: bool,
    /// Number of copies to print into the PDF.
    pub copies: Option<u32>,
    #[serde(flatten)]
    pub common: ConversionOptions,
}

pub static PDF_OPTIONS: &[OptionSpec<PdfOptions>] = &[
    OptionSpec::scalar("page_size", "-s", |o| o.page_size.map(|v| v.to_string())),
    OptionSpec::scalar("page_width", "--page-width", |o| {
        o.page_width.map(|v| v.to_string())
    }),
    OptionSpec::scalar("page_height", "--page-height", |o| {
        o.page_height.map(|v| v.to_string())
    }),
    OptionSpec::scalar("orientation", "-O", |o| o.orientation.map(|v| v.to_string())),
    OptionSpec::scalar("margin_top", "-T", |o| o.margins.top.map(|v| v.to_string())),
    OptionSpec::scalar("margin_right", "-R", |o| o.margins.right.map(|v| v.to_string())),
    OptionSpec::scalar("margin_bottom", "-B", |o| {
        o.margins.bottom.map(|v| v.to_string())
    }),
    OptionSpec::scalar("margin_left", "-L", |o| o.margins.left.map(|v| v.to_string())),
    OptionSpec::flag("low_quality", "-l", |o| o.low_quality),
    OptionSpec::flag("grayscale", "-g", |o| o.grayscale),
    OptionSpec::scalar("copies", "--copies", |o| o.copies.map(|v| v.to_string())),
];

impl ToArguments for PdfOptions {
    fn to_arguments(&self) -> Arguments {
        let mut args = serialize(PDF_OPTIONS, self);
        args.extend(self.common.to_arguments());
        args
    }
}

// ── Image options ────────────────────────────────────────────────────────

/// Output format accepted by `-f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
    Bmp,
    Svg,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Svg => "svg",
        }
    }

    /// MIME type of the produced image.
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for `wkhtmltoimage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Viewport width in pixels.
    pub width: Option<u32>,
    /// Viewport height in pixels; unset renders the full page height.
    pub height: Option<u32>,
    pub format: Option<ImageFormat>,
    /// JPEG quality, 0–100.
    pub quality: Option<u8>,
    #[serde(flatten)]
    pub common: ConversionOptions,
}

impl ImageOptions {
    /// Format the binary will produce (`jpg` when unset).
    pub fn effective_format(&self) -> ImageFormat {
        self.format.unwrap_or_default()
    }
}

pub static IMAGE_OPTIONS: &[OptionSpec<ImageOptions>] = &[
    OptionSpec::scalar("width", "--width", |o| o.width.map(|v| v.to_string())),
    OptionSpec::scalar("height", "--height", |o| o.height.map(|v| v.to_string())),
    OptionSpec::scalar("format", "-f", |o| o.format.map(|v| v.to_string())),
    OptionSpec::scalar("quality", "--quality", |o| o.quality.map(|v| v.to_string())),
];

impl ToArguments for ImageOptions {
    fn to_arguments(&self) -> Arguments {
        let mut args = serialize(IMAGE_OPTIONS, self);
        args.extend(self.common.to_arguments());
        args
    }
}
