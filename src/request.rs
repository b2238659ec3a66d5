//! One conversion request: what to render, how, and how to deliver it.
//!
//! A [`RenderRequest`] is immutable once built. The source decides the
//! positional argument, the format options decide the switches and which
//! binary runs, and the [`ResponsePolicy`] only affects delivery.
//!
//! ```rust
//! use edgequake_html2pdf::{Disposition, RenderRequest};
//! use edgequake_html2pdf::options::{PageSize, PdfOptions};
//!
//! let request = RenderRequest::pdf_from_url("https://example.com/invoice/42")
//!     .with_pdf_options(PdfOptions {
//!         page_size: Some(PageSize::A4),
//!         ..Default::default()
//!     })
//!     .file_name("invoice-42.pdf")
//!     .disposition(Disposition::Attachment);
//! assert_eq!(request.policy().content_type, "application/pdf");
//! ```

use crate::options::{ImageOptions, PdfOptions};
use crate::pipeline::arguments::{Arguments, ToArguments};
use crate::pipeline::respond::{Disposition, ResponsePolicy, PDF_CONTENT_TYPE};
use crate::pipeline::source::SourceSpec;
use wkhtml_locate::BinaryKind;

/// Options for the chosen output format.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatOptions {
    Pdf(PdfOptions),
    Image(ImageOptions),
}

impl FormatOptions {
    /// Which binary renders this format.
    pub fn binary_kind(&self) -> BinaryKind {
        match self {
            FormatOptions::Pdf(_) => BinaryKind::Pdf,
            FormatOptions::Image(_) => BinaryKind::Image,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FormatOptions::Pdf(_) => PDF_CONTENT_TYPE,
            FormatOptions::Image(options) => options.effective_format().content_type(),
        }
    }
}

impl ToArguments for FormatOptions {
    fn to_arguments(&self) -> Arguments {
        match self {
            FormatOptions::Pdf(options) => options.to_arguments(),
            FormatOptions::Image(options) => options.to_arguments(),
        }
    }
}

/// A complete conversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    source: SourceSpec,
    format: FormatOptions,
    policy: ResponsePolicy,
}

impl RenderRequest {
    /// Request with the given source and format. The content type follows
    /// the format.
    pub fn new(source: SourceSpec, format: FormatOptions) -> Self {
        let policy = ResponsePolicy::new(format.content_type());
        Self {
            source,
            format,
            policy,
        }
    }

    // ── PDF constructors ──────────────────────────────────────────────────

    pub fn pdf_from_url(url: impl Into<String>) -> Self {
        Self::new(SourceSpec::Url(url.into()), FormatOptions::Pdf(PdfOptions::default()))
    }

    pub fn pdf_from_html(html: impl Into<String>) -> Self {
        Self::new(SourceSpec::Html(html.into()), FormatOptions::Pdf(PdfOptions::default()))
    }

    pub fn pdf_from_view(name: impl Into<String>, model: serde_json::Value) -> Self {
        Self::new(
            SourceSpec::View {
                name: name.into(),
                model,
            },
            FormatOptions::Pdf(PdfOptions::default()),
        )
    }

    // ── Image constructors ────────────────────────────────────────────────

    pub fn image_from_url(url: impl Into<String>) -> Self {
        Self::new(
            SourceSpec::Url(url.into()),
            FormatOptions::Image(ImageOptions::default()),
        )
    }

    pub fn image_from_html(html: impl Into<String>) -> Self {
        Self::new(
            SourceSpec::Html(html.into()),
            FormatOptions::Image(ImageOptions::default()),
        )
    }

    pub fn image_from_view(name: impl Into<String>, model: serde_json::Value) -> Self {
        Self::new(
            SourceSpec::View {
                name: name.into(),
                model,
            },
            FormatOptions::Image(ImageOptions::default()),
        )
    }

    // ── Refinement ────────────────────────────────────────────────────────

    /// Replace the format with PDF `options`.
    pub fn with_pdf_options(self, options: PdfOptions) -> Self {
        self.with_format(FormatOptions::Pdf(options))
    }

    /// Replace the format with image `options`.
    pub fn with_image_options(self, options: ImageOptions) -> Self {
        self.with_format(FormatOptions::Image(options))
    }

    /// Replace the format; the content type is recomputed.
    pub fn with_format(mut self, format: FormatOptions) -> Self {
        self.policy.content_type = format.content_type().to_string();
        self.format = format;
        self
    }

    /// File name offered in `Content-Disposition`.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.policy = self.policy.file_name(name);
        self
    }

    pub fn disposition(mut self, disposition: Disposition) -> Self {
        self.policy = self.policy.disposition(disposition);
        self
    }

    /// Override the response content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.policy.content_type = content_type.into();
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn source(&self) -> &SourceSpec {
        &self.source
    }

    pub fn format(&self) -> &FormatOptions {
        &self.format
    }

    pub fn policy(&self) -> &ResponsePolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ConversionOptions, ImageFormat};

    #[test]
    fn pdf_request_defaults() {
        let r = RenderRequest::pdf_from_html("<html></html>");
        assert_eq!(r.policy().content_type, "application/pdf");
        assert_eq!(r.policy().file_name, None);
        assert_eq!(r.policy().disposition, Disposition::Inline);
        assert_eq!(r.format().binary_kind(), BinaryKind::Pdf);
        assert!(r.format().to_arguments().is_empty());
    }

    #[test]
    fn image_content_type_follows_format() {
        let r = RenderRequest::image_from_url("http://x").with_image_options(ImageOptions {
            format: Some(ImageFormat::Png),
            ..Default::default()
        });
        assert_eq!(r.policy().content_type, "image/png");
        assert_eq!(r.format().binary_kind(), BinaryKind::Image);
        assert_eq!(r.format().to_arguments().to_command_line(), "-f png");
    }

    #[test]
    fn switching_format_keeps_file_name() {
        let r = RenderRequest::image_from_url("http://x")
            .file_name("shot.jpg")
            .with_pdf_options(PdfOptions {
                common: ConversionOptions {
                    disable_javascript: true,
                    ..Default::default()
                },
                ..Default::default()
            });
        assert_eq!(r.policy().content_type, "application/pdf");
        assert_eq!(r.policy().file_name.as_deref(), Some("shot.jpg"));
        assert_eq!(r.format().to_arguments().to_command_line(), "-n");
    }

    #[test]
    fn explicit_content_type_override() {
        let r = RenderRequest::pdf_from_url("http://x").content_type("application/x-pdf");
        assert_eq!(r.policy().content_type, "application/x-pdf");
    }
}
