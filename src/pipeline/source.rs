//! Source production: the positional argument and optional stdin payload.
//!
//! All request variants share one pipeline and differ only here:
//!
//! | Variant | Positional | stdin |
//! |---------|-----------|-------|
//! | [`SourceSpec::Url`]  | the URL | none |
//! | [`SourceSpec::Html`] | `-` | the document, with `<base href>` injected |
//! | [`SourceSpec::View`] | `-` | the rendered view, with `<base href>` injected |
//!
//! The injected base element makes relative links and assets resolve against
//! the scheme and host of the original request.

use crate::error::RenderError;
use crate::pipeline::auth::RequestContext;
use crate::view::{ViewError, ViewRenderer};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Positional argument telling the binary to read the document from stdin.
pub const STDIN_PLACEHOLDER: &str = "-";

static HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head>").unwrap());

/// Where the document to render comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// The binary fetches this URL itself.
    Url(String),
    /// Inline HTML supplied by the caller.
    Html(String),
    /// A named view rendered to HTML by the [`ViewRenderer`] collaborator.
    View {
        name: String,
        model: serde_json::Value,
    },
}

/// Output of [`SourceSpec::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub positional: String,
    pub stdin: Option<Vec<u8>>,
}

impl SourceSpec {
    /// Produce the positional argument and stdin payload for this source.
    ///
    /// `ctx` supplies the base URL for inline documents; without a context
    /// the HTML is passed through untouched. View sources need `views`.
    pub async fn resolve(
        &self,
        ctx: Option<&dyn RequestContext>,
        views: Option<&dyn ViewRenderer>,
    ) -> Result<ResolvedSource, RenderError> {
        let html = match self {
            SourceSpec::Url(url) => {
                return Ok(ResolvedSource {
                    positional: url.clone(),
                    stdin: None,
                })
            }
            SourceSpec::Html(html) => html.clone(),
            SourceSpec::View { name, model } => {
                let views = views.ok_or_else(|| {
                    RenderError::InvalidConfig(format!(
                        "view '{name}' requested but no view renderer is configured"
                    ))
                })?;
                debug!("Rendering view '{}'", name);
                views.render(name, model).await.map_err(|e| match e {
                    ViewError::NotFound { view, searched } => {
                        RenderError::ViewNotFound { view, searched }
                    }
                    ViewError::Render(detail) => RenderError::ViewRender(detail),
                })?
            }
        };

        let html = match ctx {
            Some(ctx) => inject_base_href(&html, &ctx.base_url()),
            None => html,
        };

        Ok(ResolvedSource {
            positional: STDIN_PLACEHOLDER.to_string(),
            stdin: Some(html.into_bytes()),
        })
    }
}

/// Insert `<base href="{base_url}" />` right after the first `<head>` tag
/// (case-insensitive). Everything else is left byte-identical; documents
/// without a `<head>` tag are returned unchanged.
pub fn inject_base_href(html: &str, base_url: &str) -> String {
    let Some(m) = HEAD_OPEN.find(html) else {
        return html.to_string();
    };
    let base = format!("<base href=\"{}\" />", base_url.replace('"', "&quot;"));
    let mut out = String::with_capacity(html.len() + base.len());
    out.push_str(&html[..m.end()]);
    out.push_str(&base);
    out.push_str(&html[m.end()..]);
    out
}
