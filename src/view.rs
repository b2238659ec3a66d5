//! View rendering collaborator.
//!
//! Turning a view plus model into HTML belongs to the host web framework.
//! The pipeline only depends on the [`ViewRenderer`] trait; hosts plug in
//! their own template engine. [`FileViewRenderer`] is a small stand-alone
//! implementation serving `.html` files with `{{ placeholder }}` fill-in,
//! enough for the CLI and for tests.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").unwrap());

/// Failure reported by a [`ViewRenderer`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// No view with that name exists in any search location.
    #[error("view '{view}' not found ({} locations searched)", .searched.len())]
    NotFound { view: String, searched: Vec<String> },

    /// The view exists but could not be rendered.
    #[error("{0}")]
    Render(String),
}

/// Renders a named view with a model into an HTML document.
#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render(&self, view: &str, model: &serde_json::Value) -> Result<String, ViewError>;
}

/// Serves `<dir>/<view>.html` from a list of search directories.
///
/// Lookup mirrors the usual two-step view resolution: a name that already
/// carries an `.html`/`.htm` extension is first tried as a path relative to
/// the first search directory, then every directory is searched for
/// `<view>.html`. When nothing matches, [`ViewError::NotFound`] lists every
/// path that was tried.
#[derive(Debug, Clone)]
pub struct FileViewRenderer {
    search_dirs: Vec<PathBuf>,
}

impl FileViewRenderer {
    pub fn new<I, P>(search_dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_dirs: search_dirs.into_iter().map(Into::into).collect(),
        }
    }

    fn candidates(&self, view: &str) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let has_ext = Path::new(view)
            .extension()
            .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
            .unwrap_or(false);

        if has_ext {
            if let Some(root) = self.search_dirs.first() {
                out.push(root.join(view));
            }
        }
        for dir in &self.search_dirs {
            out.push(dir.join(format!("{view}.html")));
        }
        out
    }
}

#[async_trait]
impl ViewRenderer for FileViewRenderer {
    async fn render(&self, view: &str, model: &serde_json::Value) -> Result<String, ViewError> {
        let candidates = self.candidates(view);
        for path in &candidates {
            match tokio::fs::read_to_string(path).await {
                Ok(template) => {
                    debug!("View '{}' resolved to {}", view, path.display());
                    return Ok(fill_placeholders(&template, model));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(ViewError::Render(format!(
                        "failed to read {}: {e}",
                        path.display()
                    )))
                }
            }
        }
        Err(ViewError::NotFound {
            view: view.to_string(),
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        })
    }
}

/// Replace `{{ a.b }}` with the HTML-escaped model value at that path.
/// Unknown paths render as the empty string.
fn fill_placeholders(template: &str, model: &serde_json::Value) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let pointer = format!("/{}", caps[1].replace('.', "/"));
            match model.pointer(&pointer) {
                Some(serde_json::Value::String(s)) => escape_html(s),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => escape_html(&other.to_string()),
            }
        })
        .into_owned()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholders_are_filled_and_escaped() {
        let model = json!({ "customer": { "name": "Ann & Co" }, "total": 42 });
        let out = fill_placeholders(
            "<p>{{ customer.name }}</p><b>{{total}}</b><i>{{ missing }}</i>",
            &model,
        );
        assert_eq!(out, "<p>Ann &amp; Co</p><b>42</b><i></i>");
    }

    #[tokio::test]
    async fn renders_from_second_search_dir() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        tokio::fs::write(b.path().join("Invoice.html"), "<h1>{{ id }}</h1>")
            .await
            .unwrap();

        let renderer = FileViewRenderer::new([a.path(), b.path()]);
        let html = renderer.render("Invoice", &json!({ "id": 7 })).await.unwrap();
        assert_eq!(html, "<h1>7</h1>");
    }

    #[tokio::test]
    async fn explicit_file_name_is_tried_first() {
        let a = tempfile::tempdir().unwrap();
        tokio::fs::write(a.path().join("raw.htm"), "<p>raw</p>")
            .await
            .unwrap();
        let renderer = FileViewRenderer::new([a.path()]);
        let html = renderer.render("raw.htm", &json!({})).await.unwrap();
        assert_eq!(html, "<p>raw</p>");
    }

    #[tokio::test]
    async fn missing_view_lists_every_location() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let renderer = FileViewRenderer::new([a.path(), b.path()]);
        let err = renderer.render("Nope", &json!({})).await.unwrap_err();
        match err {
            ViewError::NotFound { view, searched } => {
                assert_eq!(view, "Nope");
                assert_eq!(searched.len(), 2);
                assert!(searched[0].ends_with("Nope.html"));
                assert!(searched[1].starts_with(&b.path().display().to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
