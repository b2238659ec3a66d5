//! Response writing: deliver rendered bytes over HTTP or to disk.
//!
//! The response carries the policy's content type and, only when a
//! non-empty file name is configured, a `Content-Disposition` header whose
//! filename has every path-invalid character replaced by `_`.
//!
//! Saving to disk follows a boolean contract: an absent or malformed target
//! path writes nothing and returns `false`; it never raises.

use crate::error::RenderError;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Characters invalid in a file name or path on any supported platform:
/// control characters and DEL plus `" < > | : * ? \ /`. Runs collapse to
/// one `_`.
static RE_INVALID_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\x00-\x1F\x7F"<>|:*?\\/]+"#).unwrap());

/// How the browser should present the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Display in the browser.
    #[default]
    Inline,
    /// Offer as a download.
    Attachment,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// Drives the response only; has no effect on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub content_type: String,
    pub file_name: Option<String>,
    pub disposition: Disposition,
}

impl ResponsePolicy {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            file_name: None,
            disposition: Disposition::default(),
        }
    }

    pub fn pdf() -> Self {
        Self::new(PDF_CONTENT_TYPE)
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// `Content-Disposition` value, or `None` when no file name is set.
    pub fn content_disposition(&self) -> Option<String> {
        let name = self.file_name.as_deref().filter(|n| !n.is_empty())?;
        Some(format!(
            "{}; filename=\"{}\"",
            self.disposition.as_str(),
            sanitize_file_name(name)
        ))
    }
}

/// Replace every run of path-invalid characters with a single `_`.
///
/// Idempotent: sanitising an already sanitised name returns it unchanged.
pub fn sanitize_file_name(name: &str) -> String {
    RE_INVALID_FILE_CHARS.replace_all(name, "_").into_owned()
}

/// Build the full HTTP response for `bytes` under `policy`.
pub fn build_response(bytes: Bytes, policy: &ResponsePolicy) -> Result<Response, RenderError> {
    let content_type = HeaderValue::from_str(&policy.content_type)
        .map_err(|e| RenderError::ResponseBuild(format!("content type: {e}")))?;
    let length = HeaderValue::from(bytes.len());

    let disposition = policy
        .content_disposition()
        .map(|v| {
            HeaderValue::from_bytes(v.as_bytes())
                .map_err(|e| RenderError::ResponseBuild(format!("content disposition: {e}")))
        })
        .transpose()?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, length);
    if let Some(value) = disposition {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// Rendered bytes plus the policy to deliver them with.
///
/// Returned from axum handlers directly; a header that cannot be encoded
/// turns into a `500`.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Bytes,
    pub policy: ResponsePolicy,
}

impl IntoResponse for RenderedDocument {
    fn into_response(self) -> Response {
        match build_response(self.bytes, &self.policy) {
            Ok(response) => response,
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

/// Interpret `raw` as a file-system path or a `file:` URI.
///
/// Rejected: empty/blank strings, strings with control characters, URIs
/// with a scheme other than `file`, and `file:` URIs that do not map to a
/// local path. Single-letter schemes are treated as Windows drive letters.
pub fn parse_save_path(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() || raw.chars().any(char::is_control) {
        return None;
    }
    match url::Url::parse(raw) {
        Ok(parsed) if parsed.scheme().len() > 1 => {
            if parsed.scheme() == "file" {
                parsed.to_file_path().ok()
            } else {
                None
            }
        }
        _ => Some(PathBuf::from(raw)),
    }
}

/// Write `bytes` to `path`, overwriting any existing file.
///
/// Returns `false` without writing when `path` is absent or malformed, and
/// `false` when the write itself fails. The write is not atomic.
pub async fn save_bytes_to_path(path: Option<&str>, bytes: &[u8]) -> bool {
    let Some(target) = path.and_then(parse_save_path) else {
        warn!("Ignoring save request: missing or malformed path {:?}", path);
        return false;
    };

    match tokio::fs::write(&target, bytes).await {
        Ok(()) => {
            debug!("Saved {} bytes to {}", bytes.len(), target.display());
            true
        }
        Err(e) => {
            warn!("Failed to save to {}: {}", target.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_file_name("a/b:c*.pdf"), "a_b_c_.pdf");
        assert_eq!(sanitize_file_name("q?<x>|\"y\".pdf"), "q_x_y_.pdf");
        assert_eq!(sanitize_file_name("tab\there.pdf"), "tab_here.pdf");
        assert_eq!(sanitize_file_name("report 2024.pdf"), "report 2024.pdf");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for name in ["a/b:c*.pdf", "..\\..\\etc", "ok.pdf", "::", "élan/vital.pdf"] {
            let once = sanitize_file_name(name);
            assert_eq!(sanitize_file_name(&once), once, "{name}");
            assert!(!once.contains(['/', '\\', ':', '*']));
        }
    }

    #[test]
    fn disposition_only_with_non_empty_name() {
        assert_eq!(ResponsePolicy::pdf().content_disposition(), None);
        assert_eq!(ResponsePolicy::pdf().file_name("").content_disposition(), None);
        assert_eq!(
            ResponsePolicy::pdf()
                .file_name("a/b.pdf")
                .disposition(Disposition::Attachment)
                .content_disposition()
                .as_deref(),
            Some("attachment; filename=\"a_b.pdf\"")
        );
        assert_eq!(
            ResponsePolicy::pdf()
                .file_name("x.pdf")
                .content_disposition()
                .as_deref(),
            Some("inline; filename=\"x.pdf\"")
        );
    }

    #[test]
    fn response_headers_and_body() {
        let policy = ResponsePolicy::pdf()
            .file_name("Q1:report.pdf")
            .disposition(Disposition::Attachment);
        let response = build_response(Bytes::from_static(b"%PDF-1.4"), &policy).unwrap();
        let headers = response.headers();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::CONTENT_LENGTH], "8");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Q1_report.pdf\""
        );
    }

    #[test]
    fn delete_character_in_file_name_still_builds_a_response() {
        let policy = ResponsePolicy::pdf().file_name("draft\u{7f}\u{7f}v2.pdf");
        let response = build_response(Bytes::from_static(b"%PDF"), &policy).unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"draft_v2.pdf\""
        );
        assert_eq!(
            RenderedDocument {
                bytes: Bytes::from_static(b"%PDF"),
                policy,
            }
            .into_response()
            .status(),
            StatusCode::OK
        );
    }

    #[test]
    fn response_without_file_name_has_no_disposition() {
        let response = build_response(Bytes::new(), &ResponsePolicy::new("image/png")).unwrap();
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[test]
    fn invalid_content_type_is_an_error() {
        let err = build_response(Bytes::new(), &ResponsePolicy::new("bad\ntype")).unwrap_err();
        assert!(matches!(err, RenderError::ResponseBuild(_)));
    }

    #[test]
    fn save_path_parsing() {
        assert_eq!(parse_save_path("out/report.pdf"), Some(PathBuf::from("out/report.pdf")));
        assert_eq!(parse_save_path("   "), None);
        assert_eq!(parse_save_path("bad\0path"), None);
        assert_eq!(parse_save_path("https://example.com/x.pdf"), None);
        #[cfg(unix)]
        assert_eq!(
            parse_save_path("file:///tmp/r.pdf"),
            Some(PathBuf::from("/tmp/r.pdf"))
        );
    }

    #[tokio::test]
    async fn save_none_writes_nothing() {
        assert!(!save_bytes_to_path(None, b"data").await);
    }

    #[tokio::test]
    async fn save_writes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let path_str = path.to_str().unwrap();
        assert!(save_bytes_to_path(Some(path_str), b"%PDF-1.7\n\x00\xff").await);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7\n\x00\xff");
    }

    #[tokio::test]
    async fn save_into_missing_directory_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pdf");
        assert!(!save_bytes_to_path(Some(path.to_str().unwrap()), b"x").await);
    }
}
