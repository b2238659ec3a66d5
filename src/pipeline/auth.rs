//! Auth propagation: replay the caller's session cookie into the binary.
//!
//! The rendering binary fetches URL sources (and the assets of inline HTML)
//! with its own HTTP client. Without the caller's session cookie those
//! fetches hit the login page instead of the document. When the inbound
//! request carries the configured auth cookie, [`auth_cookie_segment`]
//! produces one `--cookie <name> <value>` segment that is placed before the
//! serialised options.
//!
//! A missing cookie, or a context without any cookies, is not an error: it
//! simply contributes nothing.

use crate::pipeline::arguments::Segment;
use axum::http::{header, request::Parts, HeaderMap};
use std::collections::HashMap;

/// Default name of the forms-authentication cookie.
pub const DEFAULT_AUTH_COOKIE: &str = ".ASPXAUTH";

/// Switch used for the propagated cookie.
pub const COOKIE_SWITCH: &str = "--cookie";

/// What the pipeline needs from the inbound request.
pub trait RequestContext: Send + Sync {
    /// Value of the cookie called `name`, if the request carries one.
    fn cookie(&self, name: &str) -> Option<String>;

    /// `http` or `https`.
    fn scheme(&self) -> &str;

    /// Host (and port, if non-default) the request was addressed to.
    fn host(&self) -> &str;

    /// `scheme://host`, used as the `<base href>` of inline HTML.
    fn base_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.host())
    }
}

/// Build the `--cookie` segment for `cookie_name`, if present in `ctx`.
pub fn auth_cookie_segment(ctx: &dyn RequestContext, cookie_name: &str) -> Option<Segment> {
    if cookie_name.is_empty() {
        return None;
    }
    ctx.cookie(cookie_name).map(|value| Segment::Pair {
        switch: COOKIE_SWITCH,
        key: cookie_name.to_string(),
        value,
    })
}

// ── Context implementations ──────────────────────────────────────────────

/// Request context captured from an axum/`http` request.
#[derive(Debug, Clone)]
pub struct HttpRequestContext {
    scheme: String,
    host: String,
    cookies: HashMap<String, String>,
}

impl HttpRequestContext {
    /// Capture scheme, host and cookies from request parts.
    ///
    /// The scheme comes from the request URI and defaults to `http`; client
    /// supplied forwarding headers are ignored. The host comes from the `Host`
    /// header, then the URI authority, and defaults to `localhost`.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::capture(parts, false)
    }

    /// Like [`HttpRequestContext::from_parts`], but also honours
    /// `X-Forwarded-Proto`. Only use behind a proxy that overwrites it.
    pub fn from_parts_behind_proxy(parts: &Parts) -> Self {
        Self::capture(parts, true)
    }

    fn capture(parts: &Parts, trust_forwarded: bool) -> Self {
        let headers = &parts.headers;

        let forwarded = trust_forwarded
            .then(|| header_str(headers, "x-forwarded-proto"))
            .flatten()
            .and_then(|v| v.split(',').next());
        let scheme = parts
            .uri
            .scheme_str()
            .and_then(web_scheme)
            .or_else(|| forwarded.and_then(web_scheme))
            .unwrap_or("http")
            .to_string();

        let host = header_str(headers, header::HOST.as_str())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Self {
            scheme,
            host,
            cookies: parse_cookies(headers),
        }
    }
}

/// `http` or `https`, normalised; anything else is refused.
fn web_scheme(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("https") {
        Some("https")
    } else if raw.eq_ignore_ascii_case("http") {
        Some("http")
    } else {
        None
    }
}

impl RequestContext for HttpRequestContext {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Fixed context for non-HTTP callers (CLI, jobs, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticRequestContext {
    pub scheme: String,
    pub host: String,
    pub cookies: HashMap<String, String>,
}

impl StaticRequestContext {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            cookies: HashMap::new(),
        }
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }
}

impl RequestContext for StaticRequestContext {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn host(&self) -> &str {
        &self.host
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Parse every `Cookie` header into a name → value map. First value wins.
fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    cookies
                        .entry(name.to_string())
                        .or_insert_with(|| value.trim().trim_matches('"').to_string());
                }
            }
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)], uri: &str) -> Parts {
        let mut builder = Request::builder().uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn segment_for_present_cookie() {
        let ctx = StaticRequestContext::new("https", "example.com").with_cookie("auth", "token123");
        let segment = auth_cookie_segment(&ctx, "auth").unwrap();
        assert_eq!(segment.to_string(), "--cookie auth token123");
    }

    #[test]
    fn missing_cookie_contributes_nothing() {
        let ctx = StaticRequestContext::new("https", "example.com").with_cookie("other", "x");
        assert!(auth_cookie_segment(&ctx, "auth").is_none());
    }

    #[test]
    fn empty_cookie_store_contributes_nothing() {
        let ctx = StaticRequestContext::default();
        assert!(auth_cookie_segment(&ctx, DEFAULT_AUTH_COOKIE).is_none());
    }

    #[test]
    fn http_context_parses_cookie_header() {
        let parts = parts_with(
            &[("host", "app.local:8080"), ("cookie", "a=1; .ASPXAUTH=abc; b=\"2\"")],
            "/report",
        );
        let ctx = HttpRequestContext::from_parts(&parts);
        assert_eq!(ctx.cookie(".ASPXAUTH").as_deref(), Some("abc"));
        assert_eq!(ctx.cookie("b").as_deref(), Some("2"));
        assert_eq!(ctx.cookie("missing"), None);
        assert_eq!(ctx.base_url(), "http://app.local:8080");
    }

    #[test]
    fn forwarded_proto_ignored_unless_trusted() {
        let parts = parts_with(
            &[("host", "secure.example"), ("x-forwarded-proto", "https")],
            "/",
        );
        assert_eq!(
            HttpRequestContext::from_parts(&parts).base_url(),
            "http://secure.example"
        );
        assert_eq!(
            HttpRequestContext::from_parts_behind_proxy(&parts).base_url(),
            "https://secure.example"
        );
    }

    #[test]
    fn forwarded_proto_takes_first_hop() {
        let parts = parts_with(
            &[("host", "secure.example"), ("x-forwarded-proto", "HTTPS, http")],
            "/",
        );
        let ctx = HttpRequestContext::from_parts_behind_proxy(&parts);
        assert_eq!(ctx.scheme(), "https");
    }

    #[test]
    fn spoofed_forwarded_scheme_is_refused() {
        for spoofed in ["file", "javascript", "ftp"] {
            let parts = parts_with(
                &[("host", "app.example"), ("x-forwarded-proto", spoofed)],
                "/",
            );
            let trusted = HttpRequestContext::from_parts_behind_proxy(&parts);
            assert_eq!(trusted.base_url(), "http://app.example", "{spoofed}");
            let untrusted = HttpRequestContext::from_parts(&parts);
            assert_eq!(untrusted.base_url(), "http://app.example", "{spoofed}");
        }
    }

    #[test]
    fn http_context_without_cookies() {
        let parts = parts_with(&[], "https://example.com/x");
        let ctx = HttpRequestContext::from_parts(&parts);
        assert_eq!(ctx.cookie(DEFAULT_AUTH_COOKIE), None);
        assert_eq!(ctx.base_url(), "https://example.com");
    }
}
