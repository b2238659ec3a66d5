//! Error types for the edgequake-html2pdf library.
//!
//! Every failure that reaches a caller is a [`RenderError`] and is fatal to
//! the current request only. Two absence cases are deliberately *not* errors:
//!
//! * an option with no value contributes nothing to the command line;
//! * a missing auth cookie contributes no `--cookie` segment.
//!
//! Saving to a malformed path is reported as `false` from
//! [`crate::pipeline::respond::save_bytes_to_path`] rather than as an error.

use std::time::Duration;
use thiserror::Error;
use wkhtml_locate::LocateError;

/// All errors returned by the edgequake-html2pdf library.
#[derive(Debug, Error)]
pub enum RenderError {
    // ── Driver errors ─────────────────────────────────────────────────────
    /// The rendering binary exited with a non-zero status, or could not be
    /// started at all (`exit_code` is `None` then).
    #[error("Rendering binary failed (exit code {}): {stderr}", display_exit_code(.exit_code))]
    DriverFailure {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The rendering binary did not finish within the configured bound.
    #[error("Rendering binary timed out after {}\nIncrease the timeout or simplify the page.", display_duration(.timeout))]
    Timeout { timeout: Duration },

    // ── Argument errors ───────────────────────────────────────────────────
    /// The raw switch passthrough could not be split into arguments.
    #[error("Invalid custom switches '{raw}': {reason}")]
    InvalidSwitches { raw: String, reason: String },

    // ── View errors ───────────────────────────────────────────────────────
    /// The view collaborator could not find the requested view.
    #[error("Unable to find view '{view}'. The following locations were searched:\n{}", .searched.join("\n"))]
    ViewNotFound { view: String, searched: Vec<String> },

    /// The view was found but rendering it to HTML failed.
    #[error("View rendering failed: {0}")]
    ViewRender(String),

    // ── Startup / config errors ───────────────────────────────────────────
    /// The binary directory could not be resolved at startup.
    #[error(transparent)]
    BinaryNotFound(#[from] LocateError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Response errors ───────────────────────────────────────────────────
    /// A header value could not be encoded into the HTTP response.
    #[error("Failed to build response: {0}")]
    ResponseBuild(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_duration(d: &Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none".to_string(),
    }
}
