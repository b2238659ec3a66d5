//! Renderer configuration.
//!
//! Everything a [`crate::Renderer`] needs is fixed once, at startup, in a
//! [`RendererConfig`] built via [`RendererConfig::builder`]. Building also
//! resolves the binary directory, so a missing installation fails the
//! process early instead of failing the first request.
//!
//! # Example
//! ```rust,no_run
//! use edgequake_html2pdf::RendererConfig;
//!
//! let config = RendererConfig::builder()
//!     .binary_dir("/opt/wkhtmltopdf/bin")
//!     .timeout_secs(30)
//!     .max_concurrent_invocations(4)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::RenderError;
use crate::pipeline::auth::DEFAULT_AUTH_COOKIE;
use crate::progress::SharedObserver;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wkhtml_locate::{BinaryDir, BinaryKind, Environment, LocateOptions};

/// Default bound on a single binary invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Immutable renderer configuration.
#[derive(Clone)]
pub struct RendererConfig {
    /// Verified directory holding `wkhtmltopdf` and `wkhtmltoimage`.
    pub binary_dir: BinaryDir,

    /// Upper bound on one invocation, in seconds. Default: 60.
    ///
    /// A binary stuck on an unreachable asset would otherwise hold the
    /// request open indefinitely. On expiry the child process is killed.
    pub timeout_secs: u64,

    /// Name of the inbound cookie replayed to the binary. Default: `.ASPXAUTH`.
    /// An empty name disables propagation.
    pub auth_cookie_name: String,

    /// Maximum number of binaries running at once. Default: unbounded.
    pub max_concurrent_invocations: Option<usize>,

    /// Receives invocation events.
    pub observer: Option<SharedObserver>,
}

impl fmt::Debug for RendererConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfig")
            .field("binary_dir", &self.binary_dir.path())
            .field("timeout_secs", &self.timeout_secs)
            .field("auth_cookie_name", &self.auth_cookie_name)
            .field("max_concurrent_invocations", &self.max_concurrent_invocations)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn RenderObserver>"))
            .finish()
    }
}

impl RendererConfig {
    pub fn builder() -> RendererConfigBuilder {
        RendererConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full path of the executable of `kind`.
    pub fn binary_path(&self, kind: BinaryKind) -> PathBuf {
        self.binary_dir.binary(kind)
    }
}

/// Builder for [`RendererConfig`].
pub struct RendererConfigBuilder {
    locate: LocateOptions,
    timeout_secs: u64,
    auth_cookie_name: String,
    max_concurrent_invocations: Option<usize>,
    observer: Option<SharedObserver>,
}

impl Default for RendererConfigBuilder {
    fn default() -> Self {
        Self {
            locate: LocateOptions::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth_cookie_name: DEFAULT_AUTH_COOKIE.to_string(),
            max_concurrent_invocations: None,
            observer: None,
        }
    }
}

impl fmt::Debug for RendererConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfigBuilder")
            .field("locate", &self.locate)
            .field("timeout_secs", &self.timeout_secs)
            .field("auth_cookie_name", &self.auth_cookie_name)
            .field("max_concurrent_invocations", &self.max_concurrent_invocations)
            .finish_non_exhaustive()
    }
}

impl RendererConfigBuilder {
    /// Use this directory and skip every other search location.
    pub fn binary_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.locate.explicit_dir = Some(dir.into());
        self
    }

    /// Web root searched for `wkhtml/` in production.
    pub fn web_root(mut self, root: impl AsRef<Path>) -> Self {
        self.locate.web_root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.locate.environment = environment;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn auth_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.auth_cookie_name = name.into();
        self
    }

    pub fn max_concurrent_invocations(mut self, n: usize) -> Self {
        self.max_concurrent_invocations = Some(n);
        self
    }

    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate and resolve the binary directory.
    pub fn build(self) -> Result<RendererConfig, RenderError> {
        if self.timeout_secs == 0 {
            return Err(RenderError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        if self.max_concurrent_invocations == Some(0) {
            return Err(RenderError::InvalidConfig(
                "Concurrent invocation limit must be ≥ 1".into(),
            ));
        }
        if self.auth_cookie_name.contains([';', '=', ' ']) {
            return Err(RenderError::InvalidConfig(format!(
                "Invalid auth cookie name '{}'",
                self.auth_cookie_name
            )));
        }

        let binary_dir = wkhtml_locate::locate(&self.locate)?;

        Ok(RendererConfig {
            binary_dir,
            timeout_secs: self.timeout_secs,
            auth_cookie_name: self.auth_cookie_name,
            max_concurrent_invocations: self.max_concurrent_invocations,
            observer: self.observer,
        })
    }
}
