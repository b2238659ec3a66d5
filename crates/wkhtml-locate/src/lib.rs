//! # wkhtml-locate
//!
//! Resolve the directory holding the `wkhtmltopdf` / `wkhtmltoimage`
//! executables exactly once, at process startup.
//!
//! A missing directory is a deployment problem, not a request problem, so
//! [`locate`] fails loudly with the path it tried instead of letting the
//! first render request discover it.
//!
//! ## Resolution order
//!
//! 1. [`LocateOptions::explicit_dir`]: used as-is, never falls through.
//! 2. `WKHTML_PATH` environment variable.
//! 3. [`Environment::Development`]: `<exe dir>/wwwroot/wkhtml`.
//!    [`Environment::Production`]: `<web_root>/wkhtml`.
//! 4. `<data local dir>/html2pdf/bin` (e.g. `~/.local/share/html2pdf/bin`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wkhtml_locate::{locate, BinaryKind, LocateOptions};
//!
//! let dir = locate(&LocateOptions::default()).expect("wkhtmltopdf not installed");
//! let pdf = dir.binary(BinaryKind::Pdf);
//! println!("using {}", pdf.display());
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable overriding every implicit search location.
pub const WKHTML_PATH_ENV: &str = "WKHTML_PATH";

/// Directory name searched below the web root.
pub const WEB_ROOT_SUBDIR: &str = "wkhtml";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by [`locate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// The resolved directory does not exist.
    #[error("Folder containing the wkhtmltopdf binaries not found, searched for '{}'", .searched.display())]
    DirectoryNotFound { searched: PathBuf },

    /// Production lookup needs a web root and none was configured.
    #[error("No web root configured and no data directory available to search for the wkhtmltopdf binaries")]
    NoSearchRoot,

    /// The path of the running executable could not be determined.
    #[error("Cannot determine the executable directory: {0}")]
    ExecutableDir(String),
}

// ── Options ──────────────────────────────────────────────────────────────────

/// Hosting environment, selects where the binaries are expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Binaries ship next to the executable under `wwwroot/wkhtml`.
    Development,
    /// Binaries live under the deployed web root.
    #[default]
    Production,
}

/// Inputs to [`locate`].
#[derive(Debug, Clone, Default)]
pub struct LocateOptions {
    /// Directory configured explicitly; skips every other location.
    pub explicit_dir: Option<PathBuf>,
    /// Web root of the hosting application (production layout).
    pub web_root: Option<PathBuf>,
    /// Hosting environment.
    pub environment: Environment,
}

/// Which executable to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryKind {
    /// `wkhtmltopdf`
    Pdf,
    /// `wkhtmltoimage`
    Image,
}

impl BinaryKind {
    /// Platform file name of the executable.
    pub fn file_name(self) -> &'static str {
        match (self, cfg!(windows)) {
            (BinaryKind::Pdf, false) => "wkhtmltopdf",
            (BinaryKind::Pdf, true) => "wkhtmltopdf.exe",
            (BinaryKind::Image, false) => "wkhtmltoimage",
            (BinaryKind::Image, true) => "wkhtmltoimage.exe",
        }
    }
}

/// A verified binary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDir(PathBuf);

impl BinaryDir {
    /// Wrap a directory that is already known to exist.
    ///
    /// Returns [`LocateError::DirectoryNotFound`] if it does not.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LocateError> {
        let dir = dir.into();
        if dir.is_dir() {
            Ok(Self(dir))
        } else {
            Err(LocateError::DirectoryNotFound { searched: dir })
        }
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Full path of the executable of `kind` inside this directory.
    pub fn binary(&self, kind: BinaryKind) -> PathBuf {
        self.0.join(kind.file_name())
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve the binary directory according to the resolution order above.
pub fn locate(options: &LocateOptions) -> Result<BinaryDir, LocateError> {
    let env_override = std::env::var(WKHTML_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty());
    let candidate = candidate_dir(options, env_override)?;
    BinaryDir::new(candidate)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn candidate_dir(
    options: &LocateOptions,
    env_override: Option<String>,
) -> Result<PathBuf, LocateError> {
    if let Some(dir) = &options.explicit_dir {
        return Ok(dir.clone());
    }

    if let Some(dir) = env_override {
        return Ok(PathBuf::from(dir));
    }

    match options.environment {
        Environment::Development => {
            let exe = std::env::current_exe()
                .map_err(|e| LocateError::ExecutableDir(e.to_string()))?;
            let exe_dir = exe
                .parent()
                .ok_or_else(|| LocateError::ExecutableDir(exe.display().to_string()))?;
            Ok(exe_dir.join("wwwroot").join(WEB_ROOT_SUBDIR))
        }
        Environment::Production => {
            if let Some(root) = &options.web_root {
                return Ok(root.join(WEB_ROOT_SUBDIR));
            }
            dirs::data_local_dir()
                .map(|d| d.join("html2pdf").join("bin"))
                .ok_or(LocateError::NoSearchRoot)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
