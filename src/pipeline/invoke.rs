//! Conversion invoker: run the rendering binary once, bounded by a timeout.
//!
//! ## Lifecycle
//!
//! ```text
//! Built ──▶ Invoking ──▶ Succeeded   (exit 0, stdout returned as-is)
//!                   └──▶ Failed      (non-zero exit, spawn/pipe error, timeout)
//! ```
//!
//! `Failed` is terminal. Failures from the binary are almost always
//! deterministic for a given input (bad URL, bad switch), so nothing is
//! retried here; callers that want retries wrap [`Invoker::run`] themselves.
//!
//! ## Why a `Driver` trait?
//!
//! The binary is an opaque collaborator. [`ProcessDriver`] spawns it with a
//! direct argv (no shell); tests and hosts with a different execution model
//! (remote render farm, sandbox) plug in their own [`Driver`].

use crate::error::RenderError;
use crate::pipeline::arguments::{Arguments, Segment};
use crate::pipeline::source::ResolvedSource;
use crate::progress::RenderObserver;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Maximum number of stderr bytes kept in [`RenderError::DriverFailure`].
pub const STDERR_EXCERPT_BYTES: usize = 2048;

// ── Driver boundary ──────────────────────────────────────────────────────

/// Everything the binary produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

/// Executes the rendering binary.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn invoke(
        &self,
        program: &Path,
        argv: &[String],
        stdin: Option<Vec<u8>>,
    ) -> std::io::Result<DriverOutput>;
}

/// Spawns the binary as a child process.
///
/// The child is killed when the future is dropped, which is what makes the
/// timeout in [`Invoker::run`] actually stop the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessDriver;

#[async_trait]
impl Driver for ProcessDriver {
    async fn invoke(
        &self,
        program: &Path,
        argv: &[String],
        stdin: Option<Vec<u8>>,
    ) -> std::io::Result<DriverOutput> {
        let mut child = Command::new(program)
            .args(argv)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let pipe = child.stdin.take();
        // Feed stdin while draining stdout/stderr; writing first could
        // deadlock once the child fills its output pipe.
        let feed = async move {
            if let (Some(mut pipe), Some(bytes)) = (pipe, stdin) {
                match pipe.write_all(&bytes).await {
                    Ok(()) => pipe.shutdown().await,
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                    Err(e) => Err(e),
                }
            } else {
                Ok(())
            }
        };

        // A binary that exits before reading all of stdin reports that through
        // its exit status; any other write error means the document was cut.
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        Ok(DriverOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }
}

// ── Invocation ───────────────────────────────────────────────────────────

/// Lifecycle state, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Built,
    Invoking,
    Succeeded,
    Failed,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvocationState::Built => "built",
            InvocationState::Invoking => "invoking",
            InvocationState::Succeeded => "succeeded",
            InvocationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A fully composed call to the binary. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    arguments: Arguments,
    positional: String,
    stdin: Option<Vec<u8>>,
}

impl Invocation {
    /// Compose auth segment, options and source, in that order.
    pub fn compose(
        program: impl Into<PathBuf>,
        auth: Option<Segment>,
        options: Arguments,
        source: ResolvedSource,
    ) -> Self {
        let mut arguments = Arguments::new();
        if let Some(segment) = auth {
            arguments.push(segment);
        }
        arguments.extend(options);
        Self {
            program: program.into(),
            arguments,
            positional: source.positional,
            stdin: source.stdin,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn positional(&self) -> &str {
        &self.positional
    }

    pub fn stdin(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    /// Switches followed by the positional source, as a single string.
    pub fn command_line(&self) -> String {
        format!("{} {}", self.arguments.to_command_line(), self.positional)
            .trim()
            .to_string()
    }

    /// Process argv: switches followed by the positional source.
    pub fn argv(&self) -> Result<Vec<String>, RenderError> {
        let mut argv = self.arguments.to_argv()?;
        argv.push(self.positional.clone());
        Ok(argv)
    }

    fn log_line(&self) -> String {
        format!("{} {}", self.arguments.redacted(), self.positional)
            .trim()
            .to_string()
    }
}

// ── Invoker ──────────────────────────────────────────────────────────────

/// Runs [`Invocation`]s through a [`Driver`] with a timeout and an optional
/// concurrency limiter.
#[derive(Clone)]
pub struct Invoker {
    driver: Arc<dyn Driver>,
    timeout: Duration,
    limiter: Option<Arc<Semaphore>>,
    observer: Option<Arc<dyn RenderObserver>>,
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("driver", &"<dyn Driver>")
            .field("timeout", &self.timeout)
            .field(
                "limiter",
                &self.limiter.as_ref().map(|s| s.available_permits()),
            )
            .field("observer", &self.observer.as_ref().map(|_| "<dyn RenderObserver>"))
            .finish()
    }
}

impl Invoker {
    pub fn new(driver: Arc<dyn Driver>, timeout: Duration) -> Self {
        Self {
            driver,
            timeout,
            limiter: None,
            observer: None,
        }
    }

    /// Swap the driver, keeping timeout, limiter and observer.
    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.driver = driver;
        self
    }

    /// Bound the number of concurrently running binaries.
    ///
    /// Waiting for a permit is not counted against the timeout.
    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RenderObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the invocation and return stdout exactly as produced.
    pub async fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, RenderError> {
        debug!(
            state = %InvocationState::Built,
            "{} {}",
            invocation.program.display(),
            invocation.log_line()
        );

        let argv = match invocation.argv() {
            Ok(argv) => argv,
            Err(e) => {
                warn!(state = %InvocationState::Failed, "{}", e);
                if let Some(obs) = &self.observer {
                    obs.on_invoke_failed(&e);
                }
                return Err(e);
            }
        };

        let _permit = match &self.limiter {
            Some(limiter) => Some(
                Arc::clone(limiter)
                    .acquire_owned()
                    .await
                    .map_err(|e| RenderError::Internal(format!("limiter closed: {e}")))?,
            ),
            None => None,
        };

        if let Some(obs) = &self.observer {
            obs.on_invoke_start(&invocation.program, argv.len());
        }
        debug!(state = %InvocationState::Invoking, "argc={}", argv.len());

        let start = Instant::now();
        let call = self.driver.invoke(
            &invocation.program,
            &argv,
            invocation.stdin.clone(),
        );
        let result = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(RenderError::Timeout {
                timeout: self.timeout,
            }),
            Ok(Err(e)) => Err(RenderError::DriverFailure {
                exit_code: None,
                stderr: format!("{}: {e}", invocation.program.display()),
            }),
            Ok(Ok(output)) if output.exit_code == Some(0) => Ok(output.stdout),
            Ok(Ok(output)) => Err(RenderError::DriverFailure {
                exit_code: output.exit_code,
                stderr: stderr_excerpt(&output.stderr),
            }),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(bytes) => {
                info!(
                    state = %InvocationState::Succeeded,
                    "Rendered {} bytes in {}ms",
                    bytes.len(),
                    elapsed_ms
                );
                if let Some(obs) = &self.observer {
                    obs.on_invoke_complete(bytes.len(), elapsed_ms);
                }
            }
            Err(e) => {
                warn!(state = %InvocationState::Failed, "Render failed after {}ms: {}", elapsed_ms, e);
                if let Some(obs) = &self.observer {
                    obs.on_invoke_failed(e);
                }
            }
        }

        result
    }
}

/// Lossy UTF-8 of the first [`STDERR_EXCERPT_BYTES`] bytes, trimmed.
fn stderr_excerpt(stderr: &[u8]) -> String {
    let cut = stderr.len().min(STDERR_EXCERPT_BYTES);
    String::from_utf8_lossy(&stderr[..cut]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::STDIN_PLACEHOLDER;

    fn url_source(url: &str) -> ResolvedSource {
        ResolvedSource {
            positional: url.to_string(),
            stdin: None,
        }
    }

    #[test]
    fn compose_puts_auth_first_and_source_last() {
        let mut options = Arguments::new();
        options.push(Segment::Flag("-n"));
        let auth = Segment::Pair {
            switch: "--cookie",
            key: "auth".into(),
            value: "token123".into(),
        };
        let inv = Invocation::compose("/bin/wk", Some(auth), options, url_source("http://x/r"));
        assert_eq!(inv.command_line(), "--cookie auth token123 -n http://x/r");
        assert_eq!(
            inv.argv().unwrap(),
            vec!["--cookie", "auth", "token123", "-n", "http://x/r"]
        );
    }

    #[test]
    fn compose_without_options_is_just_the_source() {
        let source = ResolvedSource {
            positional: STDIN_PLACEHOLDER.into(),
            stdin: Some(b"<html></html>".to_vec()),
        };
        let inv = Invocation::compose("/bin/wk", None, Arguments::new(), source);
        assert_eq!(inv.command_line(), "-");
        assert_eq!(inv.stdin(), Some(&b"<html></html>"[..]));
    }

    #[test]
    fn stderr_excerpt_is_bounded() {
        let long = vec![b'x'; STDERR_EXCERPT_BYTES * 2];
        assert_eq!(stderr_excerpt(&long).len(), STDERR_EXCERPT_BYTES);
        assert_eq!(stderr_excerpt(b"  oops \n"), "oops");
    }

    #[test]
    fn log_line_hides_propagated_session_cookie() {
        let auth = Segment::Pair {
            switch: "--cookie",
            key: ".ASPXAUTH".into(),
            value: "SECRETSESSION".into(),
        };
        let inv = Invocation::compose("/bin/wk", Some(auth), Arguments::new(), url_source("http://x"));
        assert_eq!(inv.log_line(), "--cookie .ASPXAUTH *** http://x");
        assert!(inv.argv().unwrap().contains(&"SECRETSESSION".to_string()));
    }

    struct StdinWriteFails;

    #[async_trait]
    impl Driver for StdinWriteFails {
        async fn invoke(
            &self,
            _program: &Path,
            _argv: &[String],
            _stdin: Option<Vec<u8>>,
        ) -> std::io::Result<DriverOutput> {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "stdin write failed",
            ))
        }
    }

    #[tokio::test]
    async fn stdin_write_failure_is_driver_failure() {
        let invoker = Invoker::new(Arc::new(StdinWriteFails), Duration::from_secs(5));
        let source = ResolvedSource {
            positional: STDIN_PLACEHOLDER.into(),
            stdin: Some(b"<html></html>".to_vec()),
        };
        let inv = Invocation::compose("/bin/wk", None, Arguments::new(), source);
        let err = invoker.run(&inv).await.unwrap_err();
        match err {
            RenderError::DriverFailure { exit_code: None, stderr } => {
                assert!(stderr.contains("stdin write failed"), "got {stderr}");
            }
            other => panic!("expected DriverFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sub_second_timeout_is_reported_exactly() {
        struct Slow;

        #[async_trait]
        impl Driver for Slow {
            async fn invoke(
                &self,
                _program: &Path,
                _argv: &[String],
                _stdin: Option<Vec<u8>>,
            ) -> std::io::Result<DriverOutput> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(DriverOutput::default())
            }
        }

        let invoker = Invoker::new(Arc::new(Slow), Duration::from_millis(50));
        let inv = Invocation::compose("/bin/wk", None, Arguments::new(), url_source("http://x"));
        let err = invoker.run(&inv).await.unwrap_err();
        assert!(
            matches!(err, RenderError::Timeout { timeout } if timeout == Duration::from_millis(50)),
            "got {err:?}"
        );
        assert!(err.to_string().contains("50ms"));
    }

    #[tokio::test]
    async fn unbalanced_raw_switches_fail_before_spawning() {
        let driver = Arc::new(StdinWriteFails);
        let invoker = Invoker::new(driver, Duration::from_secs(5));
        let mut options = Arguments::new();
        options.push(Segment::Raw(r#"--header-left "oops"#.into()));
        let inv = Invocation::compose("/bin/wk", None, options, url_source("http://x"));
        let err = invoker.run(&inv).await.unwrap_err();
        assert!(matches!(err, RenderError::InvalidSwitches { .. }), "got {err:?}");
    }

    #[test]
    fn log_line_hides_password() {
        let mut options = Arguments::new();
        options.push(Segment::Value {
            switch: "--password",
            value: "hunter2".into(),
        });
        let inv = Invocation::compose("/bin/wk", None, options, url_source("http://x"));
        assert!(!inv.log_line().contains("hunter2"));
        assert!(inv.command_line().contains("hunter2"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_driver_pipes_stdin_to_stdout() {
        let out = ProcessDriver
            .invoke(
                Path::new("/bin/sh"),
                &["-c".to_string(), "cat".to_string()],
                Some(b"%PDF-1.4 bytes".to_vec()),
            )
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.stdout, b"%PDF-1.4 bytes");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_driver_reports_exit_code_and_stderr() {
        let out = ProcessDriver
            .invoke(
                Path::new("/bin/sh"),
                &["-c".to_string(), "echo broken >&2; exit 3".to_string()],
                None,
            )
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(String::from_utf8_lossy(&out.stderr).trim(), "broken");
    }

    #[tokio::test]
    async fn missing_binary_is_driver_failure() {
        let invoker = Invoker::new(Arc::new(ProcessDriver), Duration::from_secs(5));
        let inv = Invocation::compose(
            "/definitely/not/here/wkhtmltopdf",
            None,
            Arguments::new(),
            url_source("http://x"),
        );
        let err = invoker.run(&inv).await.unwrap_err();
        assert!(
            matches!(err, RenderError::DriverFailure { exit_code: None, .. }),
            "got {err:?}"
        );
    }
}
