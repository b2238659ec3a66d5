//! End-to-end render entry points.
//!
//! [`Renderer`] wires the pipeline stages together:
//!
//! ```text
//! RenderRequest
//!  │
//!  ├─ 1. Auth     --cookie <name> <value> from the inbound request, if present
//!  ├─ 2. Options  format table, then common table
//!  ├─ 3. Source   URL positional, or `-` + HTML on stdin (base href injected)
//!  ├─ 4. Invoke   wkhtmltopdf / wkhtmltoimage, bounded by the timeout
//!  └─ 5. Deliver  HTTP response, bytes, or file on disk
//! ```
//!
//! A `Renderer` is cheap to clone and safe to share across request handlers.

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::pipeline::arguments::ToArguments;
use crate::pipeline::auth::{auth_cookie_segment, RequestContext};
use crate::pipeline::invoke::{Driver, Invocation, Invoker, ProcessDriver};
use crate::pipeline::respond::{self, parse_save_path, RenderedDocument};
use crate::request::RenderRequest;
use crate::view::ViewRenderer;
use axum::response::Response;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Renders [`RenderRequest`]s with one fixed configuration.
#[derive(Clone)]
pub struct Renderer {
    config: Arc<RendererConfig>,
    invoker: Invoker,
    views: Option<Arc<dyn ViewRenderer>>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("invoker", &self.invoker)
            .field("views", &self.views.as_ref().map(|_| "<dyn ViewRenderer>"))
            .finish()
    }
}

impl Renderer {
    /// Renderer spawning the real binaries from `config.binary_dir`.
    pub fn new(config: RendererConfig) -> Self {
        let mut invoker = Invoker::new(Arc::new(ProcessDriver), config.timeout());
        if let Some(limit) = config.max_concurrent_invocations {
            invoker = invoker.with_limiter(Arc::new(Semaphore::new(limit)));
        }
        if let Some(observer) = &config.observer {
            invoker = invoker.with_observer(Arc::clone(observer));
        }
        Self {
            config: Arc::new(config),
            invoker,
            views: None,
        }
    }

    /// Replace the process driver (remote execution, sandboxing, tests).
    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.invoker = self.invoker.with_driver(driver);
        self
    }

    /// Share a limiter with other renderers. Overrides
    /// `max_concurrent_invocations`.
    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.invoker = self.invoker.with_limiter(limiter);
        self
    }

    /// Collaborator used for [`crate::SourceSpec::View`] sources.
    pub fn with_views(mut self, views: Arc<dyn ViewRenderer>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Compose the full invocation for `request` without running it.
    ///
    /// `ctx` is the inbound request, when there is one: it supplies the
    /// auth cookie and the base URL for inline HTML.
    pub async fn build_invocation(
        &self,
        ctx: Option<&dyn RequestContext>,
        request: &RenderRequest,
    ) -> Result<Invocation, RenderError> {
        let auth = ctx.and_then(|c| auth_cookie_segment(c, &self.config.auth_cookie_name));
        if auth.is_some() {
            debug!("Propagating auth cookie '{}'", self.config.auth_cookie_name);
        }
        let options = request.format().to_arguments();
        let source = request.source().resolve(ctx, self.views.as_deref()).await?;
        let program = self.config.binary_path(request.format().binary_kind());
        Ok(Invocation::compose(program, auth, options, source))
    }

    /// Render `request` and return the binary's output as-is.
    pub async fn render(
        &self,
        ctx: Option<&dyn RequestContext>,
        request: &RenderRequest,
    ) -> Result<Vec<u8>, RenderError> {
        let invocation = self.build_invocation(ctx, request).await?;
        self.invoker.run(&invocation).await
    }

    /// Render and pair the bytes with the request's response policy.
    ///
    /// The result implements `IntoResponse` and can be returned from an
    /// axum handler directly.
    pub async fn document(
        &self,
        ctx: Option<&dyn RequestContext>,
        request: &RenderRequest,
    ) -> Result<RenderedDocument, RenderError> {
        let bytes = self.render(ctx, request).await?;
        Ok(RenderedDocument {
            bytes: Bytes::from(bytes),
            policy: request.policy().clone(),
        })
    }

    /// Render and build the HTTP response.
    pub async fn respond(
        &self,
        ctx: Option<&dyn RequestContext>,
        request: &RenderRequest,
    ) -> Result<Response, RenderError> {
        let bytes = self.render(ctx, request).await?;
        respond::build_response(Bytes::from(bytes), request.policy())
    }

    /// Render and write the output to `path`.
    ///
    /// An absent or malformed path is checked before rendering: nothing is
    /// rendered or written and `Ok(false)` is returned. Render failures are
    /// still errors; a failed write is `Ok(false)`.
    pub async fn save_to_path(
        &self,
        ctx: Option<&dyn RequestContext>,
        request: &RenderRequest,
        path: Option<&str>,
    ) -> Result<bool, RenderError> {
        if path.and_then(parse_save_path).is_none() {
            warn!("Not rendering: save path {:?} is missing or malformed", path);
            return Ok(false);
        }
        let bytes = self.render(ctx, request).await?;
        Ok(respond::save_bytes_to_path(path, &bytes).await)
    }

    /// Render several requests, at most `concurrency` at a time.
    ///
    /// Results come back in input order; one failure does not stop the rest.
    pub async fn render_all(
        &self,
        ctx: Option<&dyn RequestContext>,
        requests: &[RenderRequest],
        concurrency: usize,
    ) -> Vec<Result<Vec<u8>, RenderError>> {
        info!(
            "Rendering {} requests (concurrency {})",
            requests.len(),
            concurrency.max(1)
        );
        stream::iter(requests.iter().map(|request| self.render(ctx, request)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Synchronous wrapper around [`Renderer::render`].
    ///
    /// Creates a Tokio runtime internally; must not be called from within
    /// an existing runtime.
    pub fn render_sync(
        &self,
        ctx: Option<&dyn RequestContext>,
        request: &RenderRequest,
    ) -> Result<Vec<u8>, RenderError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| RenderError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.render(ctx, request))
    }
}
