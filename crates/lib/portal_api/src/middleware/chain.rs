//! Ordered per-request middleware chain.
//!
//! A [`Chain`] is an explicit list of [`Stage`]s run in order, once per
//! request, before the handler. The first stage that fails or answers the
//! request short-circuits it: no later stage and no handler runs. Headers
//! collected by earlier stages (security, CORS, rate-limit) are applied to
//! whatever response leaves the chain, including error responses.
//!
//! Stage order is fixed by the constructors:
//!
//! ```text
//! SecurityHeaders → Cors → RateLimit → [Authenticate | OptionalAuthenticate | ApiKey] → RequireRole*
//! ```
//!
//! CORS runs before rate limiting, so preflight (`OPTIONS`) requests are
//! answered without consuming quota and without credentials.

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use futures::future::BoxFuture;
use portal_core::models::Role;
use tower::{Layer, Service};
use tracing::{debug, error};

use super::{auth, boundary, cors, rate_limit, security_headers};
use crate::AppState;
use crate::error::AppError;

/// One step of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    SecurityHeaders,
    Cors,
    RateLimit,
    /// Bearer token required.
    Authenticate,
    /// Bearer token used when valid; credential failures proceed anonymously.
    OptionalAuthenticate,
    /// API key required (webhook callers).
    ApiKey,
    /// Caller's role must be one of these.
    RequireRole(Vec<Role>),
}

/// What a stage decided.
pub enum Flow {
    Continue,
    /// Terminal answer produced by the stage itself (e.g. preflight).
    Respond(Response),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::SecurityHeaders => "security_headers",
            Stage::Cors => "cors",
            Stage::RateLimit => "rate_limit",
            Stage::Authenticate => "authenticate",
            Stage::OptionalAuthenticate => "optional_authenticate",
            Stage::ApiKey => "api_key",
            Stage::RequireRole(_) => "require_role",
        }
    }

    fn run(
        &self,
        state: &AppState,
        request: &mut Request,
        headers: &mut HeaderMap,
    ) -> Result<Flow, AppError> {
        match self {
            Stage::SecurityHeaders => {
                security_headers::apply(state.config.hsts, headers);
                Ok(Flow::Continue)
            }
            Stage::Cors => Ok(cors::apply(&state.config.cors, request, headers)),
            Stage::RateLimit => {
                rate_limit::apply(&state.limiter, request, headers)?;
                Ok(Flow::Continue)
            }
            Stage::Authenticate => {
                auth::authenticate(state, request)?;
                Ok(Flow::Continue)
            }
            Stage::OptionalAuthenticate => {
                auth::authenticate_optional(state, request)?;
                Ok(Flow::Continue)
            }
            Stage::ApiKey => {
                auth::authenticate_api_key(state, request)?;
                Ok(Flow::Continue)
            }
            Stage::RequireRole(roles) => {
                auth::require_role(request, roles)?;
                Ok(Flow::Continue)
            }
        }
    }
}

/// An ordered chain bound to the shared services; usable as a tower layer.
#[derive(Clone)]
pub struct Chain {
    state: AppState,
    stages: Arc<[Stage]>,
}

impl Chain {
    /// Security headers, CORS and rate limiting only.
    pub fn public(state: AppState) -> Self {
        Self {
            state,
            stages: Arc::from([Stage::SecurityHeaders, Stage::Cors, Stage::RateLimit]),
        }
    }

    /// Public chain plus a required bearer token.
    pub fn authenticated(state: AppState) -> Self {
        Self::public(state).then(Stage::Authenticate)
    }

    /// Public chain plus an optional bearer token.
    pub fn optional(state: AppState) -> Self {
        Self::public(state).then(Stage::OptionalAuthenticate)
    }

    /// Public chain plus a required API key.
    pub fn api_key(state: AppState) -> Self {
        Self::public(state).then(Stage::ApiKey)
    }

    /// Append a role check.
    pub fn require_role(self, roles: &[Role]) -> Self {
        self.then(Stage::RequireRole(roles.to_vec()))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn then(self, stage: Stage) -> Self {
        let stages: Vec<Stage> = self.stages.iter().cloned().chain([stage]).collect();
        Self {
            state: self.state,
            stages: stages.into(),
        }
    }

    /// Run every stage, then `inner` if none short-circuited.
    async fn run<S>(&self, mut request: Request, mut inner: S) -> Response
    where
        S: Service<Request, Response = Response, Error = Infallible>,
    {
        let mut headers = HeaderMap::new();
        for stage in self.stages.iter() {
            match stage.run(&self.state, &mut request, &mut headers) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Respond(response)) => return decorate(response, headers),
                Err(err) => {
                    debug!(
                        stage = stage.name(),
                        method = %request.method(),
                        path = %request.uri().path(),
                        error = %err,
                        "request short-circuited"
                    );
                    return decorate(err.into_response(), headers);
                }
            }
        }
        // A panicking handler still gets the headers collected above.
        let response = match AssertUnwindSafe(inner.call(request)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(never)) => match never {},
            Err(panic) => {
                error!(
                    panic = boundary::panic_message(panic.as_ref()),
                    "handler panicked"
                );
                AppError::Internal("handler panicked".into()).into_response()
            }
        };
        decorate(response, headers)
    }
}

fn decorate(mut response: Response, headers: HeaderMap) -> Response {
    response.headers_mut().extend(headers);
    response
}

impl<S> Layer<S> for Chain {
    type Service = ChainService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ChainService {
            chain: self.clone(),
            inner,
        }
    }
}

/// Service produced by [`Chain`].
#[derive(Clone)]
pub struct ChainService<S> {
    chain: Chain,
    inner: S,
}

impl<S> Service<Request> for ChainService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let chain = self.chain.clone();
        // Keep the readied service for this call; leave a fresh clone behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { Ok(chain.run(request, inner).await) })
    }
}
