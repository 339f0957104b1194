//! Error types for registration, routing, dispatch and response normalization.
//!
//! # Taxonomy
//! - [`RegisterError`]: fatal at registration time, surfaced to the caller of `add_url_rule`
//! - [`RoutingError`]: produced by the rule registry, translated into 404/405/308 responses
//! - [`HttpError`]: raised by a view through [`abort`], translated into its status response
//! - [`ResponseError`]: the view returned nothing or an unsupported shape (surfaces as 500)
//! - [`DispatchError`]: everything that can escape a single request's dispatch

use axum::http::{header, HeaderValue, Method, StatusCode};
use thiserror::Error;

use crate::wrappers::Response;

/// Error raised by a view function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by the rule registry when a rule is added.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The pattern/method pair is already claimed by another endpoint.
    #[error("rule {pattern:?} already routes {method} to endpoint {existing:?}")]
    Conflict {
        pattern: String,
        method: String,
        existing: String,
    },

    /// The matcher rejected the pattern.
    #[error("invalid rule pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors raised while registering a URL rule on the application.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The endpoint is already bound to a different view function.
    #[error("view function mapping is overwriting an existing endpoint function: {0}")]
    EndpointConflict(String),

    /// Neither an endpoint name nor a view function was given.
    #[error("expected a view function if no endpoint is provided for rule {0:?}")]
    MissingEndpoint(String),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Outcome of a failed URL match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("the requested URL was not found on the server")]
    NotFound,

    #[error("the method is not allowed for the requested URL")]
    MethodNotAllowed { allowed: Vec<Method> },

    /// The URL is canonically slash-terminated.
    #[error("the URL was moved to {location}")]
    Redirect { location: String },
}

impl RoutingError {
    pub fn status(&self) -> StatusCode {
        match self {
            RoutingError::NotFound => StatusCode::NOT_FOUND,
            RoutingError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RoutingError::Redirect { .. } => StatusCode::PERMANENT_REDIRECT,
        }
    }

    /// Render this routing outcome as an HTTP error response.
    pub fn to_response(&self) -> Response {
        let mut response = Response::error(self.status(), &self.to_string());
        match self {
            RoutingError::NotFound => {}
            RoutingError::MethodNotAllowed { allowed } => {
                if let Ok(value) = HeaderValue::from_str(&join_methods(allowed)) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
            }
            RoutingError::Redirect { location } => {
                if let Ok(value) = HeaderValue::from_str(location) {
                    response.headers_mut().insert(header::LOCATION, value);
                }
            }
        }
        response
    }
}

/// Render a method list the way the `Allow` header expects it.
pub(crate) fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An HTTP error raised from inside a view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}")]
pub struct HttpError {
    pub status: StatusCode,
    pub description: Option<String>,
}

impl HttpError {
    pub fn to_response(&self) -> Response {
        let description = self
            .description
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("Unknown error");
        Response::error(self.status, description)
    }
}

/// Abort the current view with the given status.
///
/// ```ignore
/// let user = users.get(id).ok_or_else(|| abort(StatusCode::NOT_FOUND))?;
/// ```
pub fn abort(status: StatusCode) -> BoxError {
    Box::new(HttpError {
        status,
        description: None,
    })
}

/// Errors raised while building a URL for an endpoint.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("could not build url for endpoint {0:?}")]
    UnknownEndpoint(String),

    #[error("could not build url for endpoint {endpoint:?}: missing value for {param:?}")]
    MissingValue { endpoint: String, param: String },
}

/// The view returned a value that cannot become a response.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("view function did not return a response")]
    NoReturnValue,

    #[error("view function returned an unsupported body: {0}")]
    UnsupportedBody(&'static str),

    #[error("invalid status {0:?}")]
    InvalidStatus(String),

    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    #[error("failed to serialize JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything that can escape the dispatch of a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("view function failed: {0}")]
    Handler(#[source] BoxError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("view function panicked: {0}")]
    Panicked(String),
}

impl DispatchError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Routing(_) => "routing",
            DispatchError::Handler(_) => "handler",
            DispatchError::Response(_) => "response",
            DispatchError::Panicked(_) => "panic",
        }
    }
}

/// Errors from the server runner.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
