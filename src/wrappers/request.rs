//! Request wrapper.
//!
//! # Responsibilities
//! - Expose method, path, query args, headers and body of an [`Environ`]
//! - Carry the routing outcome: matched rule and view arguments, or the error
//! - Decode JSON bodies on demand

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method};
use serde::de::DeserializeOwned;

use crate::error::RoutingError;
use crate::routing::{Rule, ViewArgs};
use crate::wrappers::Environ;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// One inbound request, as seen by views.
#[derive(Debug)]
pub struct Request {
    environ: Environ,
    args: Vec<(String, String)>,
    url_rule: Option<Arc<Rule>>,
    view_args: ViewArgs,
    routing_error: Option<RoutingError>,
}

impl Request {
    pub fn new(environ: Environ) -> Self {
        let args = url::form_urlencoded::parse(environ.query_string.as_bytes())
            .into_owned()
            .collect();
        Self {
            environ,
            args,
            url_rule: None,
            view_args: ViewArgs::new(),
            routing_error: None,
        }
    }

    /// Record the outcome of URL matching.
    pub(crate) fn bind(&mut self, matched: Result<(Arc<Rule>, ViewArgs), RoutingError>) {
        match matched {
            Ok((rule, view_args)) => {
                self.url_rule = Some(rule);
                self.view_args = view_args;
                self.routing_error = None;
            }
            Err(error) => {
                self.url_rule = None;
                self.view_args = ViewArgs::new();
                self.routing_error = Some(error);
            }
        }
    }

    pub fn method(&self) -> &Method {
        &self.environ.method
    }

    pub fn path(&self) -> &str {
        &self.environ.path
    }

    pub fn query_string(&self) -> &str {
        &self.environ.query_string
    }

    /// Decoded query arguments, in order, duplicates kept.
    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    /// First query argument with the given name.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.environ.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.environ.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// Raw request body.
    pub fn data(&self) -> &Bytes {
        &self.environ.body
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.environ.body)
    }

    /// Whether the content type is `application/json` or a `+json` type.
    pub fn is_json(&self) -> bool {
        let Some(mimetype) = self.mimetype() else {
            return false;
        };
        mimetype == "application/json"
            || (mimetype.starts_with("application/") && mimetype.ends_with("+json"))
    }

    /// Content type without parameters, lowercased.
    pub fn mimetype(&self) -> Option<String> {
        self.environ
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.environ.body)
    }

    /// The rule that matched, if routing succeeded.
    pub fn url_rule(&self) -> Option<&Arc<Rule>> {
        self.url_rule.as_ref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.url_rule.as_deref().map(Rule::endpoint)
    }

    pub fn view_args(&self) -> &ViewArgs {
        &self.view_args
    }

    /// The routing failure, if routing did not succeed.
    pub fn routing_error(&self) -> Option<&RoutingError> {
        self.routing_error.as_ref()
    }

    pub fn environ(&self) -> &Environ {
        &self.environ
    }
}
