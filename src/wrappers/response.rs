//! Response wrapper and the transport-facing emit contract.
//!
//! # Responsibilities
//! - Hold status, an ordered header multi-map and the body
//! - Provide named constructors for the common body shapes
//! - Emit status line and header pairs through [`StartResponse`]
//!
//! # Design Decisions
//! - Duplicate header names are allowed (`HeaderMap::append`)
//! - Emitting consumes the response; there is no use after finalization

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

use crate::error::ResponseError;
use crate::wrappers::Body;

/// Content type for text bodies returned by views.
pub const DEFAULT_MIMETYPE: &str = "text/html; charset=utf-8";

/// Content type for JSON bodies.
pub const JSON_MIMETYPE: &str = "application/json";

/// Transport callback receiving the status line and headers of a response.
pub trait StartResponse {
    fn start_response(&mut self, status: &str, headers: &[(String, String)]);
}

impl<F> StartResponse for F
where
    F: FnMut(&str, &[(String, String)]),
{
    fn start_response(&mut self, status: &str, headers: &[(String, String)]) {
        self(status, headers)
    }
}

/// A [`StartResponse`] that records what it was given.
#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    pub status: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Numeric status parsed from the status line.
    pub fn status_code(&self) -> Option<StatusCode> {
        parse_status_line(&self.status)
    }
}

impl StartResponse for ResponseHead {
    fn start_response(&mut self, status: &str, headers: &[(String, String)]) {
        self.status = status.to_string();
        self.headers = headers.to_vec();
    }
}

/// Parse the leading code of a status line such as `"404 NOT FOUND"`.
pub fn parse_status_line(line: &str) -> Option<StatusCode> {
    line.split_whitespace()
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
}

/// A normalized response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    /// Reason phrase given with a custom status line, if any.
    reason: Option<String>,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// A 200 response with the default text mimetype.
    pub fn new(body: impl Into<Body>) -> Self {
        Self::with_mimetype(body, DEFAULT_MIMETYPE)
    }

    /// A 200 response without any headers.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            reason: None,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn with_mimetype(body: impl Into<Body>, mimetype: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mimetype));
        Self {
            status: StatusCode::OK,
            reason: None,
            headers,
            body: body.into(),
        }
    }

    /// A plain-text response.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_mimetype(body.into(), "text/plain; charset=utf-8")
    }

    /// A JSON response, compact encoding.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ResponseError> {
        Self::json_with(value, false)
    }

    pub(crate) fn json_with<T: Serialize + ?Sized>(
        value: &T,
        pretty: bool,
    ) -> Result<Self, ResponseError> {
        let body = if pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(Self::with_mimetype(Bytes::from(body), JSON_MIMETYPE))
    }

    /// A small HTML error page.
    pub fn error(status: StatusCode, description: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown Error");
        let page = format!(
            "<!doctype html>\n<title>{} {}</title>\n<h1>{}</h1>\n<p>{}</p>\n",
            status.as_u16(),
            reason,
            reason,
            description
        );
        Self::new(page).with_status(status)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.set_status(status);
        self
    }

    /// Append a header, keeping any existing values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the status; the canonical reason phrase is used.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.reason = None;
    }

    /// Set the status from a line such as `"418 I'M A TEAPOT"`, keeping its
    /// reason phrase.
    pub fn set_status_line(&mut self, line: &str) -> Result<(), ResponseError> {
        let status =
            parse_status_line(line).ok_or_else(|| ResponseError::InvalidStatus(line.to_string()))?;
        let reason = line
            .trim()
            .split_once(' ')
            .map(|(_, reason)| reason.trim())
            .filter(|reason| !reason.is_empty());
        if let Some(reason) = reason {
            HeaderValue::from_str(reason)
                .map_err(|_| ResponseError::InvalidStatus(line.to_string()))?;
        }
        self.status = status;
        self.reason = reason.map(str::to_string);
        Ok(())
    }

    /// Status line, e.g. `"200 OK"`.
    pub fn status_line(&self) -> String {
        let reason = self
            .reason
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("UNKNOWN");
        format!("{} {}", self.status.as_u16(), reason)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Extend headers from name/value pairs.
    ///
    /// `Content-Type` replaces the current value; every other header is appended.
    pub fn extend_headers<I, K, V>(&mut self, pairs: I) -> Result<(), ResponseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in pairs {
            let (name, value) = (name.as_ref(), value.as_ref());
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ResponseError::InvalidHeader(format!("{name}: {value}")))?;
            if header_name == header::CONTENT_TYPE {
                self.headers.insert(header_name, header_value);
            } else {
                self.headers.append(header_name, header_value);
            }
        }
        Ok(())
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Emit status line and headers, handing back the body to be written.
    pub fn call(self, start_response: &mut dyn StartResponse) -> Body {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        if let Some(len) = self.body.len_hint() {
            if !self.headers.contains_key(header::CONTENT_LENGTH) {
                headers.push((header::CONTENT_LENGTH.as_str().to_string(), len.to_string()));
            }
        }
        start_response.start_response(&self.status_line(), &headers);
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_emits_status_and_headers() {
        let response = Response::new("hello")
            .with_status(StatusCode::CREATED)
            .with_header(header::SET_COOKIE, HeaderValue::from_static("a=1"))
            .with_header(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let mut head = ResponseHead::default();
        let body = response.call(&mut head);

        assert_eq!(head.status, "201 Created");
        assert_eq!(head.status_code(), Some(StatusCode::CREATED));
        let cookies: Vec<_> = head
            .headers
            .iter()
            .filter(|(k, _)| k == "set-cookie")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        assert!(head
            .headers
            .contains(&("content-length".to_string(), "5".to_string())));
        assert_eq!(body.collect(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_closure_start_response() {
        let mut seen = String::new();
        let mut start = |status: &str, _headers: &[(String, String)]| seen = status.to_string();
        Response::empty().call(&mut start);
        assert_eq!(seen, "200 OK");
    }

    #[test]
    fn test_streamed_body_is_lazy() {
        let chunks = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let response = Response::new(Body::stream(chunks));
        assert_eq!(response.body().len_hint(), None);

        let mut head = ResponseHead::default();
        let body = response.call(&mut head);
        assert!(!head.headers.iter().any(|(k, _)| k == "content-length"));
        assert_eq!(body.collect(), Bytes::from_static(b"ab"));
    }

    #[test]
    fn test_extend_headers_replaces_content_type() {
        let mut response = Response::new("x");
        response
            .extend_headers([("Content-Type", "text/csv"), ("X-Foo", "1")])
            .unwrap();
        assert_eq!(response.mimetype(), Some("text/csv"));
        assert_eq!(response.headers().get("x-foo").unwrap(), "1");

        assert!(matches!(
            response.extend_headers([("bad header", "1")]),
            Err(ResponseError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_custom_reason_phrase_is_emitted() {
        let mut response = Response::new("teapot");
        response.set_status_line("418 I'M A TEAPOT").unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.status_line(), "418 I'M A TEAPOT");

        response.set_status_line("200").unwrap();
        assert_eq!(response.status_line(), "200 OK");

        response.set_status_line("299 FINE").unwrap();
        response.set_status(StatusCode::ACCEPTED);
        assert_eq!(response.status_line(), "202 Accepted");

        assert!(matches!(
            response.set_status_line("nope"),
            Err(ResponseError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line("404 NOT FOUND"), Some(StatusCode::NOT_FOUND));
        assert_eq!(parse_status_line("teapot"), None);
    }
}
