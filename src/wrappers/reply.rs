//! Raw view return values.
//!
//! A view may return a finished [`Response`], a text or byte body, a JSON
//! mapping, or any of those paired with a status and/or headers. The
//! application normalizes every shape with `App::make_response`.

use axum::body::Bytes;
use axum::http::StatusCode;

use crate::wrappers::Response;

/// Header name/value pairs attached to a view return.
pub type HeaderList = Vec<(String, String)>;

/// A status given either as a code or as a full status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Code(u16),
    Line(String),
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status::Code(code)
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Status::Code(code.as_u16())
    }
}

impl From<&str> for Status {
    fn from(line: &str) -> Self {
        Status::Line(line.to_string())
    }
}

impl From<String> for Status {
    fn from(line: String) -> Self {
        Status::Line(line)
    }
}

/// Middle slot of a return tuple: a status, or headers with no explicit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOrHeaders {
    Status(Status),
    Headers(HeaderList),
}

/// What a view hands back before normalization.
#[derive(Debug)]
pub enum ViewReturn {
    /// The view produced nothing; normalization rejects it.
    None,
    Response(Response),
    Text(String),
    Bytes(Bytes),
    /// A JSON document; objects and arrays are accepted as bodies.
    Json(serde_json::Value),
    /// `(body, status_or_headers, headers)`.
    Tuple(Box<ViewReturn>, StatusOrHeaders, Option<HeaderList>),
}

impl ViewReturn {
    pub fn text(body: impl Into<String>) -> Self {
        ViewReturn::Text(body.into())
    }

    pub fn bytes(body: impl Into<Bytes>) -> Self {
        ViewReturn::Bytes(body.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        ViewReturn::Json(value)
    }

    pub fn with_status(self, status: impl Into<Status>) -> Self {
        ViewReturn::Tuple(Box::new(self), StatusOrHeaders::Status(status.into()), None)
    }

    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ViewReturn::Tuple(
            Box::new(self),
            StatusOrHeaders::Headers(collect_headers(headers)),
            None,
        )
    }

    pub fn with_status_and_headers<I, K, V>(self, status: impl Into<Status>, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ViewReturn::Tuple(
            Box::new(self),
            StatusOrHeaders::Status(status.into()),
            Some(collect_headers(headers)),
        )
    }
}

fn collect_headers<I, K, V>(headers: I) -> HeaderList
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    headers
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl From<Response> for ViewReturn {
    fn from(response: Response) -> Self {
        ViewReturn::Response(response)
    }
}

impl From<String> for ViewReturn {
    fn from(text: String) -> Self {
        ViewReturn::Text(text)
    }
}

impl From<&str> for ViewReturn {
    fn from(text: &str) -> Self {
        ViewReturn::Text(text.to_string())
    }
}

impl From<Bytes> for ViewReturn {
    fn from(bytes: Bytes) -> Self {
        ViewReturn::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ViewReturn {
    fn from(bytes: Vec<u8>) -> Self {
        ViewReturn::Bytes(bytes.into())
    }
}

impl From<serde_json::Value> for ViewReturn {
    fn from(value: serde_json::Value) -> Self {
        ViewReturn::Json(value)
    }
}

impl<T: Into<ViewReturn>> From<Option<T>> for ViewReturn {
    fn from(value: Option<T>) -> Self {
        value.map_or(ViewReturn::None, Into::into)
    }
}

impl<B: Into<ViewReturn>> From<(B, u16)> for ViewReturn {
    fn from((body, status): (B, u16)) -> Self {
        body.into().with_status(status)
    }
}

impl<B: Into<ViewReturn>> From<(B, StatusCode)> for ViewReturn {
    fn from((body, status): (B, StatusCode)) -> Self {
        body.into().with_status(status)
    }
}

impl<B: Into<ViewReturn>> From<(B, u16, HeaderList)> for ViewReturn {
    fn from((body, status, headers): (B, u16, HeaderList)) -> Self {
        body.into().with_status_and_headers(status, headers)
    }
}
