//! Raw request environment.
//!
//! The server runner fills an [`Environ`] for every inbound request; the
//! application never sees the transport's own request type.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::uri::Authority;
use axum::http::{header, request, HeaderMap, HeaderName, HeaderValue, Method};
use percent_encoding::percent_decode_str;

/// Everything the transport knows about one inbound request.
#[derive(Debug, Clone)]
pub struct Environ {
    pub method: Method,
    pub path: String,
    pub query_string: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub server_name: String,
    pub server_port: u16,
    pub remote_addr: Option<SocketAddr>,
}

impl Environ {
    /// Build an environment for `target`, which may carry a query string.
    ///
    /// The path is percent-decoded; the query string is kept raw.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path: decode_path(path),
            query_string: query.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            server_name: "localhost".to_string(),
            server_port: 80,
            remote_addr: None,
        }
    }

    /// Build an environment from transport request parts.
    ///
    /// `server_name` and `server_port` are used when the request has no Host.
    pub fn from_parts(
        parts: &request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
        server_name: &str,
        server_port: u16,
    ) -> Self {
        let authority = parts.uri.authority().cloned().or_else(|| {
            parts
                .headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.parse::<Authority>().ok())
        });
        let host = authority
            .as_ref()
            .map(|a| a.host().to_string())
            .unwrap_or_else(|| server_name.to_string());
        let port = authority
            .as_ref()
            .and_then(Authority::port_u16)
            .unwrap_or(server_port);

        Self {
            method: parts.method.clone(),
            path: decode_path(parts.uri.path()),
            query_string: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts.headers.clone(),
            body,
            server_name: host,
            server_port: port,
            remote_addr,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and the matching content type.
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
        .with_body(value.to_string())
    }
}

/// Percent-decode a request path. Invalid UTF-8 is replaced.
fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_new_splits_query() {
        let environ = Environ::new(Method::GET, "/search?q=rust&page=2");
        assert_eq!(environ.path, "/search");
        assert_eq!(environ.query_string, "q=rust&page=2");
    }

    #[test]
    fn test_from_parts_reads_host() {
        let (parts, _) = Request::builder()
            .method(Method::POST)
            .uri("/items?x=1")
            .header("Host", "example.com:8080")
            .body(())
            .unwrap()
            .into_parts();

        let environ = Environ::from_parts(&parts, Bytes::from_static(b"{}"), None, "fallback", 5000);
        assert_eq!(environ.method, Method::POST);
        assert_eq!(environ.path, "/items");
        assert_eq!(environ.query_string, "x=1");
        assert_eq!(environ.server_name, "example.com");
        assert_eq!(environ.server_port, 8080);
        assert_eq!(environ.body, Bytes::from_static(b"{}"));
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let environ = Environ::new(Method::GET, "/hello/J%C3%BCrgen%20X?q=a%20b");
        assert_eq!(environ.path, "/hello/Jürgen X");
        assert_eq!(environ.query_string, "q=a%20b");

        let (parts, _) = Request::builder()
            .uri("/caf%C3%A9")
            .body(())
            .unwrap()
            .into_parts();
        let environ = Environ::from_parts(&parts, Bytes::new(), None, "localhost", 80);
        assert_eq!(environ.path, "/café");
    }

    #[test]
    fn test_from_parts_reads_ipv6_host() {
        let (parts, _) = Request::builder()
            .uri("/")
            .header("Host", "[::1]:8080")
            .body(())
            .unwrap()
            .into_parts();
        let environ = Environ::from_parts(&parts, Bytes::new(), None, "fallback", 5000);
        assert_eq!(environ.server_name, "[::1]");
        assert_eq!(environ.server_port, 8080);
    }

    #[test]
    fn test_from_parts_falls_back_to_server() {
        let (parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let environ = Environ::from_parts(&parts, Bytes::new(), None, "127.0.0.1", 5000);
        assert_eq!(environ.server_name, "127.0.0.1");
        assert_eq!(environ.server_port, 5000);
    }
}
