//! In-process test client.
//!
//! Drives [`App::wsgi_app`] directly with a synthetic [`Environ`], without a
//! socket or runtime. Useful for exercising views and error handling in unit
//! tests.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::app::App;
use crate::wrappers::{Environ, ResponseHead};

/// A client bound to one application.
#[derive(Debug)]
pub struct TestClient<'a> {
    app: &'a App,
}

impl<'a> TestClient<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }

    pub fn get(&self, target: &str) -> TestResponse {
        self.request(Environ::new(Method::GET, target))
    }

    pub fn post(&self, target: &str, body: impl Into<Bytes>) -> TestResponse {
        self.request(Environ::new(Method::POST, target).with_body(body))
    }

    pub fn post_json(&self, target: &str, value: &serde_json::Value) -> TestResponse {
        self.request(Environ::new(Method::POST, target).with_json(value))
    }

    pub fn options(&self, target: &str) -> TestResponse {
        self.request(Environ::new(Method::OPTIONS, target))
    }

    /// Run one request through the application and collect the response.
    pub fn request(&self, environ: Environ) -> TestResponse {
        let mut head = ResponseHead::default();
        let body = self.app.wsgi_app(environ, &mut head).collect();

        let mut headers = HeaderMap::new();
        for (name, value) in &head.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        TestResponse {
            status: head
                .status_code()
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            status_line: head.status,
            headers,
            body,
        }
    }
}

/// A fully collected response.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: StatusCode,
    pub status_line: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
