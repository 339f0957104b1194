//! HTTP server setup and the bridge into the application.
//!
//! # Responsibilities
//! - Create the Axum router with a single fallback entry point
//! - Wire up middleware (request ID, tracing, timeout)
//! - Buffer the request body and build the [`Environ`]
//! - Run the application on a blocking worker and convert its output

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body as HttpBody;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::Router;
use hyper::ext::ReasonPhrase;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::error::ServeError;
use crate::serving::{MakeRequestUuid, Shutdown};
use crate::wrappers::{Body, Environ, ResponseHead, X_REQUEST_ID};

/// State injected into the entry point.
#[derive(Clone)]
struct ServerState {
    app: Arc<App>,
    max_body_bytes: usize,
    server_name: String,
    server_port: u16,
}

/// HTTP server hosting one application.
pub struct Server {
    router: Router,
    app: Arc<App>,
}

impl Server {
    /// Create a server using the application's configured host and port.
    pub fn new(app: Arc<App>) -> Self {
        let host = app.config().server.host.clone();
        let port = app.config().server.port;
        Self::with_address(app, &host, port)
    }

    /// Create a server that reports `host:port` as its own address.
    pub fn with_address(app: Arc<App>, host: &str, port: u16) -> Self {
        let state = ServerState {
            app: Arc::clone(&app),
            max_body_bytes: app.config().server.max_body_bytes,
            server_name: host.to_string(),
            server_port: port,
        };
        let timeout = Duration::from_secs(app.config().server.request_timeout_secs);
        let router = Self::build_router(state, timeout);
        Self { router, app }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: ServerState, timeout: Duration) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .fallback(entry_point)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    /// The router with every layer applied, for driving the server in-process.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires or Ctrl+C is received.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServeError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            debug = self.app.debug(),
            rules = self.app.url_map().len(),
            "Serving application"
        );

        let service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => {}
                    _ = ctrl_c() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Bind `host:port` and serve `app` until shutdown.
pub async fn run_simple(app: App, host: &str, port: u16) -> Result<(), ServeError> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    Server::with_address(Arc::new(app), host, port)
        .run(listener, shutdown.subscribe())
        .await
}

/// Wait for Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

fn request_span(request: &Request) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Every request lands here; the application does its own routing.
async fn entry_point(State(state): State<ServerState>, request: Request) -> HttpResponse {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_bytes,
                error = %error,
                "Request body rejected"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let environ = Environ::from_parts(
        &parts,
        body,
        remote_addr,
        &state.server_name,
        state.server_port,
    );
    let app = Arc::clone(&state.app);
    let outcome = tokio::task::spawn_blocking(move || {
        let mut head = ResponseHead::default();
        let body = app.wsgi_app(environ, &mut head);
        (head, body)
    })
    .await;

    match outcome {
        Ok((head, body)) => into_http_response(head, body),
        Err(error) => {
            tracing::error!(error = %error, "Dispatch worker failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Convert the emitted status line, headers and body into an HTTP response.
fn into_http_response(head: ResponseHead, body: Body) -> HttpResponse {
    let status = head
        .status_code()
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match body {
        Body::Full(bytes) => HttpBody::from(bytes),
        Body::Stream(chunks) => HttpBody::from_stream(futures_util::stream::iter(
            chunks.map(Ok::<_, Infallible>),
        )),
    };

    let mut response = HttpResponse::new(body);
    *response.status_mut() = status;
    if let Some(reason) = custom_reason(&head.status, status) {
        response.extensions_mut().insert(reason);
    }
    for (name, value) in &head.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }
    response
}

/// Reason phrase from the status line when it differs from the canonical one.
fn custom_reason(line: &str, status: StatusCode) -> Option<ReasonPhrase> {
    let (_, reason) = line.split_once(' ')?;
    if Some(reason) == status.canonical_reason() {
        return None;
    }
    ReasonPhrase::try_from(reason.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::routing::RuleOptions;
    use crate::wrappers::Response;
    use axum::body::Bytes;
    use axum::http::Method;
    use serde_json::json;
    use tower::ServiceExt;

    async fn send(router: Router, method: Method, uri: &str, body: &'static str) -> HttpResponse {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(HttpBody::from(body))
            .unwrap();
        router.oneshot(request).await.unwrap()
    }

    async fn body_bytes(response: HttpResponse) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    fn demo_app(config: AppConfig) -> Arc<App> {
        let mut app = App::with_config(config);
        app.route("/", RuleOptions::new().methods([Method::POST]), |_, _| {
            Ok(json!({"status": "success"}))
        })
        .unwrap();
        app.route("/echo", RuleOptions::new().methods([Method::POST]), |req, _| {
            Ok(req.data().clone())
        })
        .unwrap();
        app.route("/chunks", RuleOptions::new(), |_, _| {
            let chunks = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")];
            Ok(Response::new(Body::stream(chunks)))
        })
        .unwrap();
        Arc::new(app)
    }

    #[tokio::test]
    async fn post_goes_through_the_stack() {
        let router = Server::new(demo_app(AppConfig::default())).into_router();
        let response = send(router, Method::POST, "/", "").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
        let value: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(value, json!({"status": "success"}));
    }

    #[tokio::test]
    async fn incoming_request_id_is_kept() {
        let router = Server::new(demo_app(AppConfig::default())).into_router();
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(X_REQUEST_ID, "abc-123")
            .body(HttpBody::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let router = Server::new(demo_app(AppConfig::default())).into_router();
        let response = send(router, Method::GET, "/", "").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "OPTIONS, POST");
    }

    #[tokio::test]
    async fn body_reaches_the_view() {
        let router = Server::new(demo_app(AppConfig::default())).into_router();
        let response = send(router, Method::POST, "/echo", "ping").await;
        assert_eq!(body_bytes(response).await, "ping");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = AppConfig::default();
        config.server.max_body_bytes = 4;
        let router = Server::new(demo_app(config)).into_router();
        let response = send(router, Method::POST, "/echo", "far too long").await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn custom_status_line_keeps_its_reason() {
        let mut app = App::new();
        app.route("/teapot", RuleOptions::new(), |_, _| {
            Ok(crate::wrappers::ViewReturn::text("short and stout").with_status("418 I'M A TEAPOT"))
        })
        .unwrap();
        let router = Server::new(Arc::new(app)).into_router();
        let response = send(router, Method::GET, "/teapot", "").await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        let reason = response.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"I'M A TEAPOT");
    }

    #[tokio::test]
    async fn canonical_status_line_adds_no_reason() {
        let router = Server::new(demo_app(AppConfig::default())).into_router();
        let response = send(router, Method::POST, "/", "").await;
        assert!(response.extensions().get::<ReasonPhrase>().is_none());
    }

    #[tokio::test]
    async fn streamed_bodies_are_forwarded() {
        let router = Server::new(demo_app(AppConfig::default())).into_router();
        let response = send(router, Method::GET, "/chunks", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("content-length"));
        assert_eq!(body_bytes(response).await, "ab");
    }
}
