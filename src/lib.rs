//! A small synchronous web application framework.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ serving (axum + tower-http: request ID, trace, timeout)
//!                          │
//!                          ▼  Environ, on a blocking worker
//!                      App::wsgi_app
//!                          │  RequestContext pushed (ctx), URL matched (routing)
//!                          ▼
//!                      dispatch → view → make_response → after-request hooks
//!                          │
//!     Client Response      ▼  status line + headers + body (wrappers)
//!     ◀─────────────── serving
//! ```
//!
//! Cross-cutting: `config` (TOML), `observability` (tracing, Prometheus),
//! `error` (one error type per subsystem).

// Core
pub mod app;
pub mod ctx;
pub mod routing;
pub mod wrappers;

// Hosting
pub mod serving;
pub mod testing;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;

pub use app::{App, RunOptions, View};
pub use config::AppConfig;
pub use error::{abort, BoxError, HttpError};
pub use routing::{RuleOptions, ViewArgs};
pub use serving::{Server, Shutdown};
pub use wrappers::{Environ, Request, Response, ViewReturn};

pub use axum::http;
