//! Development server runner.
//!
//! # Data Flow
//! ```text
//! TCP listener (axum::serve)
//!     → SetRequestId → Trace → PropagateRequestId → Timeout
//!     → entry_point: body buffered, Environ built
//!     → App::wsgi_app on a blocking worker
//!     → emitted status line, headers and body → HTTP response
//! ```
//!
//! # Design Decisions
//! - The application is synchronous; each request runs on `spawn_blocking`
//!   so the context stack is per worker thread
//! - Request bodies are buffered up to `max_body_bytes` before dispatch

pub mod request_id;
pub mod server;
pub mod shutdown;

pub use request_id::MakeRequestUuid;
pub use server::{run_simple, Server};
pub use shutdown::Shutdown;
