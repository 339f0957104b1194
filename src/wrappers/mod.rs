//! Request and response wrappers.
//!
//! # Data Flow
//! ```text
//! transport request
//!     → environ.rs (raw environment: method, path, headers, body)
//!     → request.rs (structured view of the environment + routing outcome)
//!     → view function
//!     → reply.rs (raw return value)
//!     → [App::make_response normalizes]
//!     → response.rs (status, headers, body)
//!     → StartResponse callback + body back to the transport
//! ```

pub mod body;
pub mod environ;
pub mod reply;
pub mod request;
pub mod response;

pub use body::Body;
pub use environ::Environ;
pub use reply::{HeaderList, Status, StatusOrHeaders, ViewReturn};
pub use request::{Request, X_REQUEST_ID};
pub use response::{Response, ResponseHead, StartResponse};
