//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     add_url_rule(pattern, endpoint, methods)
//!     → rule.rs (normalize methods, automatic OPTIONS flag)
//!     → map.rs (insert pattern into matchit, check method conflicts)
//!
//! Incoming Request (path, method):
//!     → map.rs (matchit lookup, method filter)
//!     → Return: (Rule, ViewArgs) or RoutingError
//! ```
//!
//! # Design Decisions
//! - Pattern matching is delegated to `matchit`; no regex, no pattern compiler here
//! - Rules are immutable after registration and shared via `Arc`
//! - Deterministic: same input always matches the same rule

pub mod args;
pub mod map;
pub mod rule;

pub use args::ViewArgs;
pub use map::Map;
pub use rule::{Rule, RuleOptions};
