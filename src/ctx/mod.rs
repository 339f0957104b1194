//! Request contexts and the per-worker context stack.
//!
//! # Data Flow
//! ```text
//! Environ
//!     → RequestContext::new (URL matched eagerly against the Map)
//!     → push() → ContextGuard (stack depth + 1)
//!     → dispatch receives &RequestContext explicitly
//!     → guard dropped (stack depth - 1), also on error or panic
//! ```
//!
//! # Design Decisions
//! - The stack is thread-local: every blocking worker owns its own stack
//! - The context is always passed explicitly; the stack only offers ambient reads
//! - `ContextGuard` is `!Send` so it is released on the thread that pushed it

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::routing::Map;
use crate::wrappers::{Environ, Request};

thread_local! {
    static STACK: RefCell<Vec<Arc<Request>>> = const { RefCell::new(Vec::new()) };
}

/// Per-request bundle of environment, matched rule and view arguments.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<Request>,
}

impl RequestContext {
    /// Build the context, resolving the URL against `map` immediately.
    pub fn new(map: &Map, environ: Environ) -> Self {
        let mut request = Request::new(environ);
        let matched = map.match_request(
            request.path(),
            request.method(),
            Some(request.query_string()),
        );
        request.bind(matched);
        Self {
            request: Arc::new(request),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Make this context the current one on this thread until the guard drops.
    pub fn push(&self) -> ContextGuard {
        let depth = STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(Arc::clone(&self.request));
            stack.len()
        });
        tracing::trace!(depth, path = %self.request.path(), "Request context pushed");
        ContextGuard {
            depth,
            _not_send: PhantomData,
        }
    }
}

/// Pops the pushed context exactly once, when dropped.
#[derive(Debug)]
pub struct ContextGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    /// Stack depth right after the push.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "request contexts popped out of order");
            stack.pop();
        });
        tracing::trace!(depth = self.depth, "Request context popped");
    }
}

/// Number of active request contexts on this thread.
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

/// Run `f` with the innermost active request on this thread, if any.
pub fn with_current<R>(f: impl FnOnce(Option<&Request>) -> R) -> R {
    let current = STACK.with(|stack| stack.borrow().last().cloned());
    f(current.as_deref())
}
