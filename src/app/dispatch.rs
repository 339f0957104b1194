//! Request dispatch and last-resort error handling.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use axum::http::{header, HeaderValue, Method, StatusCode};

use crate::app::App;
use crate::ctx::RequestContext;
use crate::error::{join_methods, DispatchError, HttpError, RoutingError};
use crate::observability::metrics;
use crate::routing::Rule;
use crate::wrappers::{Body, Environ, Response, StartResponse, ViewReturn};

impl App {
    /// Build the context for one request; the URL is matched here.
    pub fn request_context(&self, environ: Environ) -> RequestContext {
        RequestContext::new(&self.url_map, environ)
    }

    /// Route the request to its view and return the view's raw result.
    pub fn dispatch_request(&self, ctx: &RequestContext) -> Result<ViewReturn, DispatchError> {
        let request = ctx.request();
        if let Some(error) = request.routing_error() {
            return Err(error.clone().into());
        }
        let Some(rule) = request.url_rule() else {
            return Err(RoutingError::NotFound.into());
        };

        if rule.provide_automatic_options() && *request.method() == Method::OPTIONS {
            return Ok(self.make_default_options_response(rule).into());
        }

        // A rule without a bound view behaves like an unknown URL.
        let view = self
            .view_functions
            .get(rule.endpoint())
            .ok_or(RoutingError::NotFound)?;

        tracing::debug!(
            endpoint = %rule.endpoint(),
            method = %request.method(),
            path = %request.path(),
            "Dispatching request"
        );
        view.call(request, request.view_args())
            .map_err(DispatchError::Handler)
    }

    /// Dispatch, translate failures, and finalize into a response.
    pub fn full_dispatch_request(&self, ctx: &RequestContext) -> Result<Response, DispatchError> {
        let rv = match self.dispatch_request(ctx) {
            Ok(rv) => rv,
            Err(error) => self.handle_user_exception(ctx, error)?,
        };
        self.finalize_request(ctx, rv)
    }

    /// Turn a dispatch failure into a raw result, or re-raise it.
    ///
    /// Routing errors and [`HttpError`]s become their HTTP response; any other
    /// view error goes to the user-exception hook when one is installed.
    pub fn handle_user_exception(
        &self,
        ctx: &RequestContext,
        error: DispatchError,
    ) -> Result<ViewReturn, DispatchError> {
        match error {
            DispatchError::Routing(routing) => {
                tracing::debug!(
                    path = %ctx.request().path(),
                    status = %routing.status(),
                    "Routing failed"
                );
                Ok(routing.to_response().into())
            }
            DispatchError::Handler(error) => match error.downcast::<HttpError>() {
                Ok(http) => Ok(http.to_response().into()),
                Err(error) => match &self.user_exception_handler {
                    Some(handler) => handler(ctx.request(), error).map_err(DispatchError::Handler),
                    None => Err(DispatchError::Handler(error)),
                },
            },
            other => Err(other),
        }
    }

    /// Normalize the raw result and run the after-request hooks.
    pub fn finalize_request(
        &self,
        ctx: &RequestContext,
        rv: ViewReturn,
    ) -> Result<Response, DispatchError> {
        let response = self.make_response(rv)?;
        Ok(self.process_response(ctx, response))
    }

    fn process_response(&self, ctx: &RequestContext, mut response: Response) -> Response {
        for hook in &self.after_request_funcs {
            response = hook(ctx.request(), response);
        }
        response
    }

    /// 200 with an `Allow` header listing the rule's methods, empty body.
    pub fn make_default_options_response(&self, rule: &Rule) -> Response {
        let allowed = rule.methods().map(join_methods).unwrap_or_else(|| "*".to_string());
        let mut response = Response::empty();
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            response.headers_mut().insert(header::ALLOW, value);
        }
        response
    }

    /// Last-resort translation of an escaped failure into a 500.
    pub fn handle_exception(&self, ctx: &RequestContext, error: DispatchError) -> Response {
        let request = ctx.request();
        tracing::error!(
            method = %request.method(),
            path = %request.path(),
            request_id = request.request_id().unwrap_or("unknown"),
            kind = error.kind(),
            error = %error,
            "Exception on request"
        );
        metrics::record_dispatch_error(error.kind());

        let description = if self.debug {
            error.to_string()
        } else {
            "The server encountered an internal error and was unable to complete your request."
                .to_string()
        };
        let server_error = || Response::error(StatusCode::INTERNAL_SERVER_ERROR, &description);

        panic::catch_unwind(AssertUnwindSafe(|| self.process_response(ctx, server_error())))
            .unwrap_or_else(|_| {
                tracing::error!("After-request hook panicked while handling an exception");
                server_error()
            })
    }

    /// The entry point: one environment in, one emitted response out.
    ///
    /// The request context is pushed for the duration of dispatch and popped
    /// exactly once before the response is emitted, whatever the outcome.
    pub fn wsgi_app(&self, environ: Environ, start_response: &mut dyn StartResponse) -> Body {
        let started = Instant::now();
        let ctx = self.request_context(environ);

        let response = {
            let _guard = ctx.push();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.full_dispatch_request(&ctx)));
            match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(error)) => self.handle_exception(&ctx, error),
                Err(payload) => {
                    self.handle_exception(&ctx, DispatchError::Panicked(panic_message(payload)))
                }
            }
        };

        let request = ctx.request();
        metrics::record_request(
            request.method().as_str(),
            response.status().as_u16(),
            request.endpoint().unwrap_or("none"),
            started,
        );
        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            status = response.status().as_u16(),
            "Request finished"
        );
        response.call(start_response)
    }

    /// Alias of [`App::wsgi_app`].
    pub fn call(&self, environ: Environ, start_response: &mut dyn StartResponse) -> Body {
        self.wsgi_app(environ, start_response)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
