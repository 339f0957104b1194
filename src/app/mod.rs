//! Application core.
//!
//! # Data Flow
//! ```text
//! Environ (from the server runner)
//!     → wsgi_app: RequestContext built (URL matched), pushed on the stack
//!     → full_dispatch_request
//!         → dispatch_request: routing error | automatic OPTIONS | view call
//!         → handle_user_exception on failure (HTTP errors, user hook)
//!         → finalize_request: make_response + after-request hooks
//!     → handle_exception on anything that escaped (500)
//!     → context popped
//!     → Response::call(start_response) → body back to the transport
//! ```
//!
//! # Design Decisions
//! - Registration needs `&mut App`; serving shares an immutable `Arc<App>`
//! - The request context is passed explicitly through every dispatch step
//! - Failures never escape `wsgi_app`; the worst case is one 500 response

mod dispatch;
mod response;
mod view;

pub use view::View;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::config::AppConfig;
use crate::error::{BoxError, BuildError, RegisterError, ServeError};
use crate::routing::{Map, Rule, RuleOptions, ViewArgs};
use crate::testing::TestClient;
use crate::wrappers::{Request, Response, ViewReturn};

type UserExceptionHandler =
    dyn Fn(&Request, BoxError) -> Result<ViewReturn, BoxError> + Send + Sync;
type AfterRequestFn = dyn Fn(&Request, Response) -> Response + Send + Sync;

/// Options for [`App::run`]. Unset fields fall back to the configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: Option<bool>,
}

/// The application object: URL map, endpoint map, configuration and hooks.
pub struct App {
    url_map: Map,
    view_functions: HashMap<String, View>,
    config: AppConfig,
    debug: bool,
    user_exception_handler: Option<Box<UserExceptionHandler>>,
    after_request_funcs: Vec<Box<AfterRequestFn>>,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            url_map: Map::new(),
            view_functions: HashMap::new(),
            debug: config.debug,
            config,
            user_exception_handler: None,
            after_request_funcs: Vec::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn url_map(&self) -> &Map {
        &self.url_map
    }

    /// The view bound to an endpoint.
    pub fn view_function(&self, endpoint: &str) -> Option<&View> {
        self.view_functions.get(endpoint)
    }

    /// Register a URL rule and, if given, bind its endpoint to `view`.
    ///
    /// The endpoint comes from `endpoint`, then `options.endpoint`, then the
    /// view's function name. Closures get `"<METHODS> <pattern>"`, e.g.
    /// `"POST /items"`. Methods default to GET; HEAD is added alongside GET, and
    /// OPTIONS is answered automatically unless the rule lists it. An empty
    /// method list accepts any method.
    pub fn add_url_rule(
        &mut self,
        pattern: &str,
        endpoint: Option<&str>,
        view: Option<View>,
        options: RuleOptions,
    ) -> Result<Arc<Rule>, RegisterError> {
        let endpoint = endpoint
            .map(str::to_string)
            .or(options.endpoint)
            .or_else(|| {
                view.as_ref().map(|v| match v.name() {
                    Some(name) => name.to_string(),
                    None => anonymous_endpoint(pattern, options.methods.as_deref()),
                })
            })
            .ok_or_else(|| RegisterError::MissingEndpoint(pattern.to_string()))?;

        if let (Some(view), Some(existing)) = (&view, self.view_functions.get(&endpoint)) {
            if !existing.is_same(view) {
                return Err(RegisterError::EndpointConflict(endpoint));
            }
        }

        let rule = match options.methods {
            Some(methods) if methods.is_empty() => Rule::new(
                pattern,
                endpoint.as_str(),
                None,
                options.provide_automatic_options.unwrap_or(false),
            ),
            methods => {
                let mut methods = methods.unwrap_or_else(|| vec![Method::GET]);
                if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
                    methods.push(Method::HEAD);
                }
                let automatic_options = options
                    .provide_automatic_options
                    .unwrap_or_else(|| !methods.contains(&Method::OPTIONS));
                if automatic_options && !methods.contains(&Method::OPTIONS) {
                    methods.push(Method::OPTIONS);
                }
                Rule::new(pattern, endpoint.as_str(), Some(methods), automatic_options)
            }
        };

        let rule = self.url_map.add(rule)?;
        if let Some(view) = view {
            self.view_functions.insert(endpoint, view);
        }
        Ok(rule)
    }

    /// Register `f` for `pattern`, returning its handle for re-use.
    pub fn route<F, R>(
        &mut self,
        pattern: &str,
        options: RuleOptions,
        f: F,
    ) -> Result<View, RegisterError>
    where
        F: Fn(&Request, &ViewArgs) -> Result<R, BoxError> + Send + Sync + 'static,
        R: Into<ViewReturn> + 'static,
    {
        let view = View::new(f);
        self.add_url_rule(pattern, None, Some(view.clone()), options)?;
        Ok(view)
    }

    /// Build the URL for an endpoint.
    pub fn url_for(&self, endpoint: &str, values: &ViewArgs) -> Result<String, BuildError> {
        self.url_map.build(endpoint, values)
    }

    /// Install the hook that turns view errors into responses.
    ///
    /// Without a hook, view errors escape dispatch and become a 500.
    pub fn on_user_exception<F>(&mut self, f: F)
    where
        F: Fn(&Request, BoxError) -> Result<ViewReturn, BoxError> + Send + Sync + 'static,
    {
        self.user_exception_handler = Some(Box::new(f));
    }

    /// Register a hook applied to every finalized response, in registration order.
    pub fn after_request<F>(&mut self, f: F)
    where
        F: Fn(&Request, Response) -> Response + Send + Sync + 'static,
    {
        self.after_request_funcs.push(Box::new(f));
    }

    /// An in-process client driving `wsgi_app` directly.
    pub fn test_client(&self) -> TestClient<'_> {
        TestClient::new(self)
    }

    /// Serve the application until shutdown.
    ///
    /// Host and port default to the configured `127.0.0.1:5000`.
    pub async fn run(mut self, options: RunOptions) -> Result<(), ServeError> {
        let host = options
            .host
            .unwrap_or_else(|| self.config.server.host.clone());
        let port = options.port.unwrap_or(self.config.server.port);
        if let Some(debug) = options.debug {
            self.debug = debug;
        }
        crate::serving::run_simple(self, &host, port).await
    }
}

/// Endpoint for a view without a function name.
fn anonymous_endpoint(pattern: &str, methods: Option<&[Method]>) -> String {
    let methods = match methods {
        None => Method::GET.as_str().to_string(),
        Some([]) => "*".to_string(),
        Some(methods) => {
            let mut names: Vec<&str> = methods.iter().map(Method::as_str).collect();
            names.sort_unstable();
            names.dedup();
            names.join(",")
        }
    };
    format!("{methods} {pattern}")
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("url_map", &self.url_map)
            .field("endpoints", &self.view_functions.keys().collect::<Vec<_>>())
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
