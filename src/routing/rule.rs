//! URL rule definitions.
//!
//! # Design Decisions
//! - A rule is immutable once built; the registry shares it behind `Arc`
//! - Methods are kept sorted and deduplicated so `Allow` headers are stable
//! - `None` methods means the rule accepts any method

use axum::http::Method;

/// A registered (pattern, methods, endpoint) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pattern: String,
    endpoint: String,
    methods: Option<Vec<Method>>,
    provide_automatic_options: bool,
}

impl Rule {
    /// Create a rule. Pattern syntax is the matcher's: `/users/{id}`, `/static/{*path}`.
    pub fn new(
        pattern: impl Into<String>,
        endpoint: impl Into<String>,
        methods: Option<Vec<Method>>,
        provide_automatic_options: bool,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            endpoint: endpoint.into(),
            methods: methods.map(normalize_methods),
            provide_automatic_options,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Allowed methods, or `None` when any method is accepted.
    pub fn methods(&self) -> Option<&[Method]> {
        self.methods.as_deref()
    }

    /// Whether OPTIONS requests are answered without calling the view.
    pub fn provide_automatic_options(&self) -> bool {
        self.provide_automatic_options
    }

    /// Returns true if the rule accepts the method.
    pub fn allows(&self, method: &Method) -> bool {
        match &self.methods {
            None => true,
            Some(methods) => {
                methods.contains(method)
                    || (*method == Method::HEAD && methods.contains(&Method::GET))
            }
        }
    }

    /// Methods this rule claims for conflict detection.
    ///
    /// HEAD implied by GET and automatic OPTIONS are shared and never conflict.
    fn claimed(&self) -> Vec<&Method> {
        let Some(methods) = &self.methods else {
            return Vec::new();
        };
        let has_get = methods.contains(&Method::GET);
        methods
            .iter()
            .filter(|m| !(has_get && **m == Method::HEAD))
            .filter(|m| !(self.provide_automatic_options && **m == Method::OPTIONS))
            .collect()
    }

    /// First method both rules claim, `"*"` when either accepts everything.
    pub(crate) fn overlap(&self, other: &Rule) -> Option<String> {
        if self.methods.is_none() || other.methods.is_none() {
            return Some("*".to_string());
        }
        let theirs = other.claimed();
        self.claimed()
            .into_iter()
            .find(|m| theirs.contains(m))
            .map(|m| m.to_string())
    }
}

fn normalize_methods(mut methods: Vec<Method>) -> Vec<Method> {
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods.dedup();
    methods
}

/// Options accepted by `add_url_rule` and `route`.
#[derive(Debug, Clone, Default)]
pub struct RuleOptions {
    /// Endpoint override; derived from the view's name when absent.
    pub endpoint: Option<String>,
    /// Allowed methods; absence means GET (plus automatic HEAD and OPTIONS).
    pub methods: Option<Vec<Method>>,
    /// Force automatic OPTIONS handling on or off.
    pub provide_automatic_options: Option<bool>,
}

impl RuleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    pub fn automatic_options(mut self, enabled: bool) -> Self {
        self.provide_automatic_options = Some(enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods_sorted_and_deduped() {
        let rule = Rule::new(
            "/",
            "index",
            Some(vec![Method::POST, Method::GET, Method::POST]),
            false,
        );
        assert_eq!(rule.methods().unwrap(), &[Method::GET, Method::POST]);
    }

    #[test]
    fn test_head_allowed_with_get() {
        let rule = Rule::new("/", "index", Some(vec![Method::GET]), false);
        assert!(rule.allows(&Method::HEAD));
        assert!(!rule.allows(&Method::DELETE));

        let any = Rule::new("/", "index", None, false);
        assert!(any.allows(&Method::DELETE));
    }

    #[test]
    fn test_overlap_ignores_implied_methods() {
        let get = Rule::new(
            "/items",
            "list",
            Some(vec![Method::GET, Method::HEAD, Method::OPTIONS]),
            true,
        );
        let post = Rule::new(
            "/items",
            "create",
            Some(vec![Method::POST, Method::OPTIONS]),
            true,
        );
        assert_eq!(get.overlap(&post), None);

        let other_get = Rule::new("/items", "other", Some(vec![Method::GET]), false);
        assert_eq!(get.overlap(&other_get), Some("GET".to_string()));
    }
}
