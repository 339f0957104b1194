//! Rule registry backed by the `matchit` radix tree.
//!
//! # Responsibilities
//! - Store rules, grouped by pattern (one matcher entry per pattern)
//! - Resolve path + method to a rule and its view arguments
//! - Report not-found, method-not-allowed and trailing-slash redirects
//! - Build URLs back from an endpoint and values
//!
//! # Design Decisions
//! - Pattern compilation and precedence belong to `matchit`; this module only
//!   layers method filtering and redirects on top
//! - Several rules may share a pattern as long as their methods do not overlap
//! - First registered rule that accepts the method wins

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{BuildError, RoutingError, RuleError};
use crate::routing::{Rule, ViewArgs};

/// Bytes escaped in a built path; `/` is kept.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Bytes escaped in a single segment value.
const SEGMENT: &AsciiSet = &PATH.add(b'/');

/// Rules registered under one pattern.
#[derive(Debug)]
struct PatternEntry {
    rules: Vec<Arc<Rule>>,
}

impl PatternEntry {
    fn allowed_methods(&self) -> Vec<Method> {
        let mut allowed: Vec<Method> = Vec::new();
        for rule in &self.rules {
            for method in rule.methods().unwrap_or_default() {
                if !allowed.contains(method) {
                    allowed.push(method.clone());
                }
            }
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }
}

/// The URL map: every rule the application knows about.
#[derive(Default)]
pub struct Map {
    matcher: matchit::Router<usize>,
    entries: Vec<PatternEntry>,
    by_pattern: HashMap<String, usize>,
    by_endpoint: HashMap<String, Vec<Arc<Rule>>>,
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("rules", &self.iter_rules().collect::<Vec<_>>())
            .finish()
    }
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule.
    ///
    /// Re-adding an identical rule returns the existing one.
    pub fn add(&mut self, rule: Rule) -> Result<Arc<Rule>, RuleError> {
        if !rule.pattern().starts_with('/') {
            return Err(RuleError::InvalidPattern {
                pattern: rule.pattern().to_string(),
                reason: "patterns must start with a slash".to_string(),
            });
        }

        let index = match self.by_pattern.get(rule.pattern()) {
            Some(&index) => {
                let entry = &self.entries[index];
                if let Some(existing) = entry.rules.iter().find(|r| ***r == rule) {
                    return Ok(Arc::clone(existing));
                }
                for existing in &entry.rules {
                    if existing.endpoint() == rule.endpoint() {
                        continue;
                    }
                    if let Some(method) = existing.overlap(&rule) {
                        return Err(RuleError::Conflict {
                            pattern: rule.pattern().to_string(),
                            method,
                            existing: existing.endpoint().to_string(),
                        });
                    }
                }
                index
            }
            None => {
                let index = self.entries.len();
                self.matcher
                    .insert(rule.pattern(), index)
                    .map_err(|e| RuleError::InvalidPattern {
                        pattern: rule.pattern().to_string(),
                        reason: e.to_string(),
                    })?;
                self.entries.push(PatternEntry { rules: Vec::new() });
                self.by_pattern.insert(rule.pattern().to_string(), index);
                index
            }
        };

        let rule = Arc::new(rule);
        self.entries[index].rules.push(Arc::clone(&rule));
        self.by_endpoint
            .entry(rule.endpoint().to_string())
            .or_default()
            .push(Arc::clone(&rule));

        tracing::debug!(
            pattern = %rule.pattern(),
            endpoint = %rule.endpoint(),
            methods = ?rule.methods(),
            "Rule registered"
        );
        Ok(rule)
    }

    /// Resolve a request path and method.
    ///
    /// `query` is only used to carry the query string over a redirect.
    pub fn match_request(
        &self,
        path: &str,
        method: &Method,
        query: Option<&str>,
    ) -> Result<(Arc<Rule>, ViewArgs), RoutingError> {
        let matched = match self.matcher.at(path) {
            Ok(matched) => matched,
            Err(_) => {
                return Err(self
                    .slash_redirect(path, query)
                    .unwrap_or(RoutingError::NotFound))
            }
        };

        let entry = &self.entries[*matched.value];
        let args: ViewArgs = matched.params.iter().collect();

        match entry.rules.iter().find(|rule| rule.allows(method)) {
            Some(rule) => Ok((Arc::clone(rule), args)),
            None => Err(RoutingError::MethodNotAllowed {
                allowed: entry.allowed_methods(),
            }),
        }
    }

    /// Methods accepted on a path across all of its rules.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.matcher
            .at(path)
            .map(|matched| self.entries[*matched.value].allowed_methods())
            .unwrap_or_default()
    }

    fn slash_redirect(&self, path: &str, query: Option<&str>) -> Option<RoutingError> {
        if path.ends_with('/') {
            return None;
        }
        let candidate = format!("{path}/");
        self.matcher.at(&candidate).ok()?;
        let candidate = utf8_percent_encode(&candidate, PATH).to_string();
        let location = match query {
            Some(query) if !query.is_empty() => format!("{candidate}?{query}"),
            _ => candidate,
        };
        Some(RoutingError::Redirect { location })
    }

    /// Build the URL for an endpoint.
    ///
    /// Values fill the placeholders of the endpoint's first rule,
    /// percent-encoded (`/` survives only in catch-all values); values without
    /// a placeholder are appended as a query string.
    pub fn build(&self, endpoint: &str, values: &ViewArgs) -> Result<String, BuildError> {
        let rule = self
            .by_endpoint
            .get(endpoint)
            .and_then(|rules| rules.first())
            .ok_or_else(|| BuildError::UnknownEndpoint(endpoint.to_string()))?;

        let mut used = Vec::new();
        let mut url = String::with_capacity(rule.pattern().len());
        let mut rest = rule.pattern();

        while let Some(start) = rest.find('{') {
            push_literal(&mut url, &rest[..start]);
            let after = &rest[start + 1..];
            if let Some(escaped) = after.strip_prefix('{') {
                push_literal(&mut url, "{");
                rest = escaped;
                continue;
            }
            let end = after.find('}').unwrap_or(after.len());
            let placeholder = &after[..end];
            let (name, set) = match placeholder.strip_prefix('*') {
                Some(name) => (name, PATH),
                None => (placeholder, SEGMENT),
            };
            let value = values.get(name).ok_or_else(|| BuildError::MissingValue {
                endpoint: endpoint.to_string(),
                param: name.to_string(),
            })?;
            url.extend(utf8_percent_encode(value, set));
            used.push(name);
            rest = after.get(end + 1..).unwrap_or("");
        }
        push_literal(&mut url, rest);

        let extra: Vec<(&str, &str)> = values
            .iter()
            .filter(|(name, _)| !used.contains(name))
            .collect();
        if !extra.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(extra)
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }

    /// All rules in registration order of their patterns.
    pub fn iter_rules(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.entries.iter().flat_map(|entry| entry.rules.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append a literal pattern chunk, unescaping `}}` and encoding the rest.
fn push_literal(url: &mut String, chunk: &str) {
    url.extend(utf8_percent_encode(&chunk.replace("}}", "}"), PATH));
}
