//! View functions and their identity.

use std::any::TypeId;
use std::sync::Arc;

use crate::error::BoxError;
use crate::routing::ViewArgs;
use crate::wrappers::{Request, ViewReturn};

type ViewFn = dyn Fn(&Request, &ViewArgs) -> Result<ViewReturn, BoxError> + Send + Sync;

/// A cloneable handle to a view function.
///
/// Two handles are the same view when they share an allocation, or when both
/// wrap the same zero-sized function type (the same `fn` item or a capture-less
/// closure), so registering a plain function twice is recognised as a repeat.
///
/// Closures have no usable name; their endpoint is derived from the rule.
#[derive(Clone)]
pub struct View {
    name: Option<String>,
    func: Arc<ViewFn>,
    type_id: TypeId,
    zero_sized: bool,
}

impl View {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Request, &ViewArgs) -> Result<R, BoxError> + Send + Sync + 'static,
        R: Into<ViewReturn> + 'static,
    {
        let name = function_name::<F>();
        let type_id = TypeId::of::<F>();
        let zero_sized = std::mem::size_of::<F>() == 0;
        let func: Arc<ViewFn> = Arc::new(
            move |request: &Request, args: &ViewArgs| -> Result<ViewReturn, BoxError> {
                f(request, args).map(Into::into)
            },
        );
        Self {
            name,
            func,
            type_id,
            zero_sized,
        }
    }

    /// Name derived from the function's path, e.g. `helloworld`.
    ///
    /// `None` for closures.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, request: &Request, args: &ViewArgs) -> Result<ViewReturn, BoxError> {
        (self.func)(request, args)
    }

    pub fn is_same(&self, other: &View) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
            || (self.zero_sized && other.zero_sized && self.type_id == other.type_id)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View").field("name", &self.name).finish()
    }
}

/// Last path segment of the type name, generics stripped. `None` for closures.
fn function_name<F>() -> Option<String> {
    let full = std::any::type_name::<F>();
    let path = full.split('<').next().unwrap_or(full);
    let name = path.rsplit("::").next().unwrap_or(path);
    if name.is_empty() || name.starts_with('{') {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helloworld(_: &Request, _: &ViewArgs) -> Result<&'static str, BoxError> {
        Ok("hello")
    }

    fn goodbye(_: &Request, _: &ViewArgs) -> Result<&'static str, BoxError> {
        Ok("bye")
    }

    #[test]
    fn name_from_function() {
        assert_eq!(View::new(helloworld).name(), Some("helloworld"));
    }

    #[test]
    fn closures_are_anonymous() {
        let view = View::new(|_: &Request, _: &ViewArgs| -> Result<&'static str, BoxError> {
            Ok("hi")
        });
        assert_eq!(view.name(), None);
    }

    #[test]
    fn identity() {
        assert!(View::new(helloworld).is_same(&View::new(helloworld)));
        assert!(!View::new(helloworld).is_same(&View::new(goodbye)));

        let greeting = String::from("hi");
        let capturing = View::new(move |_, _| Ok(greeting.clone()));
        assert!(capturing.is_same(&capturing.clone()));

        let other = String::from("hi");
        let lookalike = View::new(move |_, _| Ok(other.clone()));
        assert!(!capturing.is_same(&lookalike));
    }
}
