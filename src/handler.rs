//! Handler type erasure.
//!
//! Route tables hold handlers of many closure types side by side, so each one
//! is wrapped once at registration and stored behind a trait object:
//!
//! ```text
//! |cx, params| { … }                  ← user writes this
//!        ↓ app.get("/", handler)
//! boxed(handler)                      ← FnHandler(handler) in an Arc
//!        ↓ stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(cx, params)            ← one vtable dispatch per request
//!        ↓
//! (self.0)(cx, params).into_flow()    ← Result<Flow, Error>
//! ```
//!
//! Registration methods bound their argument with the `Fn` signature itself
//! rather than a helper trait, so closure parameter types are inferred.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::flow::{Flow, IntoFlow};
use crate::pattern::Params;

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedHandler: Send + Sync {
    fn call(&self, cx: &mut Context<'_>, params: &Params) -> Result<Flow, Error>;
}

/// A heap-allocated, type-erased handler shared by every request.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Erases a handler closure.
pub(crate) fn boxed<F, R>(handler: F) -> BoxedHandler
where
    F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
    R: IntoFlow,
{
    Arc::new(FnHandler(handler))
}

/// Bridges a concrete closure to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync,
    R: IntoFlow,
{
    fn call(&self, cx: &mut Context<'_>, params: &Params) -> Result<Flow, Error> {
        (self.0)(cx, params).into_flow()
    }
}

// ── Route targets ─────────────────────────────────────────────────────────────

/// What a route invokes when its pattern matches.
#[derive(Clone)]
pub(crate) enum Target {
    /// A closure registered directly.
    Handler(BoxedHandler),
    /// A `Controller@action` descriptor, looked up when the route matches.
    Action(ActionRef),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler(..)"),
            Self::Action(a)  => write!(f, "Action({a})"),
        }
    }
}

/// A parsed `Controller@action` descriptor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionRef {
    pub controller: String,
    pub action: String,
}

impl ActionRef {
    /// Splits `"PostController@show"` at the first `@`.
    ///
    /// Returns `None` when there is no `@`.
    pub fn parse(descriptor: &str) -> Option<Self> {
        let (controller, action) = descriptor.split_once('@')?;
        Some(Self { controller: controller.to_owned(), action: action.to_owned() })
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.controller, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_descriptors_split_at_first_at() {
        let a = ActionRef::parse("Admin@users@list").unwrap();
        assert_eq!(a.controller, "Admin");
        assert_eq!(a.action, "users@list");
        assert!(ActionRef::parse("NoAction").is_none());
    }
}
