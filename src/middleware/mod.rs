//! Middleware chain.
//!
//! Middleware wraps the whole request lifecycle. The chain is a stack: each
//! [`App::add`](crate::App::add) pushes a new outermost link whose `next` is
//! the previous head, and the innermost link is the application itself.
//!
//! ```text
//! add(A); add(B);
//!
//! B.call ─► A.call ─► app (hooks, routing, handlers)
//!   ▲         ▲            │
//!   └─────────┴────────────┘  response unwinds outwards
//! ```
//!
//! A link decides whether processing continues by calling [`Next::run`].
//! One that never calls it short-circuits every inner link, the application
//! included, and the response it leaves in the [`Context`] is what gets sent.
//!
//! Nesting is plain synchronous recursion, so stack depth equals chain length.
//!
//! Built-in middleware:
//! - [`Trace`]: per-request span with method, path, status, latency
//! - [`PrettyErrors`]: renders errors from inner links as an HTML page

mod pretty;
mod trace;

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::context::Context;
use crate::error::Error;

pub(crate) use pretty::escape;
pub use pretty::PrettyErrors;
pub use trace::Trace;

/// A request-processing stage.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use waypost::middleware::{Middleware, Next};
/// use waypost::{App, Context, Error};
///
/// struct PoweredBy;
///
/// impl Middleware for PoweredBy {
///     fn call(&self, cx: &mut Context<'_>, next: Next<'_>) -> Result<(), Error> {
///         next.run(cx)?;
///         cx.header("X-Powered-By", "waypost");
///         Ok(())
///     }
/// }
///
/// let mut app = App::new();
/// app.add(Arc::new(PoweredBy)).expect("added once");
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, cx: &mut Context<'_>, next: Next<'_>) -> Result<(), Error>;

    /// Name used in logs and configuration errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The rest of the chain below the current link.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    links: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(links: &'a [Arc<dyn Middleware>]) -> Self {
        Self { links }
    }

    /// Runs the next link, or the application when this is the innermost one.
    pub fn run(self, cx: &mut Context<'_>) -> Result<(), Error> {
        match self.links.split_first() {
            Some((head, rest)) => head.call(cx, Next::new(rest)),
            None => {
                let app = cx.app();
                app.call(cx)
            }
        }
    }

    /// `true` when the next link is the application itself.
    pub fn is_app(&self) -> bool {
        self.links.is_empty()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.links.iter().map(|m| m.name())).finish()
    }
}

/// The application's middleware links, outermost first.
#[derive(Clone, Default)]
pub(crate) struct Chain {
    links: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    /// Makes `middleware` the new head.
    ///
    /// Fails with [`Error::CircularMiddleware`] if this very instance is
    /// already linked; the chain is left unchanged.
    pub(crate) fn add(&mut self, middleware: Arc<dyn Middleware>) -> Result<(), Error> {
        if self.links.iter().any(|m| Arc::ptr_eq(m, &middleware)) {
            return Err(Error::CircularMiddleware(middleware.name()));
        }
        info!(middleware = middleware.name(), depth = self.links.len() + 1, "middleware added");
        self.links.insert(0, middleware);
        Ok(())
    }

    pub(crate) fn head(&self) -> Next<'_> {
        Next::new(&self.links)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.head().fmt(f)
    }
}
