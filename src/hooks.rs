//! Named, prioritised hook listeners.
//!
//! The dispatcher fires six lifecycle hooks per request, in this order:
//!
//! | Hook | Fired |
//! |---|---|
//! | [`BEFORE`] | on entering the innermost link of the middleware chain |
//! | [`BEFORE_ROUTER`] | before the method is resolved |
//! | [`BEFORE_DISPATCH`] | after before-routes ran, before primary routes |
//! | [`AFTER_DISPATCH`] | after primary routes |
//! | [`AFTER_ROUTER`] | after the not-found fallback |
//! | [`AFTER`] | last, before the context unwinds through middleware |
//!
//! Applications may register and fire hooks under any other name.
//!
//! Listeners run in ascending priority (lower first), and in registration
//! order within one priority. There is no isolation between them: the first
//! listener to fail ends the invocation and its error reaches the caller.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::flow::{Flow, IntoFlow};

pub const BEFORE: &str = "before";
pub const BEFORE_ROUTER: &str = "before.router";
pub const BEFORE_DISPATCH: &str = "before.dispatch";
pub const AFTER_DISPATCH: &str = "after.dispatch";
pub const AFTER_ROUTER: &str = "after.router";
pub const AFTER: &str = "after";

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: i32 = 10;

const LIFECYCLE: [&str; 6] = [BEFORE, BEFORE_ROUTER, BEFORE_DISPATCH, AFTER_DISPATCH, AFTER_ROUTER, AFTER];

type ListenerFn = dyn Fn(&mut Context<'_>) -> Result<Flow, Error> + Send + Sync;

/// A registered hook listener.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        Self(Arc::new(move |cx: &mut Context<'_>| f(cx).into_flow()))
    }

    pub fn call(&self, cx: &mut Context<'_>) -> Result<Flow, Error> {
        (self.0)(cx)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener(..)")
    }
}

/// Listeners of one hook, bucketed by priority.
pub type Priorities = BTreeMap<i32, Vec<Listener>>;

/// The hook registry.
#[derive(Clone, Debug)]
pub struct Hooks {
    hooks: BTreeMap<String, Priorities>,
}

impl Hooks {
    /// A registry with the six lifecycle hooks present and empty.
    pub fn new() -> Self {
        let hooks = LIFECYCLE.iter().map(|name| ((*name).to_owned(), Priorities::new())).collect();
        Self { hooks }
    }

    /// Appends `listener` to `name` at `priority`.
    pub fn add(&mut self, name: &str, listener: Listener, priority: i32) {
        self.hooks
            .entry(name.to_owned())
            .or_default()
            .entry(priority)
            .or_default()
            .push(listener);
    }

    /// Runs every listener of `name`, lowest priority first.
    ///
    /// A listener returning [`Flow::Stop`] ends the invocation and the stop
    /// is returned to the caller; [`Flow::Pass`] has no meaning here and is
    /// treated as [`Flow::Continue`]. Unknown names are a no-op.
    pub fn invoke(&self, name: &str, cx: &mut Context<'_>) -> Result<Flow, Error> {
        let Some(priorities) = self.hooks.get(name) else {
            return Ok(Flow::Continue);
        };
        debug!(hook = name, listeners = self.len(name), "applying hook");
        for listener in priorities.values().flatten() {
            if listener.call(cx)? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Listeners of one hook, or `None` if the name was never registered.
    pub fn get(&self, name: &str) -> Option<&Priorities> {
        self.hooks.get(name)
    }

    /// Every known hook name with its listeners.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Priorities)> {
        self.hooks.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of listeners registered under `name`.
    pub fn len(&self, name: &str) -> usize {
        self.hooks.get(name).map_or(0, |p| p.values().map(Vec::len).sum())
    }

    /// Removes the listeners of `name`, or of every hook when `None`.
    ///
    /// Hook names stay known; only their listener lists are emptied.
    pub fn clear(&mut self, name: Option<&str>) {
        match name {
            Some(name) => {
                if let Some(p) = self.hooks.get_mut(name) {
                    p.clear();
                }
            }
            None => self.hooks.values_mut().for_each(BTreeMap::clear),
        }
    }
}

impl Default for Hooks {
    fn default() -> Self { Self::new() }
}
