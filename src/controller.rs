//! Controllers: named groups of actions addressed as `Controller@action`.
//!
//! A route may name its handler with a descriptor string instead of a
//! closure. Descriptors resolve against the controllers registered on the
//! app, qualified by the app's namespace when one is set:
//!
//! ```rust
//! use waypost::{App, Context, Controller, Params};
//!
//! fn index(cx: &mut Context<'_>, _: &Params) {
//!     cx.write("all posts");
//! }
//!
//! fn show(cx: &mut Context<'_>, params: &Params) {
//!     let id = params.get(0).unwrap_or_default();
//!     cx.write(format!("post {id}"));
//! }
//!
//! let mut app = App::new();
//! app.controller(Controller::new("PostController").action("index", index).action("show", show));
//! app.get_action("/posts", "PostController@index");
//! app.get_action("/posts/{id}", "PostController@show");
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::context::Context;
use crate::flow::IntoFlow;
use crate::handler::{self, BoxedHandler};
use crate::pattern::Params;

/// A named set of actions.
pub struct Controller {
    name: String,
    actions: HashMap<String, BoxedHandler>,
}

impl Controller {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), actions: HashMap::new() }
    }

    /// Adds an action. A later action with the same name replaces it.
    pub fn action<F, R>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.actions.insert(name.to_owned(), handler::boxed(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `name` can be addressed as `Controller@name`.
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub(crate) fn get(&self, action: &str) -> Option<&BoxedHandler> {
        self.actions.get(action)
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("actions", &actions)
            .finish()
    }
}

/// Registered controllers, keyed by (optionally namespaced) name.
#[derive(Debug, Default)]
pub(crate) struct Controllers {
    by_name: HashMap<String, Controller>,
}

impl Controllers {
    pub(crate) fn insert(&mut self, controller: Controller) {
        self.by_name.insert(controller.name.clone(), controller);
    }

    /// Looks up `controller@action`, prefixing `namespace::` when the
    /// namespace is non-empty.
    pub(crate) fn resolve(&self, namespace: &str, controller: &str, action: &str) -> Option<&BoxedHandler> {
        let found = if namespace.is_empty() {
            self.by_name.get(controller)
        } else {
            self.by_name.get(&format!("{namespace}::{controller}"))
        };
        found?.get(action)
    }
}
