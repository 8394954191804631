//! Route tables and route iteration.
//!
//! Two tables, each one ordered list of routes per method:
//!
//! - **before routes** run as route-scoped middleware: every match runs.
//! - **primary routes** run the first match only.
//!
//! Routes are tried in registration order. There is no tree and no
//! specificity ranking: registration order is the priority.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::context::Context;
use crate::controller::Controllers;
use crate::error::Error;
use crate::flow::Attempt;
use crate::handler::{ActionRef, Target};
use crate::method::Method;
use crate::pattern::{Params, Pattern};

/// One registration: a compiled pattern and what it invokes.
#[derive(Clone, Debug)]
pub(crate) struct Route {
    pub(crate) pattern: Pattern,
    pub(crate) target: Target,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Table {
    Before,
    Primary,
}

/// Result of running one table against a request.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Handled {
    /// Routes whose handler ran to completion or stopped.
    pub(crate) count: usize,
    /// A handler asked to stop the lifecycle.
    pub(crate) stopped: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Router {
    before: HashMap<Method, Vec<Route>>,
    routes: HashMap<Method, Vec<Route>>,
    /// Prefix of every pattern registered inside a `mount` callback.
    base_route: String,
    pub(crate) controllers: Controllers,
}

impl Router {
    /// `base + "/" + trim(pattern, "/")`, without a trailing `/` while mounted.
    pub(crate) fn full_pattern(&self, pattern: &str) -> String {
        let full = format!("{}/{}", self.base_route, pattern.trim_matches('/'));
        if self.base_route.is_empty() {
            full
        } else {
            full.trim_end_matches('/').to_owned()
        }
    }

    /// Registers `target` under every method in `methods`.
    ///
    /// # Panics
    ///
    /// Panics on an unknown method or a pattern that is not a valid regex.
    /// Both are programming errors in the route table.
    pub(crate) fn add(&mut self, table: Table, methods: &str, pattern: &str, target: Target) {
        let full = self.full_pattern(pattern);
        let methods = Method::parse_set(methods)
            .unwrap_or_else(|e| panic!("invalid route `{methods} {full}`: {e}"));
        let pattern = Pattern::new(&full)
            .unwrap_or_else(|e| panic!("invalid route `{full}`: {e}"));

        let routes = match table {
            Table::Before  => &mut self.before,
            Table::Primary => &mut self.routes,
        };
        for method in methods {
            debug!(%method, pattern = pattern.as_str(), ?table, "route registered");
            routes.entry(method).or_default().push(Route {
                pattern: pattern.clone(),
                target: target.clone(),
            });
        }
    }

    pub(crate) fn base_route(&self) -> &str {
        &self.base_route
    }

    pub(crate) fn set_base_route(&mut self, base: String) {
        self.base_route = base;
    }

    /// Number of routes registered in `table` for `method`.
    #[cfg(test)]
    pub(crate) fn len(&self, table: Table, method: Method) -> usize {
        let routes = match table {
            Table::Before  => &self.before,
            Table::Primary => &self.routes,
        };
        routes.get(&method).map_or(0, Vec::len)
    }

    /// Runs `table` for the request's effective method.
    ///
    /// With `first_only`, iteration ends at the first route that handles the
    /// request. A passed route does not count and iteration continues. A stop
    /// ends iteration in either mode.
    pub(crate) fn handle(&self, table: Table, cx: &mut Context<'_>, first_only: bool) -> Result<Handled, Error> {
        let mut handled = Handled::default();
        let Some(method) = cx.method() else {
            return Ok(handled);
        };
        let routes = match table {
            Table::Before  => self.before.get(&method),
            Table::Primary => self.routes.get(&method),
        };

        for route in routes.into_iter().flatten() {
            let Some(params) = route.pattern.captures(cx.path()) else {
                continue;
            };
            debug!(%method, path = cx.path(), pattern = route.pattern.as_str(), ?table, "route matched");

            match self.invoke(&route.target, cx, &params)? {
                Attempt::Handled => {
                    handled.count += 1;
                    if first_only {
                        break;
                    }
                }
                Attempt::Stopped => {
                    handled.count += 1;
                    handled.stopped = true;
                    break;
                }
                Attempt::Passed | Attempt::NoMatch => {}
            }
        }
        Ok(handled)
    }

    /// Calls a route target with its parameters.
    ///
    /// Descriptors resolve against the namespace currently in the settings.
    /// One that names no registered controller action is a soft failure: it
    /// is logged and the route is treated as not matching.
    pub(crate) fn invoke(&self, target: &Target, cx: &mut Context<'_>, params: &Params) -> Result<Attempt, Error> {
        let handler = match target {
            Target::Handler(handler) => handler,
            Target::Action(ActionRef { controller, action }) => {
                let namespace = cx.settings().namespace.as_str();
                match self.controllers.resolve(namespace, controller, action) {
                    Some(handler) => handler,
                    None => {
                        warn!(
                            controller = %controller,
                            action = %action,
                            namespace,
                            "unresolved controller action, skipping route"
                        );
                        return Ok(Attempt::NoMatch);
                    }
                }
            }
        };
        handler.call(cx, params).map(Attempt::from_flow)
    }
}
