//! The application: route tables, hooks, middleware and the request
//! lifecycle that sequences them.
//!
//! ```text
//! App::run(request)
//!   └─ [PrettyErrors]  (debug only, outermost)
//!       └─ middleware, last added first
//!           └─ App::call                     fault trap around everything below
//!               ├─ hook  before
//!               ├─ hook  before.router
//!               ├─ resolve method            HEAD → GET, POST + override header
//!               ├─ before routes             every match runs
//!               ├─ hook  before.dispatch
//!               ├─ primary routes            first match only
//!               ├─ hook  after.dispatch
//!               ├─ not-found handler         when no primary route handled it
//!               ├─ hook  after.router
//!               └─ hook  after
//!   └─ finalize                              HEAD drops the body
//! ```
//!
//! A [`Flow::Stop`] from any hook listener or handler ends the lifecycle at
//! that point; whatever was written so far is the response.
//!
//! Configuration happens through `&mut App` before serving. Once wrapped in
//! an `Arc` for [`Server`](crate::Server) the app is read-only, so route
//! tables, hooks and middleware cannot change under live traffic.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::Settings;
use crate::context::Context;
use crate::controller::Controller;
use crate::error::Error;
use crate::flow::{Flow, IntoFlow};
use crate::handler::{self, ActionRef, BoxedHandler, Target};
use crate::hooks::{self, Hooks, Listener, DEFAULT_PRIORITY};
use crate::method::Method;
use crate::middleware::{Chain, Middleware, PrettyErrors};
use crate::pattern::Params;
use crate::request::Request;
use crate::response::{ContentType, Finalized};
use crate::router::{Router, Table};
use crate::status::Status;

type ErrorHandler = dyn Fn(&mut Context<'_>, &Error) + Send + Sync;

/// Outcome of [`App::run`].
#[derive(Clone, Debug)]
pub struct Dispatched {
    pub response: Finalized,
    /// Whether a primary route handled the request.
    pub handled: bool,
}

pub struct App {
    settings: Settings,
    hooks: Hooks,
    chain: Chain,
    router: Router,
    not_found: Option<BoxedHandler>,
    error_handler: Option<Arc<ErrorHandler>>,
}

impl App {
    /// An app with default settings, `WAYPOST_MODE` applied.
    pub fn new() -> Self {
        let mut settings = Settings::default();
        settings.apply_env();
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            hooks: Hooks::new(),
            chain: Chain::default(),
            router: Router::default(),
            not_found: None,
            error_handler: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Runs `configure` only when the app is in `mode`.
    pub fn configure_mode(&mut self, mode: &str, configure: impl FnOnce(&mut Self)) -> &mut Self {
        if self.settings.mode == mode {
            configure(self);
        }
        self
    }

    // ── Hooks ─────────────────────────────────────────────────────────────────

    /// Adds a listener to hook `name` at the default priority.
    pub fn hook<F, R>(&mut self, name: &str, listener: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.hook_with_priority(name, DEFAULT_PRIORITY, listener)
    }

    /// Adds a listener to hook `name`. Lower priorities run first.
    pub fn hook_with_priority<F, R>(&mut self, name: &str, priority: i32, listener: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.hooks.add(name, Listener::new(listener), priority);
        self
    }

    /// Fires hook `name` now. Used for application-defined hooks.
    pub fn apply_hook(&self, name: &str, cx: &mut Context<'_>) -> Result<Flow, Error> {
        self.hooks.invoke(name, cx)
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Empties one hook, or all of them.
    pub fn clear_hooks(&mut self, name: Option<&str>) {
        self.hooks.clear(name);
    }

    // ── Middleware ────────────────────────────────────────────────────────────

    /// Wraps everything added so far in `middleware`.
    ///
    /// # Errors
    ///
    /// [`Error::CircularMiddleware`] if this very instance was already added.
    /// The error is fatal: the app is miswired and should not be served.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) -> Result<(), Error> {
        self.chain.add(middleware)
    }

    // ── Routes ────────────────────────────────────────────────────────────────

    /// Registers `handler` for every method in the `|`-separated `methods`.
    ///
    /// # Panics
    ///
    /// Panics on an unknown method or an invalid pattern.
    pub fn on<F, R>(&mut self, methods: &str, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.router.add(Table::Primary, methods, pattern, Target::Handler(handler::boxed(handler)));
        self
    }

    /// Registers a before route: it runs ahead of the primary routes, and
    /// every before route that matches runs.
    pub fn before<F, R>(&mut self, methods: &str, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.router.add(Table::Before, methods, pattern, Target::Handler(handler::boxed(handler)));
        self
    }

    pub fn get<F, R>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.on("GET", pattern, handler)
    }

    pub fn post<F, R>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.on("POST", pattern, handler)
    }

    pub fn put<F, R>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.on("PUT", pattern, handler)
    }

    pub fn patch<F, R>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.on("PATCH", pattern, handler)
    }

    pub fn delete<F, R>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.on("DELETE", pattern, handler)
    }

    pub fn options<F, R>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.on("OPTIONS", pattern, handler)
    }

    /// Registers `handler` for every method in [`Method::ANY`].
    pub fn all<F, R>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.on(Method::ANY, pattern, handler)
    }

    /// Registers a `Controller@action` descriptor as a primary route.
    ///
    /// The controller does not need to exist yet; it is looked up when the
    /// route matches.
    ///
    /// # Panics
    ///
    /// Panics if `descriptor` has no `@`, on an unknown method or on an
    /// invalid pattern.
    pub fn on_action(&mut self, methods: &str, pattern: &str, descriptor: &str) -> &mut Self {
        let action = ActionRef::parse(descriptor)
            .unwrap_or_else(|| panic!("invalid route `{pattern}`: `{descriptor}` is not `Controller@action`"));
        self.router.add(Table::Primary, methods, pattern, Target::Action(action));
        self
    }

    pub fn get_action(&mut self, pattern: &str, descriptor: &str) -> &mut Self {
        self.on_action("GET", pattern, descriptor)
    }

    pub fn post_action(&mut self, pattern: &str, descriptor: &str) -> &mut Self {
        self.on_action("POST", pattern, descriptor)
    }

    /// Registers the conventional CRUD routes of `controller` under `pattern`:
    ///
    /// | Methods | Path | Action |
    /// |---|---|---|
    /// | `GET\|HEAD` | `pattern` | `index` |
    /// | `POST` | `pattern` | `store` |
    /// | `GET\|HEAD` | `pattern/create` | `create` |
    /// | `POST\|DELETE` | `pattern/{id}/delete` | `destroy` |
    /// | `POST\|PUT\|PATCH` | `pattern/{id}/edit` | `update` |
    /// | `GET\|HEAD` | `pattern/{id}/edit` | `edit` |
    /// | `GET\|HEAD` | `pattern/{id}` | `show` |
    pub fn resource(&mut self, pattern: &str, controller: &str) -> &mut Self {
        let base = pattern.trim_end_matches('/');
        let routes = [
            ("GET|HEAD", base.to_owned(), "index"),
            ("POST", base.to_owned(), "store"),
            ("GET|HEAD", format!("{base}/create"), "create"),
            ("POST|DELETE", format!("{base}/{{id}}/delete"), "destroy"),
            ("POST|PUT|PATCH", format!("{base}/{{id}}/edit"), "update"),
            ("GET|HEAD", format!("{base}/{{id}}/edit"), "edit"),
            ("GET|HEAD", format!("{base}/{{id}}"), "show"),
        ];
        for (methods, path, action) in routes {
            let target = Target::Action(ActionRef {
                controller: controller.to_owned(),
                action: action.to_owned(),
            });
            self.router.add(Table::Primary, methods, &path, target);
        }
        self
    }

    /// Answers GET `from` with a redirect to `to`.
    pub fn redirect(&mut self, from: &str, to: &str, status: impl Into<Status>) -> &mut Self {
        let to = to.to_owned();
        let status = status.into();
        self.get(from, move |cx, _| cx.redirect(&to, status))
    }

    /// Registers the routes added by `routes` under `prefix`.
    pub fn mount(&mut self, prefix: &str, routes: impl FnOnce(&mut Self)) -> &mut Self {
        let saved = self.router.base_route().to_owned();
        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            self.router.set_base_route(format!("{saved}/{prefix}"));
        }
        routes(self);
        self.router.set_base_route(saved);
        self
    }

    /// Makes `controller` available to `Controller@action` routes.
    ///
    /// With a namespace set, register it under its qualified name
    /// (`Admin::Posts`).
    pub fn controller(&mut self, controller: Controller) -> &mut Self {
        info!(controller = controller.name(), "controller registered");
        self.router.controllers.insert(controller);
        self
    }

    /// Namespace qualifying controller names at dispatch.
    pub fn set_namespace(&mut self, namespace: &str) -> &mut Self {
        self.settings.namespace = namespace.trim_matches(':').to_owned();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// Prefix removed from request URIs before routing.
    pub fn set_base_path(&mut self, base_path: &str) -> &mut Self {
        self.settings.base_path = Some(base_path.to_owned());
        self
    }

    // ── Fallbacks ─────────────────────────────────────────────────────────────

    /// Runs `handler` when no primary route handles a request.
    ///
    /// The status is already 404 when it is called.
    pub fn set_404<F, R>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Params) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        self.not_found = Some(handler::boxed(handler));
        self
    }

    /// Answers unhandled requests with the built-in 404 page.
    pub fn set_default_404(&mut self) -> &mut Self {
        self.set_404(default_not_found)
    }

    /// Replaces the built-in error page shown outside debug mode.
    ///
    /// The status is already 500 when it is called, and the body holds
    /// whatever was written before the failure.
    pub fn error<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &Error) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    // ── Request handling ──────────────────────────────────────────────────────

    /// Dispatches one request through middleware, hooks and routes.
    ///
    /// # Errors
    ///
    /// Outside debug mode, failures inside the lifecycle become a 500 from
    /// the error handler and never reach here; only a failing middleware
    /// does. In debug mode every error is rendered by [`PrettyErrors`].
    pub fn run(&self, request: &Request) -> Result<Dispatched, Error> {
        let mut cx = Context::new(self, request);
        if self.settings.debug {
            PrettyErrors.call(&mut cx, self.chain.head())?;
        } else {
            self.chain.head().run(&mut cx)?;
        }

        let handled = cx.handled();
        let response = cx.into_response().finalize();
        let response = if request.is_head() { response.without_body() } else { response };
        Ok(Dispatched { response, handled })
    }

    /// The innermost link of the middleware chain.
    pub(crate) fn call(&self, cx: &mut Context<'_>) -> Result<(), Error> {
        let mark = cx.response.len();
        match trap(|| self.lifecycle(cx)) {
            Ok(()) => Ok(()),
            Err(err) if self.settings.debug => {
                cx.response.truncate_body(mark);
                Err(err)
            }
            Err(err) => {
                error!(error = %err, kind = err.kind(), path = cx.path(), "request failed");
                cx.response.set_status(Status::INTERNAL_SERVER_ERROR);
                match &self.error_handler {
                    Some(handler) => handler(cx, &err),
                    None => default_error(cx),
                }
                Ok(())
            }
        }
    }

    fn lifecycle(&self, cx: &mut Context<'_>) -> Result<(), Error> {
        if self.hooks.invoke(hooks::BEFORE, cx)?.is_stop()
            || self.hooks.invoke(hooks::BEFORE_ROUTER, cx)?.is_stop()
        {
            return Ok(());
        }

        let method = self.resolve_method(cx.request());
        debug!(raw = cx.request().method(), resolved = ?method, path = cx.path(), "routing");
        cx.set_method(method);

        if self.router.handle(Table::Before, cx, false)?.stopped
            || self.hooks.invoke(hooks::BEFORE_DISPATCH, cx)?.is_stop()
        {
            return Ok(());
        }

        let primary = self.router.handle(Table::Primary, cx, true)?;
        cx.handled = primary.count > 0;
        if primary.stopped || self.hooks.invoke(hooks::AFTER_DISPATCH, cx)?.is_stop() {
            return Ok(());
        }

        if !cx.handled {
            cx.response.set_status(Status::NOT_FOUND);
            if let Some(not_found) = &self.not_found {
                if not_found.call(cx, &Params::default())?.is_stop() {
                    return Ok(());
                }
            }
        }

        if self.hooks.invoke(hooks::AFTER_ROUTER, cx)?.is_stop() {
            return Ok(());
        }
        self.hooks.invoke(hooks::AFTER, cx)?;
        Ok(())
    }

    /// The method routes are matched against.
    ///
    /// HEAD is routed as GET. A POST carrying the override header with PUT,
    /// DELETE or PATCH is routed as that method; any other override value is
    /// ignored. `None` for a verb outside [`Method`].
    pub fn resolve_method(&self, request: &Request) -> Option<Method> {
        let method: Method = request.method().parse().ok()?;
        let resolved = match method {
            Method::Head => Method::Get,
            Method::Post => request
                .header(&self.settings.method_override_header)
                .and_then(|v| v.trim().parse::<Method>().ok())
                .filter(|m| m.is_override_target())
                .unwrap_or(Method::Post),
            other => other,
        };
        Some(resolved)
    }

    /// The configured base path, or the directory of the script name.
    pub fn base_path(&self, request: &Request) -> String {
        self.settings.base_path.clone().unwrap_or_else(|| request.script_dir())
    }

    /// The request path routes are matched against.
    ///
    /// The URI is percent-decoded, stripped of the base path and the query
    /// string, then given exactly one leading and no trailing `/`.
    pub fn current_path(&self, request: &Request) -> String {
        let uri = urlencoding::decode(request.uri()).unwrap_or(Cow::Borrowed(request.uri()));
        let base = self.base_path(request);

        let rest = match uri.strip_prefix(base.as_str()) {
            Some(rest) => rest,
            None if uri == base.trim_end_matches('/') => "",
            None => &*uri,
        };
        let path = rest.split_once('?').map_or(rest, |(path, _)| path);
        format!("/{}", path.trim_matches('/'))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("settings", &self.settings)
            .field("middleware", &self.chain)
            .field("router", &self.router)
            .field("hooks", &self.hooks)
            .field("not_found", &self.not_found.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// Runs `f`, turning a panic into [`Error::Panic`].
fn trap<T>(f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(Error::Panic(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ── Default pages ─────────────────────────────────────────────────────────────

/// Wraps `body` in the shared HTML page layout.
pub(crate) fn page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title><style>body{{margin:0;padding:30px;\
         font:12px/1.5 Helvetica,Arial,Verdana,sans-serif;}}h1{{margin:0;font-size:48px;\
         font-weight:normal;line-height:48px;}}strong{{display:inline-block;width:65px;}}\
         </style></head><body><h1>{title}</h1>{body}</body></html>"
    )
}

fn default_not_found(cx: &mut Context<'_>, _: &Params) {
    let home = cx.app().base_path(cx.request());
    let home = format!("{}/", home.trim_end_matches('/'));
    cx.content_type(ContentType::Html);
    cx.write(page(
        "404 Page Not Found",
        &format!(
            "<p>The page you are looking for could not be found. Check the address bar \
             to ensure your URL is spelled correctly.</p><a href=\"{}\">Go back home</a>",
            crate::middleware::escape(&home),
        ),
    ));
}

fn default_error(cx: &mut Context<'_>) {
    cx.content_type(ContentType::Html);
    cx.write(page(
        "Error",
        "<p>A website error has occurred. The website administrator has been notified \
         of the issue. Sorry for the temporary inconvenience.</p>",
    ));
}
