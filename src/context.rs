//! Per-request state.

use chrono::{DateTime, Utc};

use crate::app::App;
use crate::config::Settings;
use crate::flow::Flow;
use crate::method::Method;
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::status::Status;

/// Everything one request carries through middleware, hooks and handlers.
///
/// Created when the request enters [`App::run`] and consumed when the
/// response is finalized. The response under construction lives here, so
/// every stage sees and may rewrite what earlier stages wrote.
pub struct Context<'a> {
    app: &'a App,
    request: &'a Request,
    method: Option<Method>,
    path: String,
    pub(crate) response: Response,
    pub(crate) handled: bool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(app: &'a App, request: &'a Request) -> Self {
        Self {
            app,
            request,
            method: request.method().parse().ok(),
            path: app.current_path(request),
            response: Response::new(),
            handled: false,
        }
    }

    /// The application serving this request.
    pub fn app(&self) -> &'a App { self.app }
    pub fn request(&self) -> &'a Request { self.request }
    pub fn settings(&self) -> &'a Settings { self.app.settings() }

    /// The method routes are matched against.
    ///
    /// Before routing starts this is the raw method; afterwards HEAD reads
    /// as GET and an overridden POST as the override. `None` for verbs
    /// outside [`Method`].
    pub fn method(&self) -> Option<Method> { self.method }

    pub(crate) fn set_method(&mut self, method: Option<Method>) {
        self.method = method;
    }

    /// The normalized path: base path removed, no query, one leading `/`,
    /// no trailing `/`.
    pub fn path(&self) -> &str { &self.path }

    /// Whether a primary route has handled the request so far.
    pub fn handled(&self) -> bool { self.handled }

    pub fn response(&self) -> &Response { &self.response }
    pub fn response_mut(&mut self) -> &mut Response { &mut self.response }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }

    // ── Response shortcuts ────────────────────────────────────────────────────

    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.response.write(chunk);
    }

    pub fn status(&mut self, status: impl Into<Status>) {
        self.response.set_status(status);
    }

    pub fn header(&mut self, name: &str, value: impl Into<String>) {
        self.response.header(name, value);
    }

    pub fn content_type(&mut self, content_type: ContentType) {
        self.response.content_type(content_type);
    }

    pub fn redirect(&mut self, url: &str, status: impl Into<Status>) {
        self.response.redirect(url, status);
    }

    // ── Control flow ──────────────────────────────────────────────────────────

    /// Ends the request's inner processing; what was written so far is sent.
    pub fn stop(&self) -> Flow {
        Flow::Stop
    }

    /// Discards this handler's output and lets the router try the next route.
    pub fn pass(&mut self) -> Flow {
        self.response.clear_body();
        Flow::Pass
    }

    /// Replaces the response with `status` and `message` and stops.
    pub fn halt(&mut self, status: impl Into<Status>, message: impl AsRef<[u8]>) -> Flow {
        self.response.set_status(status);
        self.response.set_body(message);
        Flow::Stop
    }

    // ── Conditional requests ──────────────────────────────────────────────────

    /// Sets `ETag` and halts with 304 when `If-None-Match` lists it or `*`.
    pub fn etag(&mut self, value: &str, weak: bool) -> Flow {
        let tag = if weak { format!("W/\"{value}\"") } else { format!("\"{value}\"") };
        self.response.header("ETag", tag.as_str());

        let matched = self.request.header("If-None-Match").is_some_and(|list| {
            list.split(',').map(str::trim).any(|t| t == tag || t == "*")
        });
        if matched {
            return self.halt(Status::NOT_MODIFIED, "");
        }
        Flow::Continue
    }

    /// Sets `Last-Modified` and halts with 304 when `If-Modified-Since` names
    /// the same second.
    pub fn last_modified(&mut self, unix_time: i64) -> Flow {
        let Some(time) = DateTime::from_timestamp(unix_time, 0) else {
            return Flow::Continue;
        };
        self.response.header("Last-Modified", http_date(time));

        let since = self.request
            .header("If-Modified-Since")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok());
        if since.is_some_and(|s| s.timestamp() == unix_time) {
            return self.halt(Status::NOT_MODIFIED, "");
        }
        Flow::Continue
    }

    /// Sets `Expires`.
    pub fn expires(&mut self, unix_time: i64) {
        if let Some(time) = DateTime::from_timestamp(unix_time, 0) {
            self.response.header("Expires", http_date(time));
        }
    }
}

fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
