//! Debug-mode error page middleware.

use std::error::Error as _;
use std::fmt::Write as _;

use tracing::error;

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::Error;
use crate::response::ContentType;
use crate::status::Status;

/// Diagnostics wrapper.
///
/// Catches any error raised by the inner chain, logs it, and answers
/// `500 text/html` with a page naming the error, its message, and its
/// source chain. The app applies it outermost on every request when
/// `debug` is on; never enable it where error details must not leak.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrettyErrors;

impl Middleware for PrettyErrors {
    fn call(&self, cx: &mut Context<'_>, next: Next<'_>) -> Result<(), Error> {
        if let Err(err) = next.run(cx) {
            error!(error = %err, kind = err.kind(), path = cx.path(), "uncaught error");
            let res = cx.response_mut();
            res.content_type(ContentType::Html);
            res.set_status(Status::INTERNAL_SERVER_ERROR);
            res.set_body(render(&err));
        }
        Ok(())
    }
}

fn render(err: &Error) -> String {
    let mut html = String::from("<p>The application could not run because of the following error:</p>");
    html.push_str("<h2>Details</h2>");
    let _ = write!(html, "<div><strong>Type:</strong> {}</div>", err.kind());
    let _ = write!(html, "<div><strong>Message:</strong> {}</div>", escape(&err.to_string()));

    let mut source = err.source();
    if source.is_some() {
        html.push_str("<h2>Trace</h2><pre>");
        let mut depth = 0;
        while let Some(cause) = source {
            let _ = writeln!(html, "#{depth} {}", escape(&cause.to_string()));
            depth += 1;
            source = cause.source();
        }
        html.push_str("</pre>");
    }

    crate::app::page("Application Error", &html)
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&'  => out.push_str("&amp;"),
            '<'  => out.push_str("&lt;"),
            '>'  => out.push_str("&gt;"),
            '"'  => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _    => out.push(c),
        }
    }
    out
}
