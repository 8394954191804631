//! Request logging middleware.

use std::time::Instant;

use tracing::{info, info_span};

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::Error;

/// One `request` span per request, closed with the status and latency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn call(&self, cx: &mut Context<'_>, next: Next<'_>) -> Result<(), Error> {
        let span = info_span!("request", method = cx.request().method(), path = cx.path());
        let _entered = span.enter();
        let started = Instant::now();

        let result = next.run(cx);

        info!(
            status = cx.response().status().code(),
            latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            failed = result.is_err(),
            "request finished"
        );
        result
    }
}
