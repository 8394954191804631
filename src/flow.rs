//! Control signals.
//!
//! Stopping and passing are ordinary return values, not errors. A handler,
//! hook listener or not-found handler reports what should happen next through
//! a [`Flow`]; the router turns each route it tries into an [`Attempt`].

use crate::error::Error;

/// What the dispatcher does after a handler returns.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Flow {
    /// Keep going.
    #[default]
    Continue,
    /// End the request's inner processing now, keeping the buffered body.
    Stop,
    /// Abandon this route match and try the next matching route.
    Pass,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        self == Self::Stop
    }
}

/// Outcome of trying one route against the current request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Attempt {
    /// The pattern matched and the handler ran to completion.
    Handled,
    /// The handler ran and asked to stop the lifecycle.
    Stopped,
    /// The handler ran and passed; routing continues with the next route.
    Passed,
    /// The pattern did not match, or its controller action is not registered.
    NoMatch,
}

impl Attempt {
    pub(crate) fn from_flow(flow: Flow) -> Self {
        match flow {
            Flow::Continue => Self::Handled,
            Flow::Stop     => Self::Stopped,
            Flow::Pass     => Self::Passed,
        }
    }
}

/// Conversion of a handler's return value into a [`Flow`].
///
/// Implemented for `()` (continue), `Flow` itself, and `Result<T, Error>` so
/// fallible handlers can use `?`.
pub trait IntoFlow {
    fn into_flow(self) -> Result<Flow, Error>;
}

impl IntoFlow for () {
    fn into_flow(self) -> Result<Flow, Error> {
        Ok(Flow::Continue)
    }
}

impl IntoFlow for Flow {
    fn into_flow(self) -> Result<Flow, Error> {
        Ok(self)
    }
}

impl<T: IntoFlow> IntoFlow for Result<T, Error> {
    fn into_flow(self) -> Result<Flow, Error> {
        self.and_then(IntoFlow::into_flow)
    }
}
