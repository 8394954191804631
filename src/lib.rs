//! # waypost
//!
//! An embeddable HTTP request dispatcher. It matches a request against
//! application routes, runs middleware around the match, and fires named
//! hooks at fixed points of the request lifecycle.
//!
//! ## The pieces
//!
//! - **Patterns**: regex paths with `{name}` placeholders, parameters passed
//!   positionally. See [`Pattern`].
//! - **Routes**: before routes (every match runs) and primary routes (first
//!   match wins), one ordered list per method. HEAD routes as GET; POST may
//!   be overridden to PUT, DELETE or PATCH by header.
//! - **Middleware**: a stack of [`Middleware`](middleware::Middleware) links
//!   around the app. A link that does not call `next` short-circuits
//!   everything inside it.
//! - **Hooks**: prioritised listeners on named events. See [`hooks`].
//! - **Control flow**: handlers return a [`Flow`]. `Stop` ends the request
//!   with what was written; `Pass` hands over to the next matching route.
//!
//! The core is synchronous. [`Server`] hosts it on hyper and tokio, running
//! each request on the blocking pool.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use waypost::{App, Context, Flow, Params, Server, Status};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waypost::Error> {
//!     let mut app = App::new();
//!
//!     app.before("GET|POST", "/admin/.*", |cx, _| {
//!         if cx.request().header("Authorization").is_none() {
//!             return cx.halt(Status::UNAUTHORIZED, "login first");
//!         }
//!         Flow::Continue
//!     });
//!
//!     app.get("/users/{id}", get_user);
//!     app.post("/users", |cx, _| {
//!         cx.status(Status::CREATED);
//!         cx.header("Location", "/users/99");
//!     });
//!     app.set_default_404();
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! fn get_user(cx: &mut Context<'_>, params: &Params) -> Flow {
//!     match params.get(0) {
//!         Some("0") => cx.pass(),
//!         Some(id) => {
//!             cx.write(format!("user {id}"));
//!             Flow::Continue
//!         }
//!         None => cx.halt(Status::BAD_REQUEST, "missing id"),
//!     }
//! }
//! ```

mod app;
mod config;
mod context;
mod controller;
mod error;
mod flow;
mod handler;
mod method;
mod pattern;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod hooks;
pub mod middleware;

pub use app::{App, Dispatched};
pub use config::{Settings, MODE_ENV};
pub use context::Context;
pub use controller::Controller;
pub use error::{BoxError, Error};
pub use flow::{Attempt, Flow, IntoFlow};
pub use handler::ActionRef;
pub use method::Method;
pub use pattern::{Params, Pattern};
pub use request::Request;
pub use response::{ContentType, Finalized, Headers, Response};
pub use server::Server;
pub use status::Status;
