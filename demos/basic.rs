//! A small blog: closures, a controller resource, hooks and middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/posts/7
//!   curl -i -X POST -H 'X-HTTP-Method-Override: PUT' http://localhost:3000/posts/7/edit
//!   curl -I http://localhost:3000/posts
//!   curl -i http://localhost:3000/admin/stats
//!   curl -i http://localhost:3000/old-home

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing_subscriber::EnvFilter;
use waypost::middleware::Trace;
use waypost::{App, Context, Controller, Flow, Params, Server, Status, hooks};

#[tokio::main]
async fn main() -> Result<(), waypost::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let hits = Arc::new(AtomicU64::new(0));
    let mut app = App::new();
    app.add(Arc::new(Trace))?;

    let counter = Arc::clone(&hits);
    app.hook(hooks::BEFORE, move |_cx| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    app.hook_with_priority(hooks::AFTER, 0, |cx| {
        cx.header("X-Served-By", "waypost");
    });

    app.get("/", |cx, _| cx.write("welcome"));
    app.redirect("/old-home", "/", Status::MOVED_PERMANENTLY);

    app.controller(
        Controller::new("PostController")
            .action("index", |cx: &mut Context<'_>, _: &Params| cx.write("all posts"))
            .action("show", show_post)
            .action("update", |cx: &mut Context<'_>, p: &Params| {
                cx.write(format!("updated post {}", p.get(0).unwrap_or_default()));
            }),
    );
    app.resource("/posts", "PostController");

    app.mount("/admin", |admin| {
        admin.before("GET|POST", "/.*", |cx, _| {
            if cx.request().header("Authorization").is_none() {
                return cx.halt(Status::UNAUTHORIZED, "login first");
            }
            Flow::Continue
        });
        let hits = Arc::clone(&hits);
        admin.get("/stats", move |cx, _| {
            cx.write(format!("{} requests", hits.load(Ordering::Relaxed)));
        });
    });

    app.set_default_404();
    app.configure_mode("production", |app| {
        app.settings_mut().debug = false;
    });

    Server::bind("0.0.0.0:3000").serve(app).await
}

fn show_post(cx: &mut Context<'_>, params: &Params) -> Flow {
    let Some(id) = params.get(0) else {
        return cx.pass();
    };
    if cx.etag(&format!("post-{id}"), false).is_stop() {
        return Flow::Stop;
    }
    cx.write(format!("post {id}"));
    Flow::Continue
}
