use std::sync::{Arc, Mutex};

use waypost::middleware::{Middleware, Next, PrettyErrors, Trace};
use waypost::{hooks, App, Context, Error, Request, Status};

/// Writes `>{tag}` on the way in and `<{tag}` on the way out.
struct Wrap(&'static str);

impl Middleware for Wrap {
    fn call(&self, cx: &mut Context<'_>, next: Next<'_>) -> Result<(), Error> {
        cx.write(format!(">{}", self.0));
        next.run(cx)?;
        cx.write(format!("<{}", self.0));
        Ok(())
    }
}

/// Answers from "cache" without calling the rest of the chain.
struct Cached;

impl Middleware for Cached {
    fn call(&self, cx: &mut Context<'_>, _next: Next<'_>) -> Result<(), Error> {
        cx.header("X-Cache", "hit");
        cx.write("cached");
        Ok(())
    }
}

struct Failing;

impl Middleware for Failing {
    fn call(&self, _cx: &mut Context<'_>, _next: Next<'_>) -> Result<(), Error> {
        Err(Error::handler("middleware broke"))
    }
}

fn body(app: &App, uri: &str) -> String {
    let d = app.run(&Request::new("GET", uri)).unwrap();
    String::from_utf8_lossy(&d.response.body).into_owned()
}

#[test]
fn last_added_runs_outermost() {
    let mut app = App::new();
    app.add(Arc::new(Wrap("a"))).unwrap();
    app.add(Arc::new(Wrap("b"))).unwrap();
    app.get("/", |cx, _| cx.write("app"));

    assert_eq!(body(&app, "/"), ">b>aapp<a<b");
}

#[test]
fn short_circuit_skips_the_whole_lifecycle() {
    let ran = Arc::new(Mutex::new(Vec::<&str>::new()));
    let mut app = App::new();

    let log = Arc::clone(&ran);
    app.hook(hooks::BEFORE, move |_| log.lock().unwrap().push("hook"));
    let log = Arc::clone(&ran);
    app.get("/", move |cx, _| {
        log.lock().unwrap().push("route");
        cx.write("fresh");
    });
    app.add(Arc::new(Wrap("inner"))).unwrap();
    app.add(Arc::new(Cached)).unwrap();

    let d = app.run(&Request::new("GET", "/")).unwrap();
    assert_eq!(String::from_utf8_lossy(&d.response.body), "cached");
    assert_eq!(d.response.headers.get("x-cache"), Some("hit"));
    assert!(!d.handled);
    assert!(ran.lock().unwrap().is_empty());
}

#[test]
fn same_instance_twice_is_fatal() {
    let mut app = App::new();
    let wrap = Arc::new(Wrap("once"));
    app.add(wrap.clone()).unwrap();

    let err = app.add(wrap).unwrap_err();
    assert!(matches!(err, Error::CircularMiddleware(_)));
    assert!(err.is_fatal());

    // distinct instances of one type are fine
    app.add(Arc::new(Wrap("once"))).unwrap();
    app.get("/", |cx, _| cx.write("x"));
    assert_eq!(body(&app, "/"), ">once>oncex<once<once");
}

#[test]
fn middleware_errors_escape_run_outside_debug() {
    let mut app = App::new();
    app.settings_mut().debug = false;
    app.add(Arc::new(Failing)).unwrap();

    let err = app.run(&Request::new("GET", "/")).unwrap_err();
    assert_eq!(err.to_string(), "handler failed: middleware broke");
}

#[test]
fn debug_mode_renders_middleware_errors() {
    let mut app = App::new();
    app.settings_mut().debug = true;
    app.add(Arc::new(Failing)).unwrap();

    let d = app.run(&Request::new("GET", "/")).unwrap();
    assert_eq!(d.response.status, Status::INTERNAL_SERVER_ERROR);
    assert_eq!(d.response.headers.get("content-type"), Some("text/html; charset=utf-8"));
    assert!(String::from_utf8_lossy(&d.response.body).contains("middleware broke"));
}

#[test]
fn pretty_errors_can_be_added_explicitly() {
    let mut app = App::new();
    app.settings_mut().debug = false;
    app.add(Arc::new(Failing)).unwrap();
    app.add(Arc::new(PrettyErrors)).unwrap();

    let d = app.run(&Request::new("GET", "/")).unwrap();
    assert_eq!(d.response.status, Status::INTERNAL_SERVER_ERROR);
    assert!(String::from_utf8_lossy(&d.response.body).contains("Application Error"));
}

#[test]
fn middleware_sees_the_final_response() {
    struct StatusHeader;

    impl Middleware for StatusHeader {
        fn call(&self, cx: &mut Context<'_>, next: Next<'_>) -> Result<(), Error> {
            assert!(next.is_app());
            next.run(cx)?;
            let code = cx.response().status().code().to_string();
            cx.header("X-Status", code);
            Ok(())
        }
    }

    let mut app = App::new();
    app.add(Arc::new(StatusHeader)).unwrap();
    app.add(Arc::new(Trace)).unwrap();

    let d = app.run(&Request::new("GET", "/nowhere")).unwrap();
    assert_eq!(d.response.headers.get("X-Status"), Some("404"));
}
