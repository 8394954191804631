use std::sync::{Arc, Mutex};

use waypost::{hooks, App, Controller, Dispatched, Error, Flow, Request, Status};

type Log = Arc<Mutex<Vec<String>>>;

fn body(d: &Dispatched) -> String {
    String::from_utf8_lossy(&d.response.body).into_owned()
}

fn get(app: &App, uri: &str) -> Dispatched {
    app.run(&Request::new("GET", uri)).unwrap()
}

fn production() -> App {
    let mut app = App::new();
    app.settings_mut().debug = false;
    app
}

// ── Routing ───────────────────────────────────────────────────────────────────

#[test]
fn before_routes_all_run_then_first_primary_only() {
    let mut app = App::new();
    app.before("GET", "/users/.*", |cx, _| cx.write("b1;"));
    app.before("GET|POST", "/users/{id}", |cx, _| cx.write("b2;"));
    app.get("/users/{id}", |cx, p| cx.write(format!("p1:{};", p.get(0).unwrap_or_default())));
    app.get("/users/{id}", |cx, _| cx.write("p2;"));

    let d = get(&app, "/users/42");
    assert!(d.handled);
    assert_eq!(body(&d), "b1;b2;p1:42;");
}

#[test]
fn trailing_slash_and_query_are_ignored() {
    let mut app = App::new();
    app.get("/users/{id}", |cx, p| cx.write(p.get(0).unwrap_or_default()));

    assert_eq!(body(&get(&app, "/users/42/")), "42");
    assert_eq!(body(&get(&app, "/users/42?tab=posts")), "42");
    assert!(!get(&app, "/users").handled);
}

#[test]
fn adjacent_parameters_are_split_at_the_next_group() {
    let mut app = App::new();
    app.get("/a/{x}/{y}/b", |cx, p| {
        cx.write(format!("{}+{}", p.get(0).unwrap_or_default(), p.get(1).unwrap_or_default()));
    });
    assert_eq!(body(&get(&app, "/a/1/2/b")), "1+2");
}

#[test]
fn head_runs_the_get_handler_without_a_body() {
    let calls = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&calls);
    let mut app = App::new();
    app.get("/report", move |cx, _| {
        *seen.lock().unwrap() += 1;
        cx.header("X-Rows", "12");
        cx.write("row data");
    });

    let d = app.run(&Request::new("HEAD", "/report")).unwrap();
    assert!(d.handled);
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(d.response.headers.get("x-rows"), Some("12"));
    assert!(d.response.body.is_empty());
}

#[test]
fn post_override_selects_the_put_route() {
    let mut app = App::new();
    app.post("/doc", |cx, _| cx.write("post"));
    app.put("/doc", |cx, _| cx.write("put"));

    let put = Request::new("POST", "/doc").with_header("X-HTTP-Method-Override", "PUT");
    assert_eq!(body(&app.run(&put).unwrap()), "put");

    let bogus = Request::new("POST", "/doc").with_header("X-HTTP-Method-Override", "GET");
    assert_eq!(body(&app.run(&bogus).unwrap()), "post");
}

#[test]
fn override_header_name_is_configurable() {
    let mut app = App::new();
    app.settings_mut().method_override_header = "X-Method".to_owned();
    app.delete("/doc", |cx, _| cx.write("deleted"));

    let req = Request::new("POST", "/doc").with_header("x-method", "DELETE");
    assert_eq!(body(&app.run(&req).unwrap()), "deleted");
}

#[test]
fn pass_discards_output_and_tries_the_next_route() {
    let mut app = App::new();
    app.get("/item/{id}", |cx, p| {
        cx.write("first");
        if p.get(0) == Some("special") { Flow::Continue } else { cx.pass() }
    });
    app.get("/item/{id}", |cx, _| cx.write("second"));

    assert_eq!(body(&get(&app, "/item/7")), "second");
    assert_eq!(body(&get(&app, "/item/special")), "first");
}

#[test]
fn only_passing_routes_means_not_found() {
    let mut app = App::new();
    app.get("/x", |cx, _| cx.pass());
    let d = get(&app, "/x");
    assert!(!d.handled);
    assert_eq!(d.response.status, Status::NOT_FOUND);
}

#[test]
fn stop_keeps_output_and_skips_the_rest_of_the_lifecycle() {
    let log: Log = Arc::default();
    let mut app = App::new();
    let l = Arc::clone(&log);
    app.hook(hooks::AFTER_DISPATCH, move |_| l.lock().unwrap().push("after.dispatch".to_owned()));
    app.before("GET", "/locked", |cx, _| cx.halt(Status::FORBIDDEN, "nope"));
    app.get("/locked", |cx, _| cx.write("secret"));

    let d = get(&app, "/locked");
    assert_eq!(d.response.status, Status::FORBIDDEN);
    assert_eq!(body(&d), "nope");
    assert!(!d.handled);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn unknown_verbs_match_nothing() {
    let mut app = App::new();
    app.all("/", |cx, _| cx.write("any"));
    assert_eq!(body(&app.run(&Request::new("DELETE", "/")).unwrap()), "any");

    let d = app.run(&Request::new("BREW", "/")).unwrap();
    assert!(!d.handled);
    assert_eq!(d.response.status, Status::NOT_FOUND);
}

#[test]
fn regex_segments_are_allowed() {
    let mut app = App::new();
    app.get(r"/page/(\d+)", |cx, p| cx.write(p.get(0).unwrap_or_default()));
    assert_eq!(body(&get(&app, "/page/12")), "12");
    assert!(!get(&app, "/page/twelve").handled);
}

#[test]
fn base_path_is_removed_before_matching() {
    let mut app = App::new();
    app.set_base_path("/blog/");
    app.get("/", |cx, _| cx.write("home"));
    app.get("/posts", |cx, _| cx.write("posts"));

    assert_eq!(body(&get(&app, "/blog/posts?page=2")), "posts");
    assert_eq!(body(&get(&app, "/blog/")), "home");
    assert_eq!(body(&get(&app, "/blog")), "home");
}

#[test]
fn script_directory_is_the_default_base_path() {
    let mut app = App::new();
    app.get("/posts", |cx, _| cx.write("posts"));

    let req = Request::new("GET", "/site/posts").with_script_name("/site/index.php");
    assert_eq!(body(&app.run(&req).unwrap()), "posts");
}

// ── Grouping and shorthands ───────────────────────────────────────────────────

#[test]
fn mount_prefixes_routes() {
    let mut app = App::new();
    app.mount("/api", |api| {
        api.get("/", |cx, _| cx.write("api root"));
        api.mount("/v1", |v1| {
            v1.get("/users/{id}", |cx, p| cx.write(format!("v1 user {}", p.get(0).unwrap_or_default())));
        });
    });
    app.get("/users/{id}", |cx, _| cx.write("top level"));

    assert_eq!(body(&get(&app, "/api")), "api root");
    assert_eq!(body(&get(&app, "/api/v1/users/3")), "v1 user 3");
    assert_eq!(body(&get(&app, "/users/3")), "top level");
}

#[test]
fn redirect_sets_location_and_status() {
    let mut app = App::new();
    app.redirect("/old", "/new", Status::MOVED_PERMANENTLY);

    let d = get(&app, "/old");
    assert_eq!(d.response.status, Status::MOVED_PERMANENTLY);
    assert_eq!(d.response.headers.get("Location"), Some("/new"));
}

#[test]
fn resource_routes_resolve_controller_actions() {
    let mut app = App::new();
    app.controller(
        Controller::new("Posts")
            .action("index", |cx, _| cx.write("index"))
            .action("create", |cx, _| cx.write("create"))
            .action("show", |cx, p| cx.write(format!("show {}", p.get(0).unwrap_or_default())))
            .action("edit", |cx, p| cx.write(format!("edit {}", p.get(0).unwrap_or_default())))
            .action("update", |cx, p| cx.write(format!("update {}", p.get(0).unwrap_or_default()))),
    );
    app.resource("/posts", "Posts");

    assert_eq!(body(&get(&app, "/posts")), "index");
    assert_eq!(body(&get(&app, "/posts/create")), "create");
    assert_eq!(body(&get(&app, "/posts/5")), "show 5");
    assert_eq!(body(&get(&app, "/posts/5/edit")), "edit 5");

    let patch = Request::new("POST", "/posts/5/edit").with_header("X-HTTP-Method-Override", "PATCH");
    assert_eq!(body(&app.run(&patch).unwrap()), "update 5");

    // no `destroy` action: the route is skipped
    let d = app.run(&Request::new("DELETE", "/posts/5/delete")).unwrap();
    assert!(!d.handled);
    assert_eq!(d.response.status, Status::NOT_FOUND);
}

#[test]
fn namespace_qualifies_descriptors() {
    let mut app = App::new();
    app.set_namespace("Admin");
    app.controller(Controller::new("Admin::Users").action("list", |cx, _| cx.write("admin users")));
    app.controller(Controller::new("Users").action("list", |cx, _| cx.write("users")));
    app.get_action("/users", "Users@list");

    assert_eq!(app.namespace(), "Admin");
    assert_eq!(body(&get(&app, "/users")), "admin users");
}

#[test]
fn namespace_follows_settings_changes() {
    let mut app = App::new();
    app.controller(Controller::new("Admin::Users").action("list", |cx, _| cx.write("admin users")));
    app.controller(Controller::new("Api::Users").action("list", |cx, _| cx.write("api users")));
    app.get_action("/u", "Users@list");

    app.settings_mut().set("namespace", "Admin");
    assert_eq!(app.namespace(), "Admin");
    assert_eq!(body(&get(&app, "/u")), "admin users");

    let mut table = toml::Table::new();
    table.insert("namespace".into(), toml::Value::String("Api".into()));
    app.settings_mut().merge(table);
    assert_eq!(app.namespace(), "Api");
    assert_eq!(body(&get(&app, "/u")), "api users");
}

#[test]
#[should_panic(expected = "invalid route")]
fn descriptor_without_action_panics() {
    App::new().get_action("/x", "NoAction");
}

// ── Hooks ─────────────────────────────────────────────────────────────────────

#[test]
fn lifecycle_hooks_fire_in_order_around_routing() {
    let log: Log = Arc::default();
    let mut app = App::new();

    // registered in reverse to show that firing order is fixed by the lifecycle
    for name in [
        hooks::AFTER,
        hooks::AFTER_ROUTER,
        hooks::AFTER_DISPATCH,
        hooks::BEFORE_DISPATCH,
        hooks::BEFORE_ROUTER,
        hooks::BEFORE,
    ] {
        let l = Arc::clone(&log);
        app.hook(name, move |_| l.lock().unwrap().push(name.to_owned()));
    }
    let l = Arc::clone(&log);
    app.before("GET", "/", move |_, _| l.lock().unwrap().push("before-route".to_owned()));
    let l = Arc::clone(&log);
    app.get("/", move |_, _| l.lock().unwrap().push("route".to_owned()));

    get(&app, "/");
    assert_eq!(*log.lock().unwrap(), [
        "before",
        "before.router",
        "before-route",
        "before.dispatch",
        "route",
        "after.dispatch",
        "after.router",
        "after",
    ]);
}

#[test]
fn hook_priorities_order_listeners() {
    let log: Log = Arc::default();
    let mut app = App::new();
    for (tag, priority) in [("a5", 5), ("b1", 1), ("c5", 5)] {
        let l = Arc::clone(&log);
        app.hook_with_priority(hooks::BEFORE, priority, move |_| l.lock().unwrap().push(tag.to_owned()));
    }

    get(&app, "/");
    assert_eq!(*log.lock().unwrap(), ["b1", "a5", "c5"]);
}

#[test]
fn hook_stop_prevents_routing() {
    let mut app = App::new();
    app.hook(hooks::BEFORE_ROUTER, |cx| cx.halt(Status::SERVICE_UNAVAILABLE, "maintenance"));
    app.get("/", |cx, _| cx.write("never"));

    let d = get(&app, "/");
    assert!(!d.handled);
    assert_eq!(d.response.status, Status::SERVICE_UNAVAILABLE);
    assert_eq!(body(&d), "maintenance");
}

#[test]
fn hooks_can_be_cleared_and_applied_by_name() {
    let mut app = App::new();
    app.hook(hooks::AFTER, |cx| cx.write("!"));
    app.hook("render", |cx| cx.write("rendered"));
    app.get("/", |cx, _| -> Result<Flow, Error> {
        let app = cx.app();
        app.apply_hook("render", cx)
    });

    assert_eq!(body(&get(&app, "/")), "rendered!");

    app.clear_hooks(Some(hooks::AFTER));
    assert_eq!(app.hooks().len(hooks::AFTER), 0);
    assert_eq!(body(&get(&app, "/")), "rendered");
}

// ── Fallbacks and errors ──────────────────────────────────────────────────────

#[test]
fn unhandled_request_gets_a_bare_404() {
    let app = App::new();
    let d = get(&app, "/missing");
    assert!(!d.handled);
    assert_eq!(d.response.status, Status::NOT_FOUND);
    assert!(d.response.body.is_empty());
}

#[test]
fn default_404_page() {
    let mut app = App::new();
    app.set_default_404();
    let d = get(&app, "/missing");
    assert_eq!(d.response.status, Status::NOT_FOUND);
    assert!(body(&d).contains("404 Page Not Found"));
    assert!(body(&d).contains("href=\"/\""));
}

#[test]
fn custom_404_may_change_the_status() {
    let mut app = App::new();
    app.set_404(|cx, _| {
        cx.status(Status::OK);
        cx.write("soft 404");
    });
    let d = get(&app, "/missing");
    assert!(!d.handled);
    assert_eq!(d.response.status, Status::OK);
    assert_eq!(body(&d), "soft 404");
}

#[test]
fn production_error_keeps_partial_output_and_renders_error_page() {
    let mut app = production();
    app.get("/boom", |cx, _| -> Result<(), Error> {
        cx.write("partial;");
        Err(Error::handler("db down"))
    });

    let d = get(&app, "/boom");
    assert_eq!(d.response.status, Status::INTERNAL_SERVER_ERROR);
    let text = body(&d);
    assert!(text.starts_with("partial;"));
    assert!(text.contains("A website error has occurred"));
    assert!(!text.contains("db down"));
}

#[test]
fn custom_error_handler_sees_the_error() {
    let mut app = production();
    app.error(|cx, err| cx.write(format!("[{}: {err}]", err.kind())));
    app.get("/boom", |_, _| -> Result<(), Error> { Err(Error::handler("db down")) });

    let d = get(&app, "/boom");
    assert_eq!(d.response.status, Status::INTERNAL_SERVER_ERROR);
    assert_eq!(body(&d), "[Handler: handler failed: db down]");
}

#[test]
fn panics_become_500s() {
    let mut app = production();
    app.error(|cx, err| cx.write(err.kind()));
    app.get("/panic", |_, _| -> Flow { panic!("bad index") });

    let d = get(&app, "/panic");
    assert_eq!(d.response.status, Status::INTERNAL_SERVER_ERROR);
    assert_eq!(body(&d), "Panic");
}

#[test]
fn hook_errors_are_handled_like_handler_errors() {
    let mut app = production();
    app.hook(hooks::BEFORE_DISPATCH, |_| -> Result<(), Error> { Err(Error::handler("hook failed")) });
    app.get("/", |cx, _| cx.write("never"));

    let d = get(&app, "/");
    assert_eq!(d.response.status, Status::INTERNAL_SERVER_ERROR);
    assert!(!body(&d).contains("never"));
}

#[test]
fn debug_errors_render_the_diagnostics_page() {
    let mut app = App::new();
    app.settings_mut().debug = true;
    app.get("/boom", |cx, _| -> Result<(), Error> {
        cx.write("partial;");
        Err(Error::handler(std::io::Error::other("disk full")))
    });

    let d = get(&app, "/boom");
    assert_eq!(d.response.status, Status::INTERNAL_SERVER_ERROR);
    let text = body(&d);
    assert!(text.contains("Application Error"));
    assert!(text.contains("<strong>Type:</strong> Handler"));
    assert!(text.contains("disk full"));
    assert!(!text.contains("partial;"));
}

// ── Response finalization ─────────────────────────────────────────────────────

#[test]
fn no_content_drops_body_and_entity_headers() {
    let mut app = App::new();
    app.delete("/x", |cx, _| {
        cx.write("ignored");
        cx.status(Status::NO_CONTENT);
    });

    let d = app.run(&Request::new("DELETE", "/x")).unwrap();
    assert_eq!(d.response.status, Status::NO_CONTENT);
    assert!(d.response.body.is_empty());
    assert!(!d.response.headers.contains("Content-Type"));
}

#[test]
fn conditional_get_answers_304() {
    let mut app = App::new();
    app.get("/doc", |cx, _| {
        if cx.etag("v2", false).is_stop() {
            return Flow::Stop;
        }
        cx.write("document");
        Flow::Continue
    });

    let fresh = Request::new("GET", "/doc").with_header("If-None-Match", "\"v2\"");
    let d = app.run(&fresh).unwrap();
    assert_eq!(d.response.status, Status::NOT_MODIFIED);
    assert!(d.response.body.is_empty());
    assert_eq!(d.response.headers.get("ETag"), Some("\"v2\""));

    let stale = Request::new("GET", "/doc").with_header("If-None-Match", "\"v1\"");
    assert_eq!(body(&app.run(&stale).unwrap()), "document");
}

#[test]
fn configure_mode_runs_only_for_the_current_mode() {
    let mut settings = waypost::Settings::default();
    settings.mode = "production".to_owned();
    let mut app = App::with_settings(settings);
    app.configure_mode("development", |app| {
        app.get("/dev", |cx, _| cx.write("dev tools"));
    });
    app.configure_mode("production", |app| {
        app.settings_mut().debug = false;
    });

    assert!(!app.settings().debug);
    assert!(!get(&app, "/dev").handled);
}
