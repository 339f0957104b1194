//! In-process dispatch tests using the test client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qflask::http::{HeaderName, HeaderValue, Method, StatusCode};
use qflask::wrappers::Body;
use qflask::{App, BoxError, Environ, Request, Response, RuleOptions, View, ViewArgs, ViewReturn};
use serde_json::json;

fn helloworld(_: &Request, _: &ViewArgs) -> Result<serde_json::Value, BoxError> {
    Ok(json!({"status": "success"}))
}

#[test]
fn test_demo_endpoint() {
    let mut app = App::new();
    app.add_url_rule(
        "/",
        None,
        Some(View::new(helloworld)),
        RuleOptions::new().methods([Method::POST]),
    )
    .unwrap();
    let client = app.test_client();

    let res = client.post("/", "");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json::<serde_json::Value>().unwrap(), json!({"status": "success"}));

    let res = client.get("/");
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("allow"), Some("OPTIONS, POST"));
}

#[test]
fn test_head_is_served_by_get_view() {
    let mut app = App::new();
    app.route("/page", RuleOptions::new(), |_, _| Ok("page")).unwrap();

    let res = app.test_client().request(Environ::new(Method::HEAD, "/page"));
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header("content-length"), Some("4"));
}

#[test]
fn test_missing_slash_redirects_with_query() {
    let mut app = App::new();
    app.route("/docs/", RuleOptions::new(), |_, _| Ok("docs")).unwrap();

    let res = app.test_client().get("/docs?lang=en");
    assert_eq!(res.status, StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.header("location"), Some("/docs/?lang=en"));
}

#[test]
fn test_method_not_allowed_lists_every_rule_for_path() {
    let mut app = App::new();
    app.route("/items", RuleOptions::new().endpoint("list"), |_, _| Ok("list"))
        .unwrap();
    app.route(
        "/items",
        RuleOptions::new().endpoint("create").methods([Method::POST]),
        |_, _| Ok(("created", 201u16)),
    )
    .unwrap();
    let client = app.test_client();

    assert_eq!(client.get("/items").text(), "list");
    assert_eq!(client.post("/items", "").status, StatusCode::CREATED);

    let res = client.request(Environ::new(Method::DELETE, "/items"));
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("allow"), Some("GET, HEAD, OPTIONS, POST"));
}

#[test]
fn test_tuple_headers_and_content_type_override() {
    let mut app = App::new();
    app.route("/csv", RuleOptions::new(), |_, _| {
        Ok(ViewReturn::text("a,b\n1,2\n").with_status_and_headers(
            200u16,
            [("Content-Type", "text/csv"), ("X-Rows", "1")],
        ))
    })
    .unwrap();

    let res = app.test_client().get("/csv");
    assert_eq!(res.header("content-type"), Some("text/csv"));
    assert_eq!(res.header("x-rows"), Some("1"));
    assert_eq!(res.headers.get_all("content-type").iter().count(), 1);
}

#[test]
fn test_request_data_is_visible_to_views() {
    let mut app = App::new();
    app.route("/sum", RuleOptions::new().methods([Method::POST]), |req, _| {
        let numbers: Vec<i64> = req.json()?;
        Ok(json!({"sum": numbers.iter().sum::<i64>(), "is_json": req.is_json()}))
    })
    .unwrap();

    let res = app.test_client().post_json("/sum", &json!([1, 2, 3]));
    assert_eq!(
        res.json::<serde_json::Value>().unwrap(),
        json!({"sum": 6, "is_json": true})
    );

    // Malformed JSON without a hook surfaces as a 500.
    let res = app.test_client().post("/sum", "not json");
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_view_sees_remote_addr_and_request_id() {
    let mut app = App::new();
    app.route("/who", RuleOptions::new(), |req, _| {
        let remote = req.environ().remote_addr.map(|addr| addr.to_string());
        Ok(json!({"remote": remote, "request_id": req.request_id()}))
    })
    .unwrap();

    let environ = Environ::new(Method::GET, "/who").with_header(
        HeaderName::from_static("x-request-id"),
        HeaderValue::from_static("req-1"),
    );
    let environ = Environ {
        remote_addr: Some("10.0.0.7:4000".parse().unwrap()),
        ..environ
    };
    let res = app.test_client().request(environ);
    assert_eq!(
        res.json::<serde_json::Value>().unwrap(),
        json!({"remote": "10.0.0.7:4000", "request_id": "req-1"})
    );
}

#[test]
fn test_streamed_response_is_collected() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pulled);
    let mut app = App::new();
    app.route("/stream", RuleOptions::new(), move |_, _| {
        let counter = Arc::clone(&counter);
        let chunks = (0..3).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            axum::body::Bytes::from(i.to_string())
        });
        Ok(Response::new(Body::stream(chunks)))
    })
    .unwrap();

    let res = app.test_client().get("/stream");
    assert_eq!(res.text(), "012");
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
    assert_eq!(res.header("content-length"), None);
}

#[test]
fn test_url_for_round_trips_through_routing() {
    let mut app = App::new();
    app.route("/posts/{year}/{slug}", RuleOptions::new().endpoint("post"), |_, args| {
        Ok(format!(
            "{}:{}",
            args.get("year").unwrap_or_default(),
            args.get("slug").unwrap_or_default()
        ))
    })
    .unwrap();

    let values: ViewArgs = [("year", "2024"), ("slug", "hello"), ("ref", "feed")]
        .into_iter()
        .collect();
    let url = app.url_for("post", &values).unwrap();
    assert_eq!(url, "/posts/2024/hello?ref=feed");
    assert_eq!(app.test_client().get(&url).text(), "2024:hello");
}

#[test]
fn test_encoded_paths_are_decoded_before_matching() {
    let mut app = App::new();
    app.route("/café", RuleOptions::new(), |_, _| Ok("coffee")).unwrap();
    app.route("/hello/{name}", RuleOptions::new().endpoint("hello"), |_, args| {
        Ok(format!("hello {}", args.get("name").unwrap_or_default()))
    })
    .unwrap();
    let client = app.test_client();

    let res = client.get("/caf%C3%A9");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "coffee");

    assert_eq!(client.get("/hello/J%C3%BCrgen%20X").text(), "hello Jürgen X");

    let values: ViewArgs = [("name", "Jürgen X")].into_iter().collect();
    let url = app.url_for("hello", &values).unwrap();
    assert_eq!(url, "/hello/J%C3%BCrgen%20X");
    assert_eq!(client.get(&url).text(), "hello Jürgen X");

    let values: ViewArgs = [("name", "a b/c")].into_iter().collect();
    assert_eq!(app.url_for("hello", &values).unwrap(), "/hello/a%20b%2Fc");
}
