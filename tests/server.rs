//! End-to-end tests over a real socket.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use http::StatusCode;
use vigil::middleware::{AccessLog, Pipeline, RealIp, Recover, SetRequestId, Timeout};
use vigil::{Request, Response, Router, Server, health};

async fn spawn(app: Pipeline) -> SocketAddr {
    let server = Server::bind(([127, 0, 0, 1], 0).into()).await.expect("bind");
    let addr = server.local_addr();
    tokio::spawn(server.serve(app));
    addr
}

async fn boom(_req: Request) -> Response {
    panic!("integration panic");
}

async fn slow(_req: Request) -> &'static str {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "too late"
}

async fn whoami(req: Request) -> String {
    req.context().client_addr().map(|ip| ip.to_string()).unwrap_or_default()
}

/// The standard stack with extra misbehaving routes and a short budget.
fn test_app(budget: Duration) -> Pipeline {
    let router = Router::new()
        .get("/healthz", health::liveness)
        .get("/boom", boom)
        .get("/slow", slow)
        .get("/whoami", whoami);

    Pipeline::new(router)
        .wrap(Timeout::new(budget))
        .wrap(Recover::new())
        .wrap(AccessLog::new())
        .wrap(RealIp::new())
        .wrap(SetRequestId::new())
}

#[tokio::test]
async fn healthz_returns_exact_payload() {
    let addr = spawn(vigil::app()).await;
    let started = Instant::now();

    let res = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.bytes().await.unwrap().as_ref(), br#"{"status":"ok"}"#);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unknown_paths_are_not_found_and_other_methods_not_allowed() {
    let addr = spawn(vigil::app()).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("http://{addr}/nope")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(!res.headers().contains_key("allow"));

    let res = client.post(format!("http://{addr}/healthz")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "GET");
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn request_id_is_echoed_or_generated_uniquely() {
    let addr = spawn(vigil::app()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{addr}/healthz"))
        .header("x-request-id", "upstream-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "upstream-123");

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..64 {
        let client = client.clone();
        let url = format!("http://{addr}/healthz");
        tasks.spawn(async move {
            let res = client.get(url).send().await.unwrap();
            res.headers()["x-request-id"].to_str().unwrap().to_owned()
        });
    }
    let mut ids = HashSet::new();
    while let Some(id) = tasks.join_next().await {
        assert!(ids.insert(id.unwrap()));
    }
    assert_eq!(ids.len(), 64);
}

#[tokio::test]
async fn panic_returns_500_and_server_keeps_serving() {
    let addr = spawn(test_app(Duration::from_secs(5))).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = client.get(format!("http://{addr}/boom")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.headers().contains_key("x-request-id"));

        let res = client.get(format!("http://{addr}/healthz")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn slow_handler_times_out_with_504() {
    let addr = spawn(test_app(Duration::from_millis(200))).await;
    let started = Instant::now();

    let res = reqwest::get(format!("http://{addr}/slow")).await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(200));
    assert!(waited < Duration::from_secs(5), "took {waited:?}");
}

#[tokio::test]
async fn client_address_comes_from_proxy_headers_or_peer() {
    let addr = spawn(test_app(Duration::from_secs(5))).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("http://{addr}/whoami")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "127.0.0.1");

    let res = client
        .get(format!("http://{addr}/whoami"))
        .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "203.0.113.5");

    let res = client
        .get(format!("http://{addr}/whoami"))
        .header("x-real-ip", "not-an-address")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "127.0.0.1");
}
