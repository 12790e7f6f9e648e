//! The standard vigil stack plus two demo routes.
//!
//! Run with:
//!   RUST_LOG=info PORT=3000 cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/healthz
//!   curl -i -H 'x-request-id: demo-1' http://localhost:3000/users/42
//!   curl -i http://localhost:3000/panic      # 500, server keeps going
//!   curl -i http://localhost:3000/slow       # 504 after 2 s

use std::time::Duration;

use vigil::middleware::{AccessLog, Pipeline, RealIp, Recover, SetRequestId, Timeout};
use vigil::{Request, Response, Router, Server, health};

#[tokio::main]
async fn main() -> Result<(), vigil::Error> {
    vigil::telemetry::init().expect("logging already initialised");
    let config = vigil::load_config()?;

    let router = Router::new()
        .get("/healthz",    health::liveness)
        .get("/users/{id}", get_user)
        .get("/panic",      panic_handler)
        .get("/slow",       slow);

    let app = Pipeline::new(router)
        .wrap(Timeout::new(Duration::from_secs(2)))
        .wrap(Recover::new())
        .wrap(AccessLog::new())
        .wrap(RealIp::new())
        .wrap(SetRequestId::new());

    Server::bind(config.addr()).await?.serve(app).await
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    let rid = req.context().request_id().map(|r| r.as_str()).unwrap_or("-");
    Response::json(format!(r#"{{"id":"{id}","request_id":"{rid}"}}"#).into_bytes())
}

async fn panic_handler(_req: Request) -> Response {
    panic!("demo panic");
}

async fn slow(_req: Request) -> &'static str {
    tokio::time::sleep(Duration::from_secs(10)).await;
    "never seen"
}
