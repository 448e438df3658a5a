use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hookflow_core::{
    Branch, ExecutionContext, Flow, Node, OpenAiConfig, Outcome, RequestInfo, ResendConfig,
    ResponseBody, ResponseSink,
};
use hookflow_eval::{Block, BlockRegistry, BlockSettings, Executor};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};

const OPENAI_KEY_ENV: &str = "HOOKFLOW_IT_OPENAI_KEY";
const RESEND_KEY_ENV: &str = "HOOKFLOW_IT_RESEND_KEY";

async fn user(Path(id): Path<String>) -> Json<Value> {
    Json(json!({"id": id, "name": "Ava", "tags": ["a", "b"]}))
}

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let trace = headers
        .get("x-trace")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({"received": body, "contentType": content_type, "trace": trace}))
}

async fn ping() -> &'static str {
    "pong"
}

async fn gone() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "gone")
}

async fn swatch() -> ([(header::HeaderName, &'static str); 1], Vec<u8>) {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).unwrap();
    ([(header::CONTENT_TYPE, "image/png")], png.into_inner())
}

fn authorized(headers: &HeaderMap, env: &str) -> bool {
    let expected = format!("Bearer {}", std::env::var(env).unwrap_or_default());
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str())
}

async fn responses(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers, OPENAI_KEY_ENV) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"type": "invalid_request_error", "code": "invalid_api_key", "message": "bad key"}})),
        );
    }
    if body["model"] == "broken" {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"type": "rate_limit_error", "code": "rate_limit", "message": "slow down"}})),
        );
    }
    let input = body["input"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{"type": "output_text", "text": format!("echo: {}", input)}]
            }]
        })),
    )
}

async fn emails(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers, RESEND_KEY_ENV) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"name": "missing_api_key", "message": "Missing API key", "statusCode": 401})),
        );
    }
    if body["html"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"name": "validation_error", "message": "html required", "statusCode": 422})),
        );
    }
    (StatusCode::OK, Json(json!({"id": "email-123"})))
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/users/:id", get(user))
        .route("/echo", post(echo))
        .route("/ping", get(ping))
        .route("/gone", get(gone))
        .route("/swatch.png", get(swatch))
        .route("/v1/responses", post(responses))
        .route("/emails", post(emails));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn executor(addr: SocketAddr) -> Executor {
    std::env::set_var(OPENAI_KEY_ENV, "sk-test");
    std::env::set_var(RESEND_KEY_ENV, "re-test");
    let settings = BlockSettings {
        client: reqwest::Client::new(),
        openai: OpenAiConfig {
            api_key_env: OPENAI_KEY_ENV.into(),
            base_url: format!("http://{}/v1", addr),
            model: "gpt-test".into(),
        },
        resend: ResendConfig {
            api_key_env: RESEND_KEY_ENV.into(),
            base_url: format!("http://{}", addr),
        },
    };
    Executor::new(Arc::new(BlockRegistry::standard(&settings)))
}

fn json_body(run: &hookflow_eval::FlowRun) -> Value {
    match &run.response.as_ref().expect("no response sent").body {
        ResponseBody::Json(body) => body.clone(),
        ResponseBody::Text(text) => panic!("unexpected text body {}", text),
    }
}

fn start(slug: &str) -> Node {
    Node::new("root", "start")
        .with_data("slug", slug)
        .with_data("queryParams", json!([{"key": "id", "default_value": "7"}]))
}

#[tokio::test]
async fn test_request_result_feeds_templates() {
    let addr = spawn_stub().await;
    let flow = Flow::from_node(
        start("profile").with_child(
            Node::new("req-1", "request")
                .with_data("url", format!("http://{}/users/{{params.id}}", addr))
                .with_data("request_name", "user")
                .with_child(
                    Node::new("out", "respond")
                        .with_data("message", "{user.body.name} #{user.body.id} ({user.status}, {user.body.tags.length} tags)"),
                ),
        ),
    );

    let run = executor(addr)
        .execute(Arc::new(flow), &RequestInfo::get("/api/profile").with_query("id", "42"))
        .await;

    assert_eq!(json_body(&run)["message"], json!("Ava #42 (200, 2 tags)"));
    assert_eq!(run.outputs[0]["ok"], json!(true));
    assert_eq!(run.context.variables["user.body"]["name"], json!("Ava"));
}

#[tokio::test]
async fn test_request_posts_json_body() {
    let addr = spawn_stub().await;
    let flow = Flow::from_node(
        start("echo").with_child(
            Node::new("post", "request")
                .with_data("method", "post")
                .with_data("url", format!("http://{}/echo", addr))
                .with_data("headers", json!([{"key": "X-Trace", "value": "t-{params.id}"}]))
                .with_data("bodyParams", json!([{"key": "id", "value": "{params.id}"}, {"key": "", "value": "dropped"}])),
        ),
    );

    let run = executor(addr)
        .execute(Arc::new(flow), &RequestInfo::get("/api/echo"))
        .await;

    let result = &run.context.variables["post"];
    assert_eq!(result["status"], json!(200));
    assert_eq!(result["body"]["received"], json!({"id": "7"}));
    assert_eq!(result["body"]["contentType"], json!("application/json"));
    assert_eq!(result["body"]["trace"], json!("t-7"));
    assert!(run.response.is_none());
}

#[tokio::test]
async fn test_request_text_body() {
    let addr = spawn_stub().await;
    let flow = Flow::from_node(
        start("ping").with_child(
            Node::new("ping", "request").with_data("url", format!("http://{}/ping", addr)),
        ),
    );

    let run = executor(addr)
        .execute(Arc::new(flow), &RequestInfo::get("/api/ping"))
        .await;

    assert_eq!(run.outputs, vec![json!({"status": 200, "ok": true, "body": "pong"})]);
    assert_eq!(run.context.variables["ping.body"], json!("pong"));
}

#[tokio::test]
async fn test_request_error_status_is_recorded() {
    let addr = spawn_stub().await;
    let flow = Flow::from_node(
        start("gone").with_child(
            Node::new("fetch", "request")
                .with_data("url", format!("http://{}/gone", addr))
                .with_child(Node::new("out", "respond").with_data("message", "{fetch.status}")),
        ),
    );

    let run = executor(addr)
        .execute(Arc::new(flow), &RequestInfo::get("/api/gone"))
        .await;

    assert_eq!(run.outputs[0], json!({"status": 404, "ok": false, "body": "gone"}));
    let error = run.last_error().unwrap();
    assert_eq!(error.source, "request");
    assert_eq!(error.kind, "http_error");
    assert_eq!(error.status, Some(404));
    assert_eq!(json_body(&run)["message"], json!("404"));
}

#[tokio::test]
async fn test_manipulate_image_stores_data_url() {
    let addr = spawn_stub().await;
    let flow = Flow::from_node(
        start("img").with_child(
            Node::new("img", "manipulateImage")
                .with_data("imageUrl", format!("http://{}/swatch.png", addr))
                .with_data("operation", "invert")
                .with_data("referenceVar", "inverted")
                .with_child(Node::new("out", "respond").with_data("message", "done")),
        ),
    );

    let run = executor(addr)
        .execute(Arc::new(flow), &RequestInfo::get("/api/img"))
        .await;

    let url = run.context.local["inverted"].as_str().unwrap().to_string();
    assert_eq!(run.outputs[0], json!({"inverted": url}));
    assert_eq!(run.context.result["inverted"], json!(url));
    let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
    let decoded = image::load_from_memory(&STANDARD.decode(encoded).unwrap()).unwrap();
    assert_eq!(decoded.to_rgba8().get_pixel(1, 1).0, [245, 235, 225, 255]);
    assert!(run.last_error().is_none());
    assert_eq!(json_body(&run)["message"], json!("done"));
}

#[tokio::test]
async fn test_manipulate_image_fetch_failure_is_recorded() {
    let addr = spawn_stub().await;
    let flow = Flow::from_node(
        start("img").with_child(
            Node::new("img", "manipulateImage")
                .with_data("imageUrl", format!("http://{}/gone", addr))
                .with_data("operation", "blur")
                .with_data("blur", "2")
                .with_child(Node::new("out", "respond").with_data("message", "continued")),
        ),
    );

    let run = executor(addr)
        .execute(Arc::new(flow), &RequestInfo::get("/api/img"))
        .await;

    let error = run.last_error().unwrap();
    assert_eq!(error.source, "image");
    assert_eq!(error.kind, "fetch_error");
    assert_eq!(error.status, Some(404));
    assert!(run.outputs.iter().all(|output| output.get("imageUrl").is_none()));
    assert_eq!(json_body(&run)["message"], json!("continued"));
}

#[tokio::test]
async fn test_generate_text_success_and_failure() {
    let addr = spawn_stub().await;
    let executor = executor(addr);

    let flow = Flow::from_node(
        start("ai").with_child(
            Node::new("gen", "generateText")
                .with_data("prompt", "say {params.id}")
                .with_data("referenceVar", "answer")
                .with_child(Node::new("out", "respond").with_data("message", "{answer}")),
        ),
    );
    let run = executor
        .execute(Arc::new(flow), &RequestInfo::get("/api/ai"))
        .await;
    assert_eq!(json_body(&run)["message"], json!("echo: say 7"));
    assert_eq!(run.context.result["answer"], json!("echo: say 7"));

    let flow = Flow::from_node(
        start("ai").with_child(
            Node::new("gen", "generateText")
                .with_data("prompt", "hello")
                .with_data("model", "broken")
                .with_data("referenceVar", "answer")
                .with_child(Node::new("out", "respond").with_data("message", "{answer}")),
        ),
    );
    let run = executor
        .execute(Arc::new(flow), &RequestInfo::get("/api/ai"))
        .await;
    assert!(run.response.is_none());
    let error = run.last_error().unwrap();
    assert_eq!(error.source, "openai");
    assert_eq!(error.kind, "rate_limit_error");
    assert_eq!(error.code.as_deref(), Some("rate_limit"));
    assert_eq!(error.status, Some(429));
    assert_eq!(run.context.local["answer"], json!("slow down"));
    assert_eq!(run.outputs, vec![json!({"answer": "slow down"})]);
}

#[tokio::test]
async fn test_send_email() {
    let addr = spawn_stub().await;
    let flow = Flow::from_node(
        start("mail").with_child(
            Node::new("mail", "sendEmail")
                .with_data("to", "ava@example.com")
                .with_data("from", "bot@example.com")
                .with_data("subject", "Order {params.id}")
                .with_data("body", "<p>Thanks</p>"),
        ),
    );

    let run = executor(addr)
        .execute(Arc::new(flow), &RequestInfo::get("/api/mail"))
        .await;

    assert_eq!(
        run.outputs,
        vec![json!({"id": "email-123", "to": "ava@example.com", "subject": "Order 7", "status": "sent"})]
    );
    assert!(run.last_error().is_none());
}

/// Records visit order; children flagged `skip` are routed around, nodes
/// flagged `stop` end their branch.
struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Block for Recorder {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        _ctx: &mut ExecutionContext,
    ) -> Outcome {
        self.seen.lock().unwrap().push(node.id.clone());
        let outcome = Outcome::output(json!(node.id));
        if node.get("stop") == Some(&json!(true)) {
            outcome.stop()
        } else {
            outcome
        }
    }

    fn route(&self, child: &Node, _ctx: &ExecutionContext) -> Option<bool> {
        child.get("skip").and_then(Value::as_bool).map(|skip| !skip)
    }
}

fn recording_executor() -> (Executor, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = BlockRegistry::standard(&BlockSettings::default());
    registry.register("record", Arc::new(Recorder { seen: seen.clone() }));
    (Executor::new(Arc::new(registry)), seen)
}

fn record(id: &str) -> Node {
    Node::new(id, "record")
}

#[tokio::test]
async fn test_depth_first_order_and_routing() {
    let (executor, seen) = recording_executor();
    let flow = Flow::from_node(
        record("a")
            .with_child(record("b").with_child(record("c")).with_child(record("d")))
            .with_child(record("skipped").with_data("skip", true).with_child(record("never")))
            .with_child(record("e").with_data("stop", true).with_child(record("also-never")))
            .with_child(record("f")),
    );

    let run = executor
        .execute(Arc::new(flow), &RequestInfo::get("/api/x"))
        .await;

    assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c", "d", "e", "f"]);
    assert_eq!(
        run.outputs,
        vec![json!("a"), json!("b"), json!("c"), json!("d"), json!("e"), json!("f")]
    );
}

#[tokio::test]
async fn test_condition_children_by_data_path() {
    let (executor, seen) = recording_executor();
    let flow = Flow::from_node(
        start("branch").with_child(
            Node::new("cond", "condition")
                .with_data("expression1", "{params.id}")
                .with_data("comparison", ">")
                .with_data("expression2", "5")
                .with_child(record("yes").with_data("path", "condition"))
                .with_child(record("no").with_data("path", "else"))
                .with_child(record("plain"))
                .with_child(record("explicit").on_branch(Branch::Condition)),
        ),
    );

    executor
        .execute(Arc::new(flow), &RequestInfo::get("/api/branch"))
        .await;

    assert_eq!(*seen.lock().unwrap(), vec!["yes", "explicit"]);
}
