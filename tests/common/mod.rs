#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use almoner::auth::{AuthContext, StaticSession};
use almoner::config::ClientConfig;

pub const TOKEN: &str = "test-admin-token";

/// A failure the next request answers with instead of the normal response.
#[derive(Clone)]
pub struct Fault {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Default)]
struct Backend {
    collections: HashMap<String, Vec<Value>>,
    faults: Vec<Fault>,
    delay: Option<Duration>,
    log: Vec<String>,
}

type Shared = Arc<Mutex<Backend>>;

/// In-process stand-in for the site's REST API.
///
/// Events, volunteer roles, study materials and the gallery key records by
/// `_id` (gallery uses extended-JSON `{"$oid"}`); every other collection uses
/// `id`. Volunteer roles are served inside a `{"data": ...}` envelope.
/// Mutations require `Authorization: Bearer <TOKEN>`.
pub struct TestEnv {
    pub base_url: String,
    backend: Shared,
    _server: JoinHandle<()>,
}

impl TestEnv {
    pub async fn start() -> Self {
        let backend: Shared = Arc::new(Mutex::new(Backend::default()));
        let router = Router::new()
            .route("/api/{resource}", get(list).post(create))
            .route("/api/{resource}/{id}", put(update).delete(remove))
            .route("/api/{resource}/{first}/{second}", patch(toggle))
            .with_state(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read listener address");
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            backend,
            _server: server,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            request_timeout_secs: 5,
            auth_token: Some(TOKEN.to_string()),
            offline_fallback: false,
        }
    }

    pub fn session(&self) -> Arc<dyn AuthContext> {
        Arc::new(StaticSession::new(TOKEN))
    }

    pub fn seed(&self, resource: &str, records: Vec<Value>) {
        self.backend
            .lock()
            .unwrap()
            .collections
            .insert(resource.to_string(), records);
    }

    pub fn stored(&self, resource: &str) -> Vec<Value> {
        self.backend
            .lock()
            .unwrap()
            .collections
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Answer the next request with `status` and `body`.
    pub fn fail_next(&self, status: StatusCode, body: Value) {
        self.backend.lock().unwrap().faults.push(Fault { status, body });
    }

    /// Hold every following response for `delay`.
    pub fn delay_responses(&self, delay: Duration) {
        self.backend.lock().unwrap().delay = Some(delay);
    }

    /// `"METHOD /path"` for every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.backend.lock().unwrap().log.clone()
    }
}

fn id_field(resource: &str) -> &'static str {
    match resource {
        "events" | "volunteer-roles" | "study-materials" | "gallery" => "_id",
        _ => "id",
    }
}

fn record_id(resource: &str, record: &Value) -> Option<String> {
    match &record[id_field(resource)] {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn new_id(resource: &str) -> Value {
    let hex = uuid::Uuid::new_v4().simple().to_string()[..24].to_string();
    if resource == "gallery" {
        json!({"$oid": hex})
    } else {
        Value::String(hex)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Log the request, honour the configured delay and any queued fault.
async fn intercept(backend: &Shared, line: String) -> Option<Response> {
    let (delay, fault) = {
        let mut b = backend.lock().unwrap();
        b.log.push(line);
        let fault = if b.faults.is_empty() {
            None
        } else {
            Some(b.faults.remove(0))
        };
        (b.delay, fault)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    fault.map(|f| (f.status, Json(f.body)).into_response())
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Record not found"}))).into_response()
}

async fn list(State(backend): State<Shared>, Path(resource): Path<String>) -> Response {
    if let Some(fault) = intercept(&backend, format!("GET /api/{resource}")).await {
        return fault;
    }
    let records = backend
        .lock()
        .unwrap()
        .collections
        .get(&resource)
        .cloned()
        .unwrap_or_default();
    if resource == "volunteer-roles" {
        Json(json!({"data": records})).into_response()
    } else {
        Json(Value::Array(records)).into_response()
    }
}

async fn create(
    State(backend): State<Shared>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Some(fault) = intercept(&backend, format!("POST /api/{resource}")).await {
        return fault;
    }
    if !authorized(&headers) {
        return unauthorized();
    }
    body[id_field(&resource)] = new_id(&resource);
    body["createdAt"] = json!(now());
    body["updatedAt"] = json!(now());
    backend
        .lock()
        .unwrap()
        .collections
        .entry(resource)
        .or_default()
        .push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update(
    State(backend): State<Shared>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Some(fault) = intercept(&backend, format!("PUT /api/{resource}/{id}")).await {
        return fault;
    }
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut b = backend.lock().unwrap();
    let records = b.collections.entry(resource.clone()).or_default();
    let Some(slot) = records
        .iter_mut()
        .find(|r| record_id(&resource, r).as_deref() == Some(id.as_str()))
    else {
        return not_found();
    };
    body[id_field(&resource)] = slot[id_field(&resource)].clone();
    body["createdAt"] = slot["createdAt"].clone();
    body["updatedAt"] = json!(now());
    *slot = body.clone();
    Json(body).into_response()
}

async fn remove(
    State(backend): State<Shared>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(fault) = intercept(&backend, format!("DELETE /api/{resource}/{id}")).await {
        return fault;
    }
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut b = backend.lock().unwrap();
    let records = b.collections.entry(resource.clone()).or_default();
    let before = records.len();
    records.retain(|r| record_id(&resource, r).as_deref() != Some(id.as_str()));
    if records.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Serves both `/toggle/{id}` and `/{id}/toggle`.
async fn toggle(
    State(backend): State<Shared>,
    Path((resource, first, second)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let line = format!("PATCH /api/{resource}/{first}/{second}");
    if let Some(fault) = intercept(&backend, line).await {
        return fault;
    }
    if !authorized(&headers) {
        return unauthorized();
    }
    let id = match (first.as_str(), second.as_str()) {
        ("toggle", id) => id.to_string(),
        (id, "toggle") => id.to_string(),
        _ => return not_found(),
    };
    let mut b = backend.lock().unwrap();
    let records = b.collections.entry(resource.clone()).or_default();
    let Some(slot) = records
        .iter_mut()
        .find(|r| record_id(&resource, r).as_deref() == Some(id.as_str()))
    else {
        return not_found();
    };
    let active = slot["isActive"].as_bool().unwrap_or(false);
    slot["isActive"] = json!(!active);
    slot["updatedAt"] = json!(now());
    Json(slot.clone()).into_response()
}
