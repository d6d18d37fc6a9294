use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

pub const API_KEY: &str = "test_key";
pub const API_SECRET: &str = "test_secret";

/// One decoded multipart field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// UTF-8 text, lossily decoded for binary parts.
    pub value: String,
    pub size: usize,
}

#[derive(Clone, Debug)]
pub struct StoredFax {
    pub id: u64,
    pub status: String,
    pub recipients: Vec<String>,
    pub tags: Map<String, Value>,
    pub files: Vec<(String, Vec<u8>)>,
}

impl StoredFax {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "direction": "sent",
            "status": self.status,
            "num_pages": self.files.len(),
            "recipients": self
                .recipients
                .iter()
                .map(|n| json!({"phone_number": n, "status": self.status}))
                .collect::<Vec<_>>(),
            "tags": self.tags,
        })
    }
}

#[derive(Default)]
pub struct AppState {
    faxes: RwLock<HashMap<u64, StoredFax>>,
    next_id: AtomicU64,
}

pub type Db = Arc<AppState>;

/// Error body in the Phaxio envelope shape.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"success": false, "message": self.message})),
        )
            .into_response()
    }
}

fn ok(message: &str, data: Option<Value>) -> Json<Value> {
    let mut body = json!({"success": true, "message": message});
    if let Some(data) = data {
        body["data"] = data;
    }
    Json(body)
}

pub fn app() -> Router {
    let db: Db = Arc::new(AppState {
        next_id: AtomicU64::new(1),
        ..AppState::default()
    });
    Router::new()
        .route("/faxes", post(create_fax).get(list_faxes))
        .route("/faxes/{id}", get(get_fax))
        .route("/faxes/{id}/cancel", post(cancel_fax))
        .route("/faxes/{id}/resend", post(resend_fax))
        .route("/faxes/{id}/file", get(fax_file))
        .route("/atas", get(list_atas))
        .route("/atas/{id}", get(get_ata))
        .route("/echo", any(echo))
        .route("/simulate/{status}", any(simulate))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authorize(headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = format!(
        "Basic {}",
        STANDARD.encode(format!("{API_KEY}:{API_SECRET}"))
    );
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "The api key or api secret are not valid",
        )),
    }
}

async fn read_fields(multipart: &mut Multipart) -> Result<Vec<(FormField, Vec<u8>)>, ApiError> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        fields.push((
            FormField {
                name,
                filename,
                content_type,
                value: String::from_utf8_lossy(&bytes).into_owned(),
                size: bytes.len(),
            },
            bytes,
        ));
    }
    Ok(fields)
}

async fn create_fax(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    let fields = read_fields(&mut multipart).await?;

    let mut recipients = Vec::new();
    let mut tags = Map::new();
    let mut files = Vec::new();
    for (field, bytes) in fields {
        match field.name.as_str() {
            "to" | "to[]" => recipients.push(field.value),
            "file" | "file[]" => files.push((field.filename.unwrap_or_default(), bytes)),
            name => {
                if let Some(tag) = name.strip_prefix("tag[").and_then(|t| t.strip_suffix(']')) {
                    tags.insert(tag.to_string(), Value::String(field.value));
                }
            }
        }
    }

    if recipients.is_empty() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "You must provide at least one recipient",
        ));
    }
    if files.is_empty() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "You must provide at least one file",
        ));
    }

    let id = db.next_id.fetch_add(1, Ordering::SeqCst);
    info!(id, recipients = recipients.len(), files = files.len(), "fax queued");
    db.faxes.write().await.insert(
        id,
        StoredFax {
            id,
            status: "queued".to_string(),
            recipients,
            tags,
            files,
        },
    );
    Ok(ok("Fax queued for sending", Some(json!({"id": id}))))
}

async fn get_fax(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    let faxes = db.faxes.read().await;
    let fax = faxes
        .get(&id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Fax not found"))?;
    Ok(ok("Retrieved fax successfully", Some(fax.to_json())))
}

async fn cancel_fax(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    let mut faxes = db.faxes.write().await;
    let fax = faxes
        .get_mut(&id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Fax not found"))?;
    if fax.status != "queued" {
        // Phaxio reports this with a 200 and `success: false`.
        return Ok(Json(
            json!({"success": false, "message": "Fax cannot be canceled"}),
        ));
    }
    fax.status = "failure".to_string();
    info!(id, "fax canceled");
    Ok(ok("Fax canceled successfully.", None))
}

async fn resend_fax(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    let mut faxes = db.faxes.write().await;
    let original = faxes
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Fax not found"))?;
    let new_id = db.next_id.fetch_add(1, Ordering::SeqCst);
    faxes.insert(
        new_id,
        StoredFax {
            id: new_id,
            status: "queued".to_string(),
            ..original
        },
    );
    info!(id, new_id, "fax resent");
    Ok(ok("Fax queued for resending", Some(json!({"id": new_id}))))
}

async fn fax_file(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    authorize(&headers)?;
    let faxes = db.faxes.read().await;
    let (_, bytes) = faxes
        .get(&id)
        .and_then(|fax| fax.files.first())
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Fax file not found"))?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes.clone()).into_response())
}

/// The account has a single ATA, with id 1.
fn front_desk() -> Value {
    json!({"id": 1, "name": "Front desk", "domain": "ata.example.test"})
}

fn paged(message: &str, items: Vec<Value>) -> Json<Value> {
    let total = items.len();
    let mut body = ok(message, Some(Value::Array(items)));
    body.0["paging"] = json!({"total": total, "per_page": 20, "page": 1});
    body
}

async fn list_faxes(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    let faxes = db.faxes.read().await;
    let mut items: Vec<&StoredFax> = faxes.values().collect();
    items.sort_by_key(|fax| fax.id);
    Ok(paged(
        "Retrieved faxes successfully",
        items.into_iter().map(StoredFax::to_json).collect(),
    ))
}

async fn get_ata(headers: HeaderMap, Path(id): Path<u64>) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    if id != 1 {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "ATA not found"));
    }
    Ok(ok("Retrieved ATA successfully", Some(front_desk())))
}

async fn list_atas(headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    Ok(paged("Retrieved ATAs successfully", vec![front_desk()]))
}

/// Returns the decoded multipart fields, in order, as `data`.
async fn echo(headers: HeaderMap, mut multipart: Multipart) -> Result<Json<Value>, ApiError> {
    authorize(&headers)?;
    let fields: Vec<FormField> = read_fields(&mut multipart)
        .await?
        .into_iter()
        .map(|(field, _)| field)
        .collect();
    Ok(ok("Echo", Some(json!(fields))))
}

/// Answers with the requested status and an envelope naming it.
async fn simulate(Path(status): Path<u16>) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let success = code.is_success();
    (
        code,
        Json(json!({"success": success, "message": format!("simulated {status}")})),
    )
        .into_response()
}
