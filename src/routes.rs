use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::schema::{NewRecord, Record};
use crate::store::{ActivityStore, StoreError};

pub type SharedStore = Arc<dyn ActivityStore>;

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(list_records))
        .route("/activity", get(most_recent).post(record_activity))
        .route("/ip", post(report_ip))
        .with_state(store)
}

/// Single translation point from handler failures to HTTP responses. Every
/// store failure is caught here and answered; nothing crashes the process.
#[derive(Debug)]
enum AppError {
    InvalidInput(String),
    /// The collection is empty where a record was expected. Kept distinct
    /// from store failures internally, even though the response status
    /// matches the original service's behavior (500 for both).
    NoRecords,
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NoRecords => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "no records stored yet".to_string(),
            ),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        tracing::error!(status = %status, error = %message, "request failed");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn list_records(
    State(store): State<SharedStore>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Json<Vec<Record>>, AppError> {
    tracing::info!(peer = %peer, "listing all records");
    let records = store.find_all().await?;
    tracing::info!(count = records.len(), "returning records");
    Ok(Json(records))
}

async fn most_recent(
    State(store): State<SharedStore>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Json<Record>, AppError> {
    tracing::info!(peer = %peer, "looking up most recent record");
    let record = store.find_most_recent().await?.ok_or(AppError::NoRecords)?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct ActivityParams {
    activity: Option<String>,
    code: Option<String>,
}

/// Validation step between the raw query string and the store. A missing
/// `activity` is accepted as empty; a missing or empty `code` defaults to 0;
/// a non-numeric `code` is rejected before anything reaches persistence.
fn validate(params: ActivityParams, peer: SocketAddr) -> Result<NewRecord, AppError> {
    let code = match params.code.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(raw) => raw.parse::<i32>().map_err(|_| {
            AppError::InvalidInput(format!("code must be an integer, got {raw:?}"))
        })?,
    };

    Ok(NewRecord {
        ip_address: peer.ip().to_string(),
        activity: params.activity.unwrap_or_default(),
        code,
        timestamp: None,
    })
}

async fn record_activity(
    State(store): State<SharedStore>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<Record>, AppError> {
    tracing::info!(
        peer = %peer,
        activity = params.activity.as_deref().unwrap_or(""),
        code = params.code.as_deref().unwrap_or(""),
        "recording activity"
    );

    let new = validate(params, peer)?;
    let record = store.insert(new).await?;
    tracing::info!(id = %record.id, ip = %record.ip_address, "record saved");
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct IpParams {
    address: Option<String>,
}

/// Informational endpoint: acknowledges the reported address and persists
/// nothing. Deliberately a no-op.
async fn report_ip(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<IpParams>,
) -> StatusCode {
    tracing::info!(
        peer = %peer,
        address = params.address.as_deref().unwrap_or(""),
        "ip report received"
    );
    StatusCode::OK
}
