use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{CommitError, StationError};
use crate::service::StationHandle;

/// 请求体: 扫描枪/键盘输入
#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

/// 请求体: 手工提交 (不传则提交输入框内容)
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub code: Option<String>,
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 扫描接口路由
pub fn router(station: StationHandle) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/scan/session", get(session_snapshot))
        .route("/api/scan/input", post(scan_input))
        .route("/api/scan/code", post(submit_code))
        .route("/api/scan/bins/:bin_id", delete(undo_scan))
        .route("/api/scan/commit", post(commit_day))
        .route("/api/scan/cancel", post(cancel_session))
        .with_state(station)
}

pub async fn session_snapshot(State(station): State<StationHandle>) -> Response {
    match station.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn scan_input(
    State(station): State<StationHandle>,
    Json(req): Json<InputRequest>,
) -> Response {
    match station.input(req.text).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn submit_code(
    State(station): State<StationHandle>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    match station.submit(req.code).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn undo_scan(
    State(station): State<StationHandle>,
    Path(bin_id): Path<String>,
) -> Response {
    match station.undo(bin_id).await {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn commit_day(State(station): State<StationHandle>) -> Response {
    match station.commit().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn cancel_session(State(station): State<StationHandle>) -> Response {
    match station.cancel().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: StationError) -> Response {
    let status = match &e {
        StationError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        StationError::Scan(_) => StatusCode::CONFLICT,
        StationError::Commit(CommitError::Failed { .. }) => StatusCode::BAD_GATEWAY,
        StationError::Commit(_) => StatusCode::CONFLICT,
    };
    let response = ErrorResponse {
        success: false,
        message: format!("Error: {}", e),
    };
    (status, Json(response)).into_response()
}
