//! Kiosk submission endpoint
//!
//! Kiosk pages post with `Content-Type: text/plain` to avoid a CORS preflight,
//! so the body is read as raw bytes and parsed as JSON whatever the header says.
//!
//! The submission runs on its own task. Once it starts mutating the sheet it
//! finishes even if the kiosk disconnects and the handler future is dropped.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::reconcile::SubmissionRequest;
use crate::AppState;

/// Body returned to the kiosk
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    /// "success" or "error"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmissionResponse {
    fn success(file_url: String, message: String) -> Self {
        Self {
            status: "success",
            file_url: Some(file_url),
            message: Some(message),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error",
            file_url: None,
            message: Some(message),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
}

/// GET /attendance
///
/// Readiness check used by kiosk pages before they enable the capture button.
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse { status: "ready" })
}

/// POST /attendance
pub async fn submit_attendance(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<SubmissionResponse>) {
    let request: SubmissionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejecting unparseable submission body");
            return failure(&state, ApiError::BadRequest(format!("invalid JSON body: {}", e)))
                .await;
        }
    };

    let student_id = request.student_id.trim().to_string();
    let service = Arc::clone(&state.service);
    let task_state = state.clone();
    let task = tokio::spawn(async move {
        let result = service.submit(&request).await;
        if let Err(e) = &result {
            warn!(student_id = %request.student_id.trim(), error = %e, "Submission failed");
            task_state.record_error(e.to_string()).await;
        }
        result
    });

    match task.await {
        Ok(Ok(receipt)) => {
            let message = format!("Attendance recorded for {}", receipt.date_label);
            (
                StatusCode::OK,
                Json(SubmissionResponse::success(receipt.file_url, message)),
            )
        }
        Ok(Err(e)) => error_response(ApiError::from(e)),
        Err(e) => {
            if e.is_panic() {
                error!(student_id = %student_id, "Submission panicked");
            } else {
                error!(student_id = %student_id, error = %e, "Submission task cancelled");
            }
            failure(
                &state,
                ApiError::Internal("internal error while recording attendance".to_string()),
            )
            .await
        }
    }
}

async fn failure(state: &AppState, err: ApiError) -> (StatusCode, Json<SubmissionResponse>) {
    state.record_error(err.to_string()).await;
    error_response(err)
}

fn error_response(err: ApiError) -> (StatusCode, Json<SubmissionResponse>) {
    (err.status(), Json(SubmissionResponse::error(err.to_string())))
}

/// Build submission routes
pub fn attendance_routes() -> Router<AppState> {
    Router::new().route("/attendance", get(ready).post(submit_attendance))
}
