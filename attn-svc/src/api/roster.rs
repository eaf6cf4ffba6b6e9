//! Operator endpoints: read-only sheet view and roster enrollment
//!
//! Submissions never create student rows; this is the only way rows appear
//! (besides editing the backing store directly).

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SheetView {
    pub sheet: String,
    pub labels: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// GET /api/sheet
pub async fn get_sheet(State(state): State<AppState>) -> ApiResult<Json<SheetView>> {
    let snapshot = state.service.view().await?;
    Ok(Json(SheetView {
        sheet: state.service.sheet_name().to_string(),
        labels: snapshot.labels(),
        rows: snapshot.rows,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub student_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub row: usize,
    pub student_id: String,
}

/// POST /api/students
pub async fn enroll_student(
    State(state): State<AppState>,
    Json(request): Json<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<EnrollResponse>)> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let row = state
        .service
        .enroll(&request.name, &request.student_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            row,
            student_id: request.student_id.trim().to_string(),
        }),
    ))
}

pub fn roster_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sheet", get(get_sheet))
        .route("/api/students", post(enroll_student))
}
