//! Serves stored photos behind the links written to PhotoLink cells

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::blob::BlobError;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /photos/:id/:name
pub async fn get_photo(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let content = state.blobs.open(&id, &name).await.map_err(|e| match e {
        BlobError::NotFound(_) | BlobError::InvalidName(_) | BlobError::Foreign(_) => {
            ApiError::NotFound(format!("photo not found: {}/{}", id, name))
        }
        BlobError::Io(e) => ApiError::Internal(e.to_string()),
    })?;

    Ok(([(header::CONTENT_TYPE, content.content_type)], content.bytes))
}

pub fn photo_routes() -> Router<AppState> {
    Router::new().route("/photos/:id/:name", get(get_photo))
}
