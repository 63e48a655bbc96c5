use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

use crate::{AppState, ErrorResponse, InnerAppState};

use super::ImagesError;

pub fn images_router() -> Router<AppState> {
    Router::new().route("/:image_path", get(get_image))
}

/// Get a stored image object
#[utoipa::path(
    get,
    path = "/images/:image_path",
    responses(
        (status = 200, description = "Raw image bytes"),
        (status = 404, description = "No object stored under this path", body = ErrorResponse),
    ),
    tag = "Images API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn get_image(
    State(state): State<Arc<InnerAppState>>,
    Path(image_path): Path<String>,
) -> Result<Vec<u8>, ImagesError> {
    let bytes = state.storage.get_bytes(&image_path).await.map_err(|e| {
        tracing::error!("failed to get image bytes: {e}");
        ImagesError::ImageNotFound
    })?;

    Ok(bytes.to_vec())
}
