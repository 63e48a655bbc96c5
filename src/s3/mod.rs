use axum::{http::StatusCode, response::IntoResponse, BoxError};
use bytes::Bytes;

use crate::ErrorResponse;

pub mod helpers;
pub mod interface;
pub mod routes;

pub type Result<T, E = BoxError> = std::result::Result<T, E>;

/// An accepted image upload, ready to be written to the object store.
pub struct Upload {
    pub path: String,
    pub medium_path: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub medium_bytes: Bytes,
}

#[derive(thiserror::Error, Debug)]
pub enum ImagesError {
    #[error("internal server error")]
    InternalServerError,

    #[error("image not found")]
    ImageNotFound,
}

impl IntoResponse for ImagesError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("{:#?}", self);

        match self {
            ImagesError::ImageNotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: self.to_string(),
                    ..Default::default()
                },
            )
                .into_response(),
            ImagesError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
