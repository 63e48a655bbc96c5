use axum::{http::StatusCode, response::IntoResponse};
use diesel::result::{DatabaseErrorKind, Error::DatabaseError};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{renditions::RenditionError, ErrorResponse};

use self::routes::{ALLOWED_MIME_TYPES, FILE_SIZE_LIMIT_MB};

pub mod models;
pub mod routes;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PinsParams {
    #[serde(default = "Uuid::nil")]
    pub min_id: Uuid,
    #[serde(default = "Uuid::max")]
    pub max_id: Uuid,
}

#[derive(thiserror::Error, Debug)]
pub enum PinsError {
    #[error("internal server error")]
    InternalServerError,

    #[error("pin not found")]
    PinNotFound,

    #[error("bad request")]
    BadRequest,

    #[error("image size too large, maximum image size is {}MB", FILE_SIZE_LIMIT_MB)]
    ImageTooLarge,

    #[error("invalid image content type, allowed types: {}", ALLOWED_MIME_TYPES.join(", "))]
    InvalidImageContentType,

    #[error(transparent)]
    Rendition(#[from] RenditionError),

    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),

    #[error(transparent)]
    PoolError(#[from] diesel_async::pooled_connection::deadpool::PoolError),

    #[error("validation error: {0}")]
    Validator(#[from] garde::Errors),
}

impl IntoResponse for PinsError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("{:#?}", self);

        match self {
            PinsError::PinNotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: self.to_string(),
                    ..Default::default()
                },
            )
                .into_response(),
            PinsError::BadRequest | PinsError::ImageTooLarge | PinsError::InvalidImageContentType => {
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: self.to_string(),
                        ..Default::default()
                    },
                )
                    .into_response()
            }
            PinsError::Rendition(err) => match err {
                RenditionError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                RenditionError::Decode(_) | RenditionError::UnsupportedContentType(_) => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: err.to_string(),
                        ..Default::default()
                    },
                )
                    .into_response(),
            },
            PinsError::Diesel(diesel_error) => {
                if diesel_error == diesel::result::Error::NotFound {
                    return (
                        StatusCode::NOT_FOUND,
                        ErrorResponse {
                            error: String::from("pin not found"),
                            ..Default::default()
                        },
                    )
                        .into_response();
                } else if let DatabaseError(DatabaseErrorKind::ForeignKeyViolation, message) =
                    diesel_error
                {
                    if message.constraint_name() == Some("pin_votes_pin_id_fkey") {
                        return (
                            StatusCode::NOT_FOUND,
                            ErrorResponse {
                                error: String::from("pin not found"),
                                ..Default::default()
                            },
                        )
                            .into_response();
                    }
                }
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            PinsError::Validator(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: String::from("invalid input"),
                    details: Some(
                        errors
                            .flatten()
                            .iter()
                            .map(|(path, error)| format!("{path}: {error}"))
                            .collect::<Vec<String>>(),
                    ),
                },
            )
                .into_response(),
            PinsError::InternalServerError | PinsError::PoolError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renditions;

    #[test]
    fn unknown_pin_maps_to_not_found() {
        let response = PinsError::PinNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let response = PinsError::Diesel(diesel::result::Error::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rejected_content_type_maps_to_bad_request() {
        let response = PinsError::InvalidImageContentType.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn oversized_image_maps_to_bad_request() {
        let response = PinsError::ImageTooLarge.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn undecodable_image_maps_to_bad_request() {
        let error = renditions::medium_rendition(b"not an image", "image/png")
            .expect_err("garbage bytes must not decode");

        let response = PinsError::Rendition(error).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cursor_params_default_to_full_range() {
        let params: PinsParams = serde_json::from_value(serde_json::json!({})).expect("params");

        assert_eq!(params.min_id, Uuid::nil());
        assert_eq!(params.max_id, Uuid::max());
    }
}
