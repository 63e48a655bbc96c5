use axum::{http::StatusCode, response::IntoResponse};
use diesel::result::{DatabaseErrorKind, Error::DatabaseError};

use crate::ErrorResponse;

pub mod models;
pub mod routes;

#[derive(thiserror::Error, Debug)]
pub enum UsersError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("already logged in")]
    AlreadyLoggedIn,

    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),

    #[error(transparent)]
    PoolError(#[from] diesel_async::pooled_connection::deadpool::PoolError),

    #[error(transparent)]
    Argon2(#[from] argon2::password_hash::Error),

    #[error("validation error: {0}")]
    Validator(#[from] garde::Errors),
}

impl IntoResponse for UsersError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("{:#?}", self);

        match self {
            UsersError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: self.to_string(),
                    ..Default::default()
                },
            )
                .into_response(),
            UsersError::AlreadyLoggedIn => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: self.to_string(),
                    ..Default::default()
                },
            )
                .into_response(),
            UsersError::Diesel(diesel_error) => {
                if let DatabaseError(DatabaseErrorKind::UniqueViolation, message) = diesel_error {
                    return match message.constraint_name() {
                        Some("users_username_key") => (
                            StatusCode::CONFLICT,
                            ErrorResponse {
                                error: String::from("username already taken"),
                                ..Default::default()
                            },
                        )
                            .into_response(),
                        Some("users_email_key") => (
                            StatusCode::CONFLICT,
                            ErrorResponse {
                                error: String::from("email already registered"),
                                ..Default::default()
                            },
                        )
                            .into_response(),
                        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                    };
                }
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            UsersError::Validator(errors) => (
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
            UsersError::PoolError(_) | UsersError::Argon2(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
