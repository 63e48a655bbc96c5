use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use diesel_async::{pooled_connection::deadpool::Pool, AsyncPgConnection};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tower_cookies::{CookieManagerLayer, Key};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use ts_rs::TS;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::s3::interface::Storage;

pub mod auth;
pub mod common;
pub mod config;
pub mod migrations;
pub mod pins;
pub mod renditions;
pub mod s3;
pub mod schema;
pub mod sessions;
pub mod users;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub inner: Arc<InnerAppState>,
}

pub struct InnerAppState {
    pub pool: Pool<AsyncPgConnection>,
    pub storage: Storage,
}

pub static COOKIES_SECRET: OnceCell<Key> = OnceCell::new();

#[derive(Serialize, Deserialize, ToSchema, TS, Debug, Default)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pins::routes::get_pins))
        .route("/health", get(health))
        .nest("/pins", pins::routes::pins_router())
        .nest("/users", users::routes::users_router())
        .nest("/images", s3::routes::images_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            sessions::refresh_session,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        pins::routes::get_pins,
        pins::routes::get_pin,
        pins::routes::create_pin,
        pins::routes::update_pin,
        pins::routes::delete_pin,
        pins::routes::like_pin,
        users::routes::create_user,
        users::routes::login,
        users::routes::logout,
        users::routes::get_me,
        s3::routes::get_image,
    ),
    components(
        schemas(pins::models::CreatePin),
        schemas(pins::models::UpdatePin),
        schemas(pins::models::PinResponse),
        schemas(pins::models::VoteResponse),
        schemas(users::models::CreateUser),
        schemas(users::models::CreateUserResponse),
        schemas(users::models::UserLogin),
        schemas(users::models::UserResponseBrief),
        schemas(users::models::UserRole),
        schemas(common::models::ImageResponse),
        schemas(ErrorResponse),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Pins API"),
        (name = "Users API"),
        (name = "Images API"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    sessions::SESSION_COOKIE_NAME,
                ))),
            )
        }
    }
}
