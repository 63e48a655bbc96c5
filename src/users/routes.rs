use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, PasswordHash,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use garde::Validate;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    auth::AuthExtractor,
    schema::{sessions, users},
    sessions::{models::Session, UserSession, SESSION_COOKIE_NAME, SESSION_TTL_DAYS},
    AppState, ErrorResponse, InnerAppState, COOKIES_SECRET,
};

use super::{
    models::{CreateUser, CreateUserResponse, User, UserLogin, UserResponseBrief, UserRole},
    UsersError,
};

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_me))
}

/// Create user
#[utoipa::path(
    post,
    path = "/users",
    request_body(content = CreateUser, content_type = "application/json"),
    responses(
        (status = 200, description = "User successfully registered", body = CreateUserResponse),
        (status = 400, description = "Fields validation error", body = ErrorResponse),
        (status = 409, description = "Username or email already in use", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    tag = "Users API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn create_user(
    State(state): State<Arc<InnerAppState>>,
    Json(payload): Json<CreateUser>,
) -> Result<Json<CreateUserResponse>, UsersError> {
    payload.validate(&())?;

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hashed_password = argon2
        .hash_password(payload.password.as_bytes(), &salt)?
        .to_string();

    let user = User {
        id: Uuid::now_v7(),
        username: payload.username.to_lowercase(),
        displayname: payload.username,
        email: payload.email.to_lowercase(),
        password: hashed_password,
        role: UserRole::User,
        created_at: Utc::now(),
        updated_at: None,
        last_login: None,
    };

    let mut db = state.pool.get().await?;

    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut db)
        .await?;

    Ok(Json(CreateUserResponse { user_id: user.id }))
}

/// Login
#[utoipa::path(
    post,
    path = "/users/login",
    request_body(content = UserLogin, content_type = "application/json"),
    responses(
        (status = 200, description = "Logged in, session cookie set", body = UserResponseBrief),
        (status = 400, description = "Already logged in", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    tag = "Users API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn login(
    user_session: UserSession,
    State(state): State<Arc<InnerAppState>>,
    cookies: Cookies,
    Json(payload): Json<UserLogin>,
) -> Result<Json<UserResponseBrief>, UsersError> {
    payload.validate(&())?;

    let mut db = state.pool.get().await?;

    if let Some(session_id) = user_session.session_id {
        let live_session = sessions::table
            .find(session_id)
            .filter(sessions::expires_at.gt(Utc::now()))
            .select(Session::as_select())
            .first::<Session>(&mut db)
            .await
            .optional()?;

        if live_session.is_some() {
            return Err(UsersError::AlreadyLoggedIn);
        }
    }

    let user = users::table
        .filter(users::email.eq(payload.email.to_lowercase()))
        .select(User::as_select())
        .first::<User>(&mut db)
        .await
        .optional()?
        .ok_or(UsersError::InvalidCredentials)?;

    let parsed_password = PasswordHash::new(&user.password)?;

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_password)
        .is_err()
    {
        return Err(UsersError::InvalidCredentials);
    }

    let session = Session {
        id: Uuid::now_v7(),
        created_at: Utc::now(),
        expires_at: Utc::now() + Duration::days(SESSION_TTL_DAYS),
        user_id: user.id,
    };

    diesel::insert_into(sessions::table)
        .values(&session)
        .execute(&mut db)
        .await?;

    diesel::update(users::table.find(user.id))
        .set(users::last_login.eq(Some(Utc::now())))
        .execute(&mut db)
        .await?;

    let key = COOKIES_SECRET.get().expect("cookies secret key");

    cookies.private(key).add(
        Cookie::build(SESSION_COOKIE_NAME, session.id.to_string())
            .path("/")
            .http_only(true)
            .finish(),
    );

    Ok(Json(UserResponseBrief {
        id: user.id,
        displayname: user.displayname,
        username: user.username,
        email: user.email,
        role: user.role,
    }))
}

/// Logout
#[utoipa::path(
    post,
    path = "/users/logout",
    responses(
        (status = 200, description = "Session removed, cookie cleared"),
        (status = 401, description = "Caller has no valid session", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    security(
        ("session" = [])
    ),
    tag = "Users API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn logout(
    auth: AuthExtractor<{ UserRole::User as u32 }>,
    State(state): State<Arc<InnerAppState>>,
    cookies: Cookies,
) -> Result<(), UsersError> {
    let mut db = state.pool.get().await?;

    diesel::delete(sessions::table.find(auth.session_id))
        .execute(&mut db)
        .await?;

    let key = COOKIES_SECRET.get().expect("cookies secret key");
    cookies
        .private(key)
        .remove(Cookie::new(SESSION_COOKIE_NAME, ""));

    Ok(())
}

/// Get the logged-in user
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Caller's profile", body = UserResponseBrief),
        (status = 401, description = "Caller has no valid session", body = ErrorResponse),
    ),
    security(
        ("session" = [])
    ),
    tag = "Users API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn get_me(
    auth: AuthExtractor<{ UserRole::User as u32 }>,
) -> Result<Json<UserResponseBrief>, UsersError> {
    Ok(Json(auth.current_user))
}
