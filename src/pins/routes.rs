use std::sync::Arc;

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use diesel::{
    BelongingToDsl, ExpressionMethods, GroupedBy, OptionalExtension, QueryDsl, SelectableHelper,
};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use garde::Validate;
use itertools::multizip;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

use crate::{
    auth::AuthExtractor,
    renditions,
    s3::{interface::Storage, Upload},
    schema::{pin_votes, pins, users},
    users::models::{User, UserRole},
    AppState, ErrorResponse, InnerAppState,
};

use super::{
    models::{CreatePin, Pin, PinData, PinResponse, PinVote, UpdatePin, VoteResponse},
    PinsError, PinsParams,
};

pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

pub const FILE_SIZE_LIMIT_MB: usize = 10;

const FILE_SIZE_LIMIT: usize = FILE_SIZE_LIMIT_MB * 1024 * 1024;

pub fn pins_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_pins).post(create_pin))
        .route(
            "/:pin_id",
            get(get_pin)
                .put(update_pin)
                .patch(update_pin)
                .delete(delete_pin),
        )
        .route("/:pin_id/like", put(like_pin))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(FILE_SIZE_LIMIT))
}

/// Read an `image` multipart field into an [`Upload`]: content type checked
/// against the allow-list before anything is buffered, medium rendition
/// derived off the request task.
async fn read_upload(field: &mut Field<'_>) -> Result<Upload, PinsError> {
    let content_type = field
        .content_type()
        .ok_or(PinsError::BadRequest)?
        .to_string();

    if !ALLOWED_MIME_TYPES.contains(&content_type.as_str()) {
        tracing::error!("rejected image content type: {content_type}");
        return Err(PinsError::InvalidImageContentType);
    }

    let file_name = field
        .file_name()
        .ok_or_else(|| {
            tracing::error!("image field has no file name");
            PinsError::BadRequest
        })?
        .to_string();

    let mut data: Vec<u8> = Vec::new();

    while let Some(chunk) = field.chunk().await.map_err(|err| {
        tracing::error!("image field chunk error: {:#?}", err);
        PinsError::BadRequest
    })? {
        if data.len() + chunk.len() > FILE_SIZE_LIMIT {
            return Err(PinsError::ImageTooLarge);
        }
        data.extend_from_slice(&chunk);
    }

    let bytes = Bytes::from(data);

    let medium_bytes = tokio::task::spawn_blocking({
        let bytes = bytes.clone();
        let content_type = content_type.clone();
        move || renditions::medium_rendition(&bytes, &content_type)
    })
    .await
    .map_err(|err| {
        tracing::error!("rendition task failed: {err}");
        PinsError::InternalServerError
    })??;

    let path = format!("{}_{}", Uuid::now_v7(), file_name);
    let medium_path = format!("medium_{path}");

    Ok(Upload {
        path,
        medium_path,
        content_type,
        bytes,
        medium_bytes: Bytes::from(medium_bytes),
    })
}

async fn store_upload(storage: &Storage, upload: &Upload) -> crate::s3::Result<()> {
    storage
        .put_bytes(&upload.path, upload.bytes.clone(), &upload.content_type)
        .await?;
    storage
        .put_bytes(
            &upload.medium_path,
            upload.medium_bytes.clone(),
            &upload.content_type,
        )
        .await?;

    Ok(())
}

/// Get pins, newest first
#[utoipa::path(
    get,
    path = "/pins",
    params(
        PinsParams,
    ),
    responses(
        (status = 200, body = [PinResponse]),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    tag = "Pins API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn get_pins(
    State(state): State<Arc<InnerAppState>>,
    Query(params): Query<PinsParams>,
) -> Result<Json<Vec<PinResponse>>, PinsError> {
    tracing::debug!("cursor: {:#?}", params);

    let mut db = state.pool.get().await?;

    let pins_with_authors = pins::table
        .inner_join(users::table)
        .filter(pins::id.gt(params.min_id))
        .filter(pins::id.lt(params.max_id))
        .order(pins::id.desc())
        .select((Pin::as_select(), User::as_select()))
        .load::<(Pin, User)>(&mut db)
        .await?;

    let (pin_rows, authors): (Vec<Pin>, Vec<User>) = pins_with_authors.into_iter().unzip();

    let votes = PinVote::belonging_to(&pin_rows)
        .select(PinVote::as_select())
        .load::<PinVote>(&mut db)
        .await?
        .grouped_by(&pin_rows);

    let pins_response = multizip((pin_rows, authors, votes))
        .map(|(pin, author, votes)| pin.into_response(author.into(), votes.len() as i64))
        .collect();

    Ok(Json(pins_response))
}

/// Get pin by id
#[utoipa::path(
    get,
    path = "/pins/:pin_id",
    responses(
        (status = 200, description = "Requested pin", body = PinResponse),
        (status = 404, description = "Specified pin not found", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    tag = "Pins API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn get_pin(
    State(state): State<Arc<InnerAppState>>,
    Path(pin_id): Path<Uuid>,
) -> Result<Json<PinResponse>, PinsError> {
    let mut db = state.pool.get().await?;

    let (pin, author) = pins::table
        .inner_join(users::table)
        .filter(pins::id.eq(pin_id))
        .select((Pin::as_select(), User::as_select()))
        .first::<(Pin, User)>(&mut db)
        .await
        .optional()?
        .ok_or(PinsError::PinNotFound)?;

    let vote_count = pin_votes::table
        .filter(pin_votes::pin_id.eq(pin_id))
        .count()
        .get_result::<i64>(&mut db)
        .await?;

    Ok(Json(pin.into_response(author.into(), vote_count)))
}

/// Create pin
#[utoipa::path(
    post,
    path = "/pins",
    request_body(content = CreatePin, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Pin successfully created", body = PinResponse),
        (status = 400, description = "Fields validation error", body = ErrorResponse),
        (status = 401, description = "Caller has no valid session", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    security(
        ("session" = [])
    ),
    tag = "Pins API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn create_pin(
    auth: AuthExtractor<{ UserRole::User as u32 }>,
    State(state): State<Arc<InnerAppState>>,
    mut fields: Multipart,
) -> Result<Json<PinResponse>, PinsError> {
    let mut pin_data = PinData::builder();
    let mut upload: Option<Upload> = None;

    while let Some(mut field) = fields.next_field().await.map_err(|err| {
        tracing::debug!("create_pin multipart error: {:#?}", err);
        PinsError::InternalServerError
    })? {
        let Some(field_name) = field.name() else {
            continue;
        };

        match field_name {
            "title" => {
                pin_data = pin_data.title(field.text().await.map_err(|err| {
                    tracing::debug!("title field error: {:#?}", err);
                    PinsError::BadRequest
                })?);
            }
            "description" => {
                pin_data = pin_data.description(field.text().await.ok());
            }
            "image" => {
                upload = Some(read_upload(&mut field).await?);
            }
            _ => continue,
        }
    }

    let pin_data = pin_data.build().map_err(|_| PinsError::BadRequest)?;
    pin_data.validate(&())?;

    let pin = Pin {
        id: Uuid::now_v7(),
        title: pin_data.title,
        description: pin_data.description,
        image_path: upload.as_ref().map(|upload| upload.path.clone()),
        image_content_type: upload.as_ref().map(|upload| upload.content_type.clone()),
        medium_image_path: upload.as_ref().map(|upload| upload.medium_path.clone()),
        created_at: Utc::now(),
        updated_at: None,
        user_id: auth.current_user.id,
    };

    let mut db = state.pool.get().await?;

    let tx_state = Arc::clone(&state);
    let pin = db
        .transaction::<_, PinsError, _>(|transaction| {
            async move {
                let pin = diesel::insert_into(pins::table)
                    .values(&pin)
                    .returning(Pin::as_returning())
                    .get_result::<Pin>(transaction)
                    .await?;

                if let Some(upload) = &upload {
                    tracing::debug!("uploading pin image and medium rendition");
                    if let Err(err) = store_upload(&tx_state.storage, upload).await {
                        tracing::error!("s3 error: {:#?}", err);
                        return Err(PinsError::InternalServerError);
                    }
                }

                Ok(pin)
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(pin.into_response(auth.current_user, 0)))
}

/// Update pin
#[utoipa::path(
    put,
    path = "/pins/:pin_id",
    request_body(content = UpdatePin, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Pin has successfully been updated", body = Uuid),
        (status = 400, description = "Fields validation error", body = ErrorResponse),
        (status = 401, description = "Caller has no valid session", body = ErrorResponse),
        (status = 404, description = "Caller owns no such pin", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    security(
        ("session" = [])
    ),
    tag = "Pins API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn update_pin(
    auth: AuthExtractor<{ UserRole::User as u32 }>,
    State(state): State<Arc<InnerAppState>>,
    Path(pin_id): Path<Uuid>,
    mut fields: Multipart,
) -> Result<Json<Uuid>, PinsError> {
    let mut changes = UpdatePin::default();
    let mut upload: Option<Upload> = None;

    while let Some(mut field) = fields.next_field().await.map_err(|err| {
        tracing::debug!("update_pin multipart error: {:#?}", err);
        PinsError::InternalServerError
    })? {
        let Some(field_name) = field.name() else {
            continue;
        };

        match field_name {
            "title" => {
                changes.title = Some(field.text().await.map_err(|err| {
                    tracing::debug!("title field error: {:#?}", err);
                    PinsError::BadRequest
                })?);
            }
            "description" => {
                // TODO: distinguish "leave unchanged" from an explicit clear
                changes.description = field.text().await.ok();
            }
            "image" => {
                upload = Some(read_upload(&mut field).await?);
            }
            _ => continue,
        }
    }

    changes.validate(&())?;

    let user_id = auth.current_user.id;
    let mut db = state.pool.get().await?;

    let tx_state = Arc::clone(&state);
    let (updated_id, replaced) = db
        .transaction::<_, PinsError, _>(|transaction| {
            async move {
                // owner filter doubles as the existence check
                let previous = pins::table
                    .filter(pins::id.eq(pin_id))
                    .filter(pins::user_id.eq(user_id))
                    .select(Pin::as_select())
                    .first::<Pin>(transaction)
                    .await?;

                let update_target = pins::table
                    .filter(pins::id.eq(pin_id))
                    .filter(pins::user_id.eq(user_id));

                let updated = if let Some(upload) = &upload {
                    diesel::update(update_target)
                        .set((
                            &changes,
                            pins::updated_at.eq(Some(Utc::now())),
                            pins::image_path.eq(Some(upload.path.clone())),
                            pins::image_content_type.eq(Some(upload.content_type.clone())),
                            pins::medium_image_path.eq(Some(upload.medium_path.clone())),
                        ))
                        .returning(Pin::as_returning())
                        .get_result::<Pin>(transaction)
                        .await?
                } else {
                    diesel::update(update_target)
                        .set((&changes, pins::updated_at.eq(Some(Utc::now()))))
                        .returning(Pin::as_returning())
                        .get_result::<Pin>(transaction)
                        .await?
                };

                if let Some(upload) = &upload {
                    tracing::debug!("uploading replacement image and medium rendition");
                    if let Err(err) = store_upload(&tx_state.storage, upload).await {
                        tracing::error!("s3 error: {:#?}", err);
                        return Err(PinsError::InternalServerError);
                    }
                }

                let replaced = upload
                    .is_some()
                    .then_some((previous.image_path, previous.medium_image_path));

                Ok((updated.id, replaced))
            }
            .scope_boxed()
        })
        .await?;

    if let Some((old_path, old_medium_path)) = replaced {
        for path in [old_path, old_medium_path].into_iter().flatten() {
            if let Err(err) = state.storage.delete(&path).await {
                tracing::error!("failed to delete replaced image {path}: {err}");
            }
        }
    }

    Ok(Json(updated_id))
}

/// Delete pin
#[utoipa::path(
    delete,
    path = "/pins/:pin_id",
    responses(
        (status = 200, description = "Specified pin has been successfully deleted"),
        (status = 401, description = "Caller has no valid session", body = ErrorResponse),
        (status = 404, description = "Caller owns no such pin", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    security(
        ("session" = [])
    ),
    tag = "Pins API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn delete_pin(
    auth: AuthExtractor<{ UserRole::User as u32 }>,
    State(state): State<Arc<InnerAppState>>,
    Path(pin_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, PinsError> {
    let mut db = state.pool.get().await?;

    let pin = diesel::delete(
        pins::table
            .filter(pins::id.eq(pin_id))
            .filter(pins::user_id.eq(auth.current_user.id)),
    )
    .returning(Pin::as_returning())
    .get_result::<Pin>(&mut db)
    .await?;

    // votes go with the row via the cascade; stored objects are removed
    // best effort
    for path in [pin.image_path, pin.medium_image_path].into_iter().flatten() {
        if let Err(err) = state.storage.delete(&path).await {
            tracing::error!("failed to delete stored image {path}: {err}");
        }
    }

    Ok(Json(json!({
        "message": format!("deleted pin: {}", pin.id)
    })))
}

/// Like pin
#[utoipa::path(
    put,
    path = "/pins/:pin_id/like",
    responses(
        (status = 200, description = "Vote recorded, updated tally returned", body = VoteResponse),
        (status = 401, description = "Caller has no valid session", body = ErrorResponse),
        (status = 404, description = "Specified pin not found", body = ErrorResponse),
        (status = 500, description = "Something went wrong", body = ErrorResponse),
    ),
    security(
        ("session" = [])
    ),
    tag = "Pins API"
)]
#[axum::debug_handler(state = AppState)]
pub async fn like_pin(
    auth: AuthExtractor<{ UserRole::User as u32 }>,
    State(state): State<Arc<InnerAppState>>,
    Path(pin_id): Path<Uuid>,
) -> Result<Json<VoteResponse>, PinsError> {
    let user_id = auth.current_user.id;
    let mut db = state.pool.get().await?;

    let vote_count = db
        .transaction::<_, PinsError, _>(|transaction| {
            async move {
                let vote = PinVote {
                    pin_id,
                    user_id,
                    created_at: Utc::now(),
                };

                // replayed likes hit the composite key and fall through
                diesel::insert_into(pin_votes::table)
                    .values(&vote)
                    .on_conflict_do_nothing()
                    .execute(transaction)
                    .await?;

                let vote_count = pin_votes::table
                    .filter(pin_votes::pin_id.eq(pin_id))
                    .count()
                    .get_result::<i64>(transaction)
                    .await?;

                Ok(vote_count)
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(VoteResponse {
        pin_id,
        vote_count,
    }))
}
