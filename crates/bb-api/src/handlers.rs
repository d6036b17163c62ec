//! # bb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the service
//! layer. The acting identity arrives in trusted reverse-proxy headers;
//! privileges are resolved per request through the `PrivilegeProvider` port.

use crate::error::ApiError;
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use bb_core::error::AppError;
use bb_core::models::Actor;
use bb_core::privilege::PrivilegeSet;
use bb_core::traits::PrivilegeProvider;
use bb_services::{
    BatchVisibilityAction, CategoryDraft, CategoryService, EntryDraft, EntryFilter, EntryService,
    ImageService, ModerationService, NewComment, NewImageUpload, RulesStore,
};
use futures_util::TryStreamExt;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub entries: Arc<EntryService>,
    pub categories: Arc<CategoryService>,
    pub moderation: Arc<ModerationService>,
    pub images: Arc<ImageService>,
    pub rules: Arc<RulesStore>,
    pub auth: Arc<dyn PrivilegeProvider>,
}

/// Resolves the acting identity from the trusted proxy headers. The display
/// name is optional and falls back to the account.
fn identify(req: &HttpRequest, state: &AppState) -> Result<(Actor, PrivilegeSet), ApiError> {
    let account = req
        .headers()
        .get("X-Remote-User")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ApiError(AppError::PermissionDenied(
                "no acting identity on the request".into(),
            ))
        })?;

    let display = req
        .headers()
        .get("X-Remote-User-Display")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(account);

    let actor = Actor::new(account, display);
    let privileges = state.auth.privileges(&actor);
    Ok((actor, privileges))
}

// ── Entries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: EntryFilter,
    pub category: Option<Uuid>,
    pub q: Option<String>,
}

pub async fn list_entries(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let query = query.into_inner();

    let entries = state
        .entries
        .list(
            query.filter,
            query.category,
            query.q.as_deref(),
            &actor,
            &privileges,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "entries": entries,
        "filters": EntryFilter::available(&privileges),
        "disabled_batch_action": query.filter.disabled_batch_action(),
    })))
}

pub async fn create_entry(
    state: web::Data<AppState>,
    req: HttpRequest,
    draft: web::Json<EntryDraft>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let entry = state
        .entries
        .create(draft.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Created().json(entry))
}

pub async fn show_entry(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let entry = state
        .entries
        .show(path.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn update_entry(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    draft: web::Json<EntryDraft>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let entry = state
        .entries
        .update(path.into_inner(), draft.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn delete_entry(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    state
        .entries
        .delete(path.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Moderation ──────────────────────────────────────────────────────────────

pub async fn lock_entry(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let entry = state
        .moderation
        .lock(path.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn unlock_entry(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let entry = state
        .moderation
        .unlock(path.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

#[derive(Debug, Deserialize)]
pub struct VisibilityBody {
    pub visible: bool,
}

pub async fn set_entry_visibility(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<VisibilityBody>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let entry = state
        .moderation
        .set_visibility(path.into_inner(), body.visible, &actor, &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub action: BatchVisibilityAction,
    pub ids: Vec<Uuid>,
}

/// Batch show/hide. Always answers 200 with the per-item message bag; the
/// individual outcomes are data, not transport errors.
pub async fn batch_visibility(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<BatchBody>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let body = body.into_inner();
    let bag = state
        .moderation
        .batch(body.action, &body.ids, &actor, &privileges)
        .await;
    Ok(HttpResponse::Ok().json(bag))
}

// ── Comments ────────────────────────────────────────────────────────────────

pub async fn add_comment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<NewComment>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let comment = state
        .moderation
        .add_comment(path.into_inner(), body.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// First step of the two-step deletion: returns the comment so the client
/// can render the confirmation view.
pub async fn confirm_comment_deletion(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (_actor, privileges) = identify(&req, &state)?;
    let comment = state
        .moderation
        .comment_for_confirmation(path.into_inner(), &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    pub confirm: bool,
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<ConfirmBody>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    match state
        .moderation
        .delete_comment(path.into_inner(), &actor, &privileges, body.confirm)
        .await?
    {
        Some(comment) => Ok(HttpResponse::Ok().json(comment)),
        None => Ok(HttpResponse::Ok().json(serde_json::json!({ "cancelled": true }))),
    }
}

// ── Images ──────────────────────────────────────────────────────────────────

/// Multipart upload: an `image` file part plus an optional `description`
/// text part.
pub async fn upload_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let entry_id = path.into_inner();

    let mut file_name = None;
    let mut content_type = None;
    let mut data = Vec::new();
    let mut description = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|err| AppError::Validation(format!("malformed multipart payload: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|err| AppError::Validation(format!("malformed multipart payload: {err}")))?
        {
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "image" => {
                file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(str::to_string);
                content_type = field.content_type().map(|m| m.to_string());
                data = bytes;
            }
            "description" => {
                let text = String::from_utf8_lossy(&bytes).trim().to_string();
                if !text.is_empty() {
                    description = Some(text);
                }
            }
            _ => {}
        }
    }

    let upload = NewImageUpload {
        entry_id,
        file_name: file_name
            .ok_or_else(|| AppError::Validation("no image file in the upload".into()))?,
        content_type: content_type
            .ok_or_else(|| AppError::Validation("uploaded file has no media type".into()))?,
        data,
        description,
    };

    let image = state.images.store(upload, &actor, &privileges).await?;
    Ok(HttpResponse::Created().json(image))
}

pub async fn delete_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let image = state
        .images
        .delete(path.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(image))
}

pub async fn serve_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let (entry_id, image_id) = path.into_inner();

    let file = state
        .images
        .serve(entry_id, image_id, &actor, &privileges)
        .await?;

    let bytes = tokio::fs::read(&file).await.map_err(AppError::internal)?;
    Ok(HttpResponse::Ok().content_type("image/png").body(bytes))
}

// ── Rules ───────────────────────────────────────────────────────────────────

pub async fn get_rules(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let (_actor, privileges) = identify(&req, &state)?;
    if !privileges.any() {
        return Err(ApiError(AppError::PermissionDenied(
            "you are not allowed to use the bill-board".into(),
        )));
    }

    let rules = state.rules.read().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "rules": rules })))
}

#[derive(Debug, Deserialize)]
pub struct RulesBody {
    pub rules: String,
}

pub async fn put_rules(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<RulesBody>,
) -> Result<HttpResponse, ApiError> {
    let (_actor, privileges) = identify(&req, &state)?;
    if !privileges.manage {
        return Err(ApiError(AppError::PermissionDenied(
            "you need the manage privilege to edit the rules".into(),
        )));
    }

    state.rules.write(&body.rules).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Categories ──────────────────────────────────────────────────────────────

pub async fn list_categories(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let (_actor, privileges) = identify(&req, &state)?;
    let categories = state.categories.list(&privileges).await?;
    Ok(HttpResponse::Ok().json(categories))
}

pub async fn create_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    draft: web::Json<CategoryDraft>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let category = state
        .categories
        .create(draft.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Created().json(category))
}

pub async fn update_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    draft: web::Json<CategoryDraft>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    let category = state
        .categories
        .update(path.into_inner(), draft.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

pub async fn delete_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (actor, privileges) = identify(&req, &state)?;
    state
        .categories
        .delete(path.into_inner(), &actor, &privileges)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
