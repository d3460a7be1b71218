/**
 * Category Routes
 * Owner-scoped item categories
 */
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{Category, CategoryChanges, NewCategory};
use crate::error::AppError;
use crate::validation::{double_option, Validator};
use crate::AppState;

pub const DEFAULT_COLOR: &str = "#3b82f6";

/// Request body for POST /api/categories
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub icon: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// Request body for PATCH /api/categories/{id}
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

fn check_icon(v: &mut Validator, icon: &str) {
    v.length("icon", icon, 0, 50);
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Category>>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    Ok(Json(state.store.list_categories(actor).await?))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.length("name", &req.name, 1, 100);
    if let Some(icon) = &req.icon {
        check_icon(&mut v, icon);
    }
    v.color("color", &req.color);
    v.finish()?;

    let category = state
        .store
        .insert_category(
            actor,
            NewCategory {
                name: req.name.trim().to_string(),
                icon: req.icon,
                color: req.color,
                sort_order: req.sort_order,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<Category>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(id) = path?;
    let Json(req) = payload?;

    let mut v = Validator::new();
    if let Some(name) = &req.name {
        v.length("name", name, 1, 100);
    }
    if let Some(Some(icon)) = &req.icon {
        check_icon(&mut v, icon);
    }
    if let Some(color) = &req.color {
        v.color("color", color);
    }
    v.finish()?;

    let category = state
        .store
        .update_category(
            id,
            actor,
            CategoryChanges {
                name: req.name.map(|n| n.trim().to_string()),
                icon: req.icon,
                color: req.color,
                sort_order: req.sort_order,
            },
        )
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(category))
}

/// DELETE /api/categories/{id}
///
/// Items filed under the category stay, uncategorised.
pub async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(id) = path?;

    if !state.store.delete_category(id, actor).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
