/**
 * Item Routes
 * Owner-scoped item CRUD under /api/wishlists/{id}/items
 */
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::models::{ItemChanges, ItemStatus, NewItem, Wishlist};
use crate::error::AppError;
use crate::projection::{self, CategoryTag, OwnerItem};
use crate::validation::{double_option, Validator};
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Request body for POST /api/wishlists/{id}/items
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub external_link: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i16,
    pub category_id: Option<Uuid>,
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_priority() -> i16 {
    1
}

/// Request body for PATCH /api/wishlists/{id}/items
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(rename = "itemId")]
    pub item_id: Uuid,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub price: Option<Option<Decimal>>,
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub external_link: Option<Option<String>>,
    pub priority: Option<i16>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub status: Option<ItemStatus>,
}

/// Query for DELETE /api/wishlists/{id}/items
#[derive(Debug, Deserialize)]
pub struct DeleteItemQuery {
    #[serde(rename = "itemId")]
    pub item_id: Uuid,
}

const MAX_TEXT: usize = 2000;

fn check_optional_text(v: &mut Validator, field: &str, value: Option<&str>) {
    if let Some(text) = value {
        v.length(field, text, 0, MAX_TEXT);
    }
}

fn check_optional_url(v: &mut Validator, field: &str, value: Option<&str>) {
    if let Some(url) = value {
        v.url(field, url);
    }
}

/// Value of a patch field that is set to something other than null.
fn present(field: &Option<Option<String>>) -> Option<&str> {
    field.as_ref().and_then(|value| value.as_deref())
}

impl CreateItemRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("name", &self.name, 1, 255);
        check_optional_text(&mut v, "description", self.description.as_deref());
        check_optional_url(&mut v, "image_url", self.image_url.as_deref());
        if let Some(price) = self.price {
            v.positive_price("price", price);
        }
        v.currency("currency", &self.currency);
        check_optional_url(&mut v, "external_link", self.external_link.as_deref());
        v.priority("priority", self.priority);
        check_optional_text(&mut v, "notes", self.notes.as_deref());
        v.finish()
    }
}

impl UpdateItemRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.length("name", name, 1, 255);
        }
        check_optional_text(&mut v, "description", present(&self.description));
        check_optional_url(&mut v, "image_url", present(&self.image_url));
        if let Some(Some(price)) = self.price {
            v.positive_price("price", price);
        }
        if let Some(currency) = &self.currency {
            v.currency("currency", currency);
        }
        check_optional_url(&mut v, "external_link", present(&self.external_link));
        if let Some(priority) = self.priority {
            v.priority("priority", priority);
        }
        check_optional_text(&mut v, "notes", present(&self.notes));
        if self.status == Some(ItemStatus::Reserved) {
            v.error("status", "Items are reserved through a share link");
        }
        v.finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// The caller's wishlist, or `NotFound`.
async fn owned_wishlist(state: &AppState, id: Uuid, actor: Uuid) -> Result<Wishlist, AppError> {
    state
        .store
        .find_owned_wishlist(id, actor)
        .await?
        .ok_or(AppError::NotFound)
}

/// The caller's categories keyed by id, for tagging returned items.
async fn category_tags(
    state: &AppState,
    actor: Uuid,
) -> Result<HashMap<Uuid, CategoryTag>, AppError> {
    let categories = state.store.list_categories(actor).await?;
    Ok(projection::category_index(&categories))
}

/// A referenced category must belong to the caller.
async fn check_category(state: &AppState, category_id: Uuid, actor: Uuid) -> Result<(), AppError> {
    match state.store.find_owned_category(category_id, actor).await? {
        Some(_) => Ok(()),
        None => Err(AppError::invalid("category_id", "Unknown category")),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/wishlists/{id}/items
pub async fn list_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<OwnerItem>>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(wishlist_id) = path?;
    let wishlist = owned_wishlist(&state, wishlist_id, actor).await?;

    let items = state.store.list_items(wishlist.id).await?;
    let categories = state.store.list_categories(actor).await?;
    Ok(Json(projection::owner_items(
        items,
        wishlist.surprise_mode,
        &categories,
    )))
}

/// POST /api/wishlists/{id}/items
pub async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(wishlist_id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let wishlist = owned_wishlist(&state, wishlist_id, actor).await?;
    if let Some(category_id) = req.category_id {
        check_category(&state, category_id, actor).await?;
    }

    let item = state
        .store
        .insert_item(
            wishlist.id,
            NewItem {
                category_id: req.category_id,
                name: req.name.trim().to_string(),
                description: req.description,
                image_url: req.image_url,
                price: req.price,
                currency: req.currency,
                external_link: req.external_link,
                priority: req.priority,
                notes: req.notes,
            },
        )
        .await?;

    tracing::info!(wishlist_id = %wishlist.id, item_id = %item.id, "item created");
    let tags = category_tags(&state, actor).await?;
    Ok((
        StatusCode::CREATED,
        Json(projection::owner_item(item, wishlist.surprise_mode, &tags)),
    ))
}

/// PATCH /api/wishlists/{id}/items
pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<OwnerItem>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(wishlist_id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let wishlist = owned_wishlist(&state, wishlist_id, actor).await?;
    if let Some(Some(category_id)) = req.category_id {
        check_category(&state, category_id, actor).await?;
    }

    let changes = ItemChanges {
        category_id: req.category_id,
        name: req.name.map(|n| n.trim().to_string()),
        description: req.description,
        image_url: req.image_url,
        price: req.price,
        currency: req.currency,
        external_link: req.external_link,
        priority: req.priority,
        status: req.status,
        notes: req.notes,
    };

    let item = state
        .store
        .update_item(req.item_id, wishlist.id, changes)
        .await?
        .ok_or(AppError::NotFound)?;

    let tags = category_tags(&state, actor).await?;
    Ok(Json(projection::owner_item(item, wishlist.surprise_mode, &tags)))
}

/// DELETE /api/wishlists/{id}/items?itemId=
pub async fn delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<DeleteItemQuery>, QueryRejection>,
) -> Result<StatusCode, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(wishlist_id) = path?;
    let Query(query) = query?;

    let wishlist = owned_wishlist(&state, wishlist_id, actor).await?;
    if !state.store.delete_item(query.item_id, wishlist.id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(wishlist_id = %wishlist.id, item_id = %query.item_id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}
