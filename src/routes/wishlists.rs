/**
 * Wishlist Routes
 * Owner-scoped CRUD for wishlists
 */
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{NewWishlist, WishlistChanges, WishlistSummary};
use crate::error::AppError;
use crate::projection::{self, OwnerWishlist};
use crate::validation::{double_option, Validator};
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Request body for POST /api/wishlists
#[derive(Debug, Deserialize)]
pub struct CreateWishlistRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub surprise_mode: bool,
}

/// Request body for PATCH /api/wishlists/{id}
#[derive(Debug, Deserialize)]
pub struct UpdateWishlistRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub surprise_mode: Option<bool>,
}

const MAX_DESCRIPTION: usize = 2000;

impl CreateWishlistRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("name", &self.name, 1, 255);
        if let Some(description) = &self.description {
            v.length("description", description, 0, MAX_DESCRIPTION);
        }
        v.finish()
    }
}

impl UpdateWishlistRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.length("name", name, 1, 255);
        }
        if let Some(Some(description)) = &self.description {
            v.length("description", description, 0, MAX_DESCRIPTION);
        }
        v.finish()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/wishlists
pub async fn list_wishlists(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<WishlistSummary>>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let wishlists = state.store.list_wishlists(actor).await?;
    Ok(Json(wishlists))
}

/// POST /api/wishlists
pub async fn create_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateWishlistRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Json(req) = payload?;
    req.validate()?;

    let wishlist = state
        .store
        .insert_wishlist(
            actor,
            NewWishlist {
                name: req.name.trim().to_string(),
                description: req.description,
                surprise_mode: req.surprise_mode,
            },
        )
        .await?;

    tracing::info!(wishlist_id = %wishlist.id, "wishlist created");
    Ok((StatusCode::CREATED, Json(wishlist)))
}

/// GET /api/wishlists/{id}
///
/// The wishlist with its items (reserver hidden in surprise mode) and shares.
pub async fn get_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OwnerWishlist>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(id) = path?;

    let wishlist = state
        .store
        .find_owned_wishlist(id, actor)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = state.store.list_items(wishlist.id).await?;
    let shares = state.store.list_shares(wishlist.id).await?;
    let categories = state.store.list_categories(actor).await?;

    Ok(Json(projection::project_owner(
        wishlist,
        items,
        shares,
        &categories,
    )))
}

/// PATCH /api/wishlists/{id}
pub async fn update_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateWishlistRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let wishlist = state
        .store
        .update_wishlist(
            id,
            actor,
            WishlistChanges {
                name: req.name.map(|n| n.trim().to_string()),
                description: req.description,
                surprise_mode: req.surprise_mode,
            },
        )
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(wishlist))
}

/// DELETE /api/wishlists/{id}
pub async fn delete_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(id) = path?;

    if !state.store.delete_wishlist(id, actor).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(wishlist_id = %id, "wishlist deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_requires_authentication() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/api/wishlists", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authorization required");
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();

        let (status, created) = app
            .send(
                Method::POST,
                "/api/wishlists",
                Some(owner),
                Some(json!({ "name": "  Housewarming ", "surprise_mode": true })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Housewarming");
        assert_eq!(created["surprise_mode"], true);
        assert_eq!(created["owner_id"], owner.to_string());

        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
        app.item(id, "Toaster", 1).await;

        let (status, list) = app.send(Method::GET, "/api/wishlists", Some(owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["item_count"], 1);
        assert!(list[0]["active_share_token"].is_null());

        let (_, other) = app
            .send(Method::GET, "/api/wishlists", Some(Uuid::new_v4()), None)
            .await;
        assert!(other.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/api/wishlists",
                Some(Uuid::new_v4()),
                Some(json!({ "name": "" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["name"].is_array());
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/api/wishlists",
                Some(Uuid::new_v4()),
                Some(json!({ "description": "no name" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["body"].is_array());
    }

    #[tokio::test]
    async fn test_non_owner_sees_not_found() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        let uri = format!("/api/wishlists/{}", wishlist.id);

        let (status, _) = app.send(Method::GET, &uri, Some(stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app
            .send(Method::PATCH, &uri, Some(stranger), Some(json!({ "name": "Mine" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.send(Method::DELETE, &uri, Some(stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(Method::GET, "/api/wishlists/not-a-uuid", Some(owner), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.send(Method::GET, &uri, Some(owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Birthday");
    }

    #[tokio::test]
    async fn test_update_clears_description() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        let uri = format!("/api/wishlists/{}", wishlist.id);

        let (_, body) = app
            .send(
                Method::PATCH,
                &uri,
                Some(owner),
                Some(json!({ "description": "Things I like" })),
            )
            .await;
        assert_eq!(body["description"], "Things I like");

        let (status, body) = app
            .send(
                Method::PATCH,
                &uri,
                Some(owner),
                Some(json!({ "description": null, "surprise_mode": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["description"].is_null());
        assert_eq!(body["surprise_mode"], true);
        assert_eq!(body["name"], "Birthday");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_items() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        app.item(wishlist.id, "Lamp", 1).await;
        let uri = format!("/api/wishlists/{}", wishlist.id);

        let (status, body) = app.send(Method::DELETE, &uri, Some(owner), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());

        let (status, _) = app.send(Method::GET, &uri, Some(owner), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(app.store().list_items(wishlist.id).await.unwrap().is_empty());
    }
}
