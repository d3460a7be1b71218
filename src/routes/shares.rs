/**
 * Share Routes
 * Share link management and the public share-link view
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
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::projection::{self, PublicItem, PublicWishlist};
use crate::reservation::{self, ReservationAction};
use crate::share;
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Request body for POST /api/shares
#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    pub wishlist_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Query for DELETE /api/shares
#[derive(Debug, Deserialize)]
pub struct RevokeShareQuery {
    pub id: Uuid,
}

/// Request body for PATCH /api/shares/{token}
#[derive(Debug, Deserialize)]
pub struct ReservationRequest {
    #[serde(rename = "itemId")]
    pub item_id: Uuid,
    pub action: ReservationAction,
}

// ============================================================================
// Owner Handlers
// ============================================================================

/// POST /api/shares
pub async fn create_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Json(req) = payload?;

    if let Some(expires_at) = req.expires_at {
        if expires_at <= Utc::now() {
            return Err(AppError::invalid("expires_at", "Must be in the future"));
        }
    }

    let share = share::create_share(state.store.as_ref(), req.wishlist_id, actor, req.expires_at)
        .await?;
    Ok((StatusCode::CREATED, Json(share)))
}

/// DELETE /api/shares?id=
pub async fn revoke_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<RevokeShareQuery>, QueryRejection>,
) -> Result<StatusCode, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Query(query) = query?;

    share::revoke_share(state.store.as_ref(), query.id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Share-link Handlers
// ============================================================================

/// GET /api/shares/{token}
///
/// Anonymous. The response never identifies who reserved what.
pub async fn view_shared(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<PublicWishlist>, AppError> {
    let Path(token) = path.map_err(|_| AppError::LinkInvalid)?;
    let store = state.store.as_ref();

    let share = share::resolve(store, &token, Utc::now()).await?;
    let wishlist = store
        .get_wishlist(share.wishlist_id)
        .await?
        .ok_or(AppError::LinkInvalid)?;

    let owner = store.get_profile(wishlist.owner_id).await?;
    let categories = store.list_categories(wishlist.owner_id).await?;
    let items = store.list_items(wishlist.id).await?;

    Ok(Json(projection::project_public(
        wishlist,
        owner,
        items,
        &categories,
    )))
}

/// PATCH /api/shares/{token}
///
/// Reserve or release an item through a live share link.
pub async fn reserve_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<Json<PublicItem>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Path(token) = path.map_err(|_| AppError::LinkInvalid)?;
    let Json(req) = payload?;
    let store = state.store.as_ref();

    let share = share::resolve(store, &token, Utc::now()).await?;
    let item = reservation::apply(store, req.action, req.item_id, share.wishlist_id, actor).await?;

    let owner_id = store
        .get_wishlist(share.wishlist_id)
        .await?
        .map(|w| w.owner_id);
    let categories = match owner_id {
        Some(owner_id) => store.list_categories(owner_id).await?,
        None => Vec::new(),
    };

    Ok(Json(projection::public_item(
        item,
        &projection::category_index(&categories),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ItemStatus, NewShare};
    use crate::routes::test_support::TestApp;
    use axum::http::Method;
    use chrono::Duration;
    use serde_json::{json, Value};

    async fn share_token(app: &TestApp, owner: Uuid, wishlist_id: Uuid) -> String {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/shares",
                Some(owner),
                Some(json!({ "wishlist_id": wishlist_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["share_token"].as_str().unwrap().to_string()
    }

    /// Insert a share that expired an hour ago, bypassing the creation check.
    async fn expired_token(app: &TestApp, owner: Uuid, wishlist_id: Uuid) -> String {
        app.store()
            .rotate_share(NewShare {
                wishlist_id,
                share_token: share::generate_token(),
                created_by: owner,
                expires_at: Some(Utc::now() - Duration::hours(1)),
            })
            .await
            .unwrap()
            .share_token
    }

    fn reserve_body(item_id: Uuid, action: &str) -> Option<Value> {
        Some(json!({ "itemId": item_id, "action": action }))
    }

    #[tokio::test]
    async fn test_reserve_race_between_two_viewers() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        let item = app.item(wishlist.id, "Espresso machine", 2).await;
        let uri = format!("/api/shares/{}", share_token(&app, owner, wishlist.id).await);

        let (status, body) = app
            .send(Method::PATCH, &uri, Some(a), reserve_body(item.id, "reserve"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "reserved");
        assert!(body.get("reserved_by").is_none());

        let (status, body) = app
            .send(Method::PATCH, &uri, Some(b), reserve_body(item.id, "reserve"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Could not reserve item");

        let (status, body) = app
            .send(Method::PATCH, &uri, Some(b), reserve_body(item.id, "unreserve"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Could not cancel reservation");

        let (_, detail) = app
            .send(
                Method::GET,
                &format!("/api/wishlists/{}", wishlist.id),
                Some(owner),
                None,
            )
            .await;
        assert_eq!(detail["items"][0]["reserved_by"], a.to_string());

        let (status, body) = app
            .send(Method::PATCH, &uri, Some(a), reserve_body(item.id, "unreserve"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "available");
    }

    #[tokio::test]
    async fn test_surprise_mode_hides_reserver_everywhere() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let a = Uuid::new_v4();
        let wishlist = app.wishlist(owner, true).await;
        let item = app.item(wishlist.id, "Bike", 2).await;
        let uri = format!("/api/shares/{}", share_token(&app, owner, wishlist.id).await);

        let (status, _) = app
            .send(Method::PATCH, &uri, Some(a), reserve_body(item.id, "reserve"))
            .await;
        assert_eq!(status, StatusCode::OK);

        let owner_views = [
            format!("/api/wishlists/{}", wishlist.id),
            format!("/api/wishlists/{}/items", wishlist.id),
        ];
        for view in owner_views {
            let (status, body) = app.send(Method::GET, &view, Some(owner), None).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.to_string().contains("reserved"));
            assert!(!body.to_string().contains(&a.to_string()));
        }

        let (status, public) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(public["items"][0]["status"], "reserved");
        assert!(!public.to_string().contains(&a.to_string()));
    }

    #[tokio::test]
    async fn test_public_view_is_anonymous_and_projected() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        let item = app.item(wishlist.id, "Plant", 0).await;
        crate::reservation::reserve(app.store(), item.id, wishlist.id, Uuid::new_v4())
            .await
            .unwrap();
        let uri = format!("/api/shares/{}", share_token(&app, owner, wishlist.id).await);

        let (status, body) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Birthday");
        assert_eq!(body["owner"]["username"], "user");
        assert_eq!(body["items"][0]["status"], "reserved");
        assert!(body["items"][0].get("reserved_by").is_none());
        assert!(body["items"][0].get("notes").is_none());
    }

    #[tokio::test]
    async fn test_reserve_requires_authentication() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        let item = app.item(wishlist.id, "Kite", 1).await;
        let uri = format!("/api/shares/{}", share_token(&app, owner, wishlist.id).await);

        let (status, _) = app
            .send(Method::PATCH, &uri, None, reserve_body(item.id, "reserve"))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(Method::PATCH, &uri, Some(owner), reserve_body(item.id, "purchase"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_revoked_link_is_gone_and_changes_nothing() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        let item = app.item(wishlist.id, "Camera", 2).await;

        let (_, share) = app
            .send(
                Method::POST,
                "/api/shares",
                Some(owner),
                Some(json!({ "wishlist_id": wishlist.id })),
            )
            .await;
        let uri = format!("/api/shares/{}", share["share_token"].as_str().unwrap());
        let revoke = format!("/api/shares?id={}", share["id"].as_str().unwrap());

        let (status, _) = app.send(Method::DELETE, &revoke, Some(owner), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.send(Method::DELETE, &revoke, Some(owner), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["error"], "Share link has been deactivated");

        let (status, _) = app
            .send(Method::PATCH, &uri, Some(Uuid::new_v4()), reserve_body(item.id, "reserve"))
            .await;
        assert_eq!(status, StatusCode::GONE);

        let items = app.store().list_items(wishlist.id).await.unwrap();
        assert_eq!(items[0].status, ItemStatus::Available);
        assert!(items[0].reserved_by.is_none());
    }

    #[tokio::test]
    async fn test_new_share_replaces_active_one() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;

        let first = share_token(&app, owner, wishlist.id).await;
        let second = share_token(&app, owner, wishlist.id).await;
        assert_ne!(first, second);

        let (status, _) = app
            .send(Method::GET, &format!("/api/shares/{}", first), None, None)
            .await;
        assert_eq!(status, StatusCode::GONE);
        let (status, _) = app
            .send(Method::GET, &format!("/api/shares/{}", second), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, list) = app.send(Method::GET, "/api/wishlists", Some(owner), None).await;
        assert_eq!(list[0]["active_share_token"], second);
    }

    #[tokio::test]
    async fn test_share_management_is_owner_scoped() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/shares",
                Some(stranger),
                Some(json!({ "wishlist_id": wishlist.id })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, share) = app
            .send(
                Method::POST,
                "/api/shares",
                Some(owner),
                Some(json!({ "wishlist_id": wishlist.id })),
            )
            .await;
        let revoke = format!("/api/shares?id={}", share["id"].as_str().unwrap());
        let (status, _) = app.send(Method::DELETE, &revoke, Some(stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_expiry_rules() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;

        let past = Utc::now() - Duration::hours(1);
        let (status, body) = app
            .send(
                Method::POST,
                "/api/shares",
                Some(owner),
                Some(json!({ "wishlist_id": wishlist.id, "expires_at": past })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["expires_at"].is_array());

        let future = Utc::now() + Duration::days(7);
        let (status, body) = app
            .send(
                Method::POST,
                "/api/shares",
                Some(owner),
                Some(json!({ "wishlist_id": wishlist.id, "expires_at": future })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["expires_at"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_tokens_not_found() {
        let app = TestApp::new();
        for token in [crate::share::generate_token(), "short".to_string()] {
            let (status, body) = app
                .send(Method::GET, &format!("/api/shares/{}", token), None, None)
                .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "Share link is not valid");
        }
    }

    #[tokio::test]
    async fn test_expired_link_is_gone_and_changes_nothing() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        let item = app.item(wishlist.id, "Lamp", 1).await;
        let uri = format!("/api/shares/{}", expired_token(&app, owner, wishlist.id).await);

        let (status, body) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["error"], "Share link has expired");

        let (status, body) = app
            .send(Method::PATCH, &uri, Some(Uuid::new_v4()), reserve_body(item.id, "reserve"))
            .await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["error"], "Share link has expired");

        let items = app.store().list_items(wishlist.id).await.unwrap();
        assert_eq!(items[0].status, ItemStatus::Available);
        assert!(items[0].reserved_by.is_none());
    }

    #[tokio::test]
    async fn test_expired_link_is_not_listed_as_active() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let wishlist = app.wishlist(owner, false).await;
        expired_token(&app, owner, wishlist.id).await;

        let (status, list) = app.send(Method::GET, "/api/wishlists", Some(owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(list[0]["active_share_token"].is_null());

        let live = share_token(&app, owner, wishlist.id).await;
        let (_, list) = app.send(Method::GET, "/api/wishlists", Some(owner), None).await;
        assert_eq!(list[0]["active_share_token"], live);
    }
}
