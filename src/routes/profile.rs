/**
 * Profile Routes
 * The caller's public profile (username, display name, avatar)
 */
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::db::models::{NewProfile, Profile, ProfileChanges};
use crate::error::{AppError, StoreError};
use crate::validation::{double_option, Validator};
use crate::AppState;

/// Request body for POST /api/profile
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Request body for PATCH /api/profile
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

fn validate_fields(
    username: Option<&str>,
    full_name: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<(), AppError> {
    let mut v = Validator::new();
    if let Some(username) = username {
        v.username("username", username);
    }
    if let Some(full_name) = full_name {
        v.length("full_name", full_name, 2, 255);
    }
    if let Some(avatar_url) = avatar_url {
        v.url("avatar_url", avatar_url);
    }
    v.finish()
}

/// Map unique-constraint hits onto 409s the client can show.
fn profile_conflict(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation { constraint } if constraint.contains("username") => {
            AppError::Conflict("Username is already taken".to_string())
        }
        StoreError::UniqueViolation { .. } => {
            AppError::Conflict("Profile already exists".to_string())
        }
        other => AppError::Store(other),
    }
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Profile>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let profile = state
        .store
        .get_profile(actor)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(profile))
}

/// POST /api/profile
pub async fn create_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Json(req) = payload?;
    validate_fields(
        Some(&req.username),
        req.full_name.as_deref(),
        req.avatar_url.as_deref(),
    )?;

    let profile = state
        .store
        .insert_profile(
            actor,
            NewProfile {
                username: req.username,
                full_name: req.full_name,
                avatar_url: req.avatar_url,
            },
        )
        .await
        .map_err(profile_conflict)?;

    tracing::info!(username = %profile.username, "profile created");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// PATCH /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<Profile>, AppError> {
    let actor = state.identity.actor_from_headers(&headers)?;
    let Json(req) = payload?;
    validate_fields(
        req.username.as_deref(),
        req.full_name.as_ref().and_then(|v| v.as_deref()),
        req.avatar_url.as_ref().and_then(|v| v.as_deref()),
    )?;

    let profile = state
        .store
        .update_profile(
            actor,
            ProfileChanges {
                username: req.username,
                full_name: req.full_name,
                avatar_url: req.avatar_url,
            },
        )
        .await
        .map_err(profile_conflict)?
        .ok_or(AppError::NotFound)?;

    Ok(Json(profile))
}
