//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fulfilment status of a wishlist item. Mirrors the `item_status` enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "item_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Reserved,
    Purchased,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Reserved => "reserved",
            ItemStatus::Purchased => "purchased",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New profile for insertion
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Profile update; `None` leaves the column untouched, `Some(None)` clears a
/// nullable one
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub full_name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

/// Wishlist model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub surprise_mode: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wishlist row as listed on the owner's dashboard
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WishlistSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub item_count: i64,
    pub active_share_token: Option<String>,
}

/// New wishlist for insertion
#[derive(Debug, Clone)]
pub struct NewWishlist {
    pub name: String,
    pub description: Option<String>,
    pub surprise_mode: bool,
}

/// Wishlist update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct WishlistChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub surprise_mode: Option<bool>,
}

/// Category model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub color: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub icon: Option<String>,
    pub color: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

/// Wishlist item model.
///
/// `reserved_by` is set exactly while `status` is `Reserved`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: Uuid,
    pub wishlist_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub currency: String,
    pub external_link: Option<String>,
    pub priority: i16,
    pub status: ItemStatus,
    pub reserved_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub currency: String,
    pub external_link: Option<String>,
    pub priority: i16,
    pub notes: Option<String>,
}

/// Owner-side item update. Nullable columns use `Option<Option<_>>` so that
/// "absent" and "set to null" stay distinguishable.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub category_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub price: Option<Option<Decimal>>,
    pub currency: Option<String>,
    pub external_link: Option<Option<String>>,
    pub priority: Option<i16>,
    /// Never `Reserved`; reservations go through the share-link transition.
    pub status: Option<ItemStatus>,
    pub notes: Option<Option<String>>,
}

/// Shared wishlist (share link) model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SharedWishlist {
    pub id: Uuid,
    pub wishlist_id: Uuid,
    pub share_token: String,
    pub created_by: Uuid,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShare {
    pub wishlist_id: Uuid,
    pub share_token: String,
    pub created_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}
