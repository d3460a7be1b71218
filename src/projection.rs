//! Read-time views of a wishlist.
//!
//! [`PublicItem`] has no reservation-identity field at all, so nothing a
//! share-link viewer receives can name a reserver. [`OwnerItem`] carries
//! `reserved_by` only while the wishlist is not in surprise mode.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Category, ItemStatus, Profile, SharedWishlist, Wishlist, WishlistItem};

/// Username reported when the owner has no profile row.
pub const FALLBACK_USERNAME: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTag {
    pub name: String,
    pub icon: Option<String>,
    pub color: String,
}

impl From<&Category> for CategoryTag {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            icon: category.icon.clone(),
            color: category.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOwner {
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub currency: String,
    pub external_link: Option<String>,
    pub priority: i16,
    pub status: ItemStatus,
    pub category: Option<CategoryTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicWishlist {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub surprise_mode: bool,
    pub owner: PublicOwner,
    pub items: Vec<PublicItem>,
}

/// Public shape of a single item. `categories` is the owner's category set;
/// unknown ids project to no category.
pub fn public_item(item: WishlistItem, categories: &HashMap<Uuid, CategoryTag>) -> PublicItem {
    let category = item
        .category_id
        .and_then(|id| categories.get(&id))
        .cloned();

    PublicItem {
        id: item.id,
        name: item.name,
        description: item.description,
        image_url: item.image_url,
        price: item.price,
        currency: item.currency,
        external_link: item.external_link,
        priority: item.priority,
        status: item.status,
        category,
    }
}

pub fn category_index(categories: &[Category]) -> HashMap<Uuid, CategoryTag> {
    categories
        .iter()
        .map(|c| (c.id, CategoryTag::from(c)))
        .collect()
}

/// Project a live wishlist for anonymous and third-party viewers.
pub fn project_public(
    wishlist: Wishlist,
    owner: Option<Profile>,
    items: Vec<WishlistItem>,
    categories: &[Category],
) -> PublicWishlist {
    let index = category_index(categories);

    let owner = match owner {
        Some(profile) => PublicOwner {
            username: profile.username,
            full_name: profile.full_name,
            avatar_url: profile.avatar_url,
        },
        None => PublicOwner {
            username: FALLBACK_USERNAME.to_string(),
            full_name: None,
            avatar_url: None,
        },
    };

    PublicWishlist {
        id: wishlist.id,
        name: wishlist.name,
        description: wishlist.description,
        surprise_mode: wishlist.surprise_mode,
        owner,
        items: items
            .into_iter()
            .map(|item| public_item(item, &index))
            .collect(),
    }
}

/// Item as shown to the wishlist's owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerItem {
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<Uuid>,
    pub notes: Option<String>,
    pub category: Option<CategoryTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner view of one item; `surprise_mode` is the parent wishlist's flag.
pub fn owner_item(
    item: WishlistItem,
    surprise_mode: bool,
    categories: &HashMap<Uuid, CategoryTag>,
) -> OwnerItem {
    let category = item
        .category_id
        .and_then(|id| categories.get(&id))
        .cloned();

    OwnerItem {
        id: item.id,
        wishlist_id: item.wishlist_id,
        category_id: item.category_id,
        name: item.name,
        description: item.description,
        image_url: item.image_url,
        price: item.price,
        currency: item.currency,
        external_link: item.external_link,
        priority: item.priority,
        status: item.status,
        reserved_by: if surprise_mode { None } else { item.reserved_by },
        notes: item.notes,
        category,
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

pub fn owner_items(
    items: Vec<WishlistItem>,
    surprise_mode: bool,
    categories: &[Category],
) -> Vec<OwnerItem> {
    let index = category_index(categories);
    items
        .into_iter()
        .map(|item| owner_item(item, surprise_mode, &index))
        .collect()
}

/// Owner detail view: the wishlist, its items and its share links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerWishlist {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub items: Vec<OwnerItem>,
    pub shares: Vec<SharedWishlist>,
}

pub fn project_owner(
    wishlist: Wishlist,
    items: Vec<WishlistItem>,
    shares: Vec<SharedWishlist>,
    categories: &[Category],
) -> OwnerWishlist {
    let items = owner_items(items, wishlist.surprise_mode, categories);
    OwnerWishlist {
        wishlist,
        items,
        shares,
    }
}
