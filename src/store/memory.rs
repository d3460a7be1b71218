//! In-memory store for tests and database-less development.
//!
//! All tables sit behind one `RwLock`; every write method holds the write
//! guard for its whole check-and-mutate, which gives the same atomicity the
//! Postgres store gets from single conditional statements.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::db::models::{
    Category, CategoryChanges, ItemChanges, ItemStatus, NewCategory, NewItem, NewProfile,
    NewShare, NewWishlist, Profile, ProfileChanges, SharedWishlist, Wishlist, WishlistChanges,
    WishlistItem, WishlistSummary,
};
use crate::error::StoreError;
use crate::reservation::Transition;
use crate::share::{liveness, Liveness};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    wishlists: HashMap<Uuid, Wishlist>,
    categories: HashMap<Uuid, Category>,
    items: HashMap<Uuid, WishlistItem>,
    shares: HashMap<Uuid, SharedWishlist>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<std::time::Duration> {
        let start = std::time::Instant::now();
        let _tables = self.tables.read().await;
        Ok(start.elapsed())
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn insert_profile(&self, id: Uuid, profile: NewProfile) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&id) {
            return Err(unique_violation("profiles_pkey"));
        }
        if tables
            .profiles
            .values()
            .any(|p| p.username == profile.username)
        {
            return Err(unique_violation("profiles_username_key"));
        }

        let now = Utc::now();
        let row = Profile {
            id,
            username: profile.username,
            full_name: profile.full_name,
            avatar_url: profile.avatar_url,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(id, row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> StoreResult<Option<Profile>> {
        let mut tables = self.tables.write().await;
        if let Some(username) = &changes.username {
            if tables
                .profiles
                .values()
                .any(|p| p.id != id && &p.username == username)
            {
                return Err(unique_violation("profiles_username_key"));
            }
        }

        let Some(row) = tables.profiles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            row.username = username;
        }
        if let Some(full_name) = changes.full_name {
            row.full_name = full_name;
        }
        if let Some(avatar_url) = changes.avatar_url {
            row.avatar_url = avatar_url;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn list_wishlists(&self, owner_id: Uuid) -> StoreResult<Vec<WishlistSummary>> {
        let tables = self.tables.read().await;
        let now = Utc::now();
        let mut rows: Vec<WishlistSummary> = tables
            .wishlists
            .values()
            .filter(|w| w.owner_id == owner_id)
            .map(|w| WishlistSummary {
                wishlist: w.clone(),
                item_count: tables
                    .items
                    .values()
                    .filter(|i| i.wishlist_id == w.id)
                    .count() as i64,
                active_share_token: tables
                    .shares
                    .values()
                    .find(|s| {
                        s.wishlist_id == w.id && liveness(s, now) == Liveness::Live
                    })
                    .map(|s| s.share_token.clone()),
            })
            .collect();
        rows.sort_by(|a, b| b.wishlist.created_at.cmp(&a.wishlist.created_at));
        Ok(rows)
    }

    async fn find_owned_wishlist(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> StoreResult<Option<Wishlist>> {
        Ok(self
            .tables
            .read()
            .await
            .wishlists
            .get(&id)
            .filter(|w| w.owner_id == owner_id)
            .cloned())
    }

    async fn get_wishlist(&self, id: Uuid) -> StoreResult<Option<Wishlist>> {
        Ok(self.tables.read().await.wishlists.get(&id).cloned())
    }

    async fn insert_wishlist(
        &self,
        owner_id: Uuid,
        wishlist: NewWishlist,
    ) -> StoreResult<Wishlist> {
        let now = Utc::now();
        let row = Wishlist {
            id: Uuid::new_v4(),
            owner_id,
            name: wishlist.name,
            description: wishlist.description,
            surprise_mode: wishlist.surprise_mode,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .wishlists
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_wishlist(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: WishlistChanges,
    ) -> StoreResult<Option<Wishlist>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .wishlists
            .get_mut(&id)
            .filter(|w| w.owner_id == owner_id)
        else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(surprise_mode) = changes.surprise_mode {
            row.surprise_mode = surprise_mode;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_wishlist(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .wishlists
            .get(&id)
            .is_some_and(|w| w.owner_id == owner_id);
        if !owned {
            return Ok(false);
        }
        tables.wishlists.remove(&id);
        tables.items.retain(|_, i| i.wishlist_id != id);
        tables.shares.retain(|_, s| s.wishlist_id != id);
        Ok(true)
    }

    async fn list_categories(&self, owner_id: Uuid) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    async fn find_owned_category(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> StoreResult<Option<Category>> {
        Ok(self
            .tables
            .read()
            .await
            .categories
            .get(&id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn insert_category(
        &self,
        owner_id: Uuid,
        category: NewCategory,
    ) -> StoreResult<Category> {
        let row = Category {
            id: Uuid::new_v4(),
            owner_id,
            name: category.name,
            icon: category.icon,
            color: category.color,
            sort_order: category.sort_order,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .categories
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .categories
            .get_mut(&id)
            .filter(|c| c.owner_id == owner_id)
        else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(icon) = changes.icon {
            row.icon = icon;
        }
        if let Some(color) = changes.color {
            row.color = color;
        }
        if let Some(sort_order) = changes.sort_order {
            row.sort_order = sort_order;
        }
        Ok(Some(row.clone()))
    }

    async fn delete_category(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .categories
            .get(&id)
            .is_some_and(|c| c.owner_id == owner_id);
        if !owned {
            return Ok(false);
        }
        tables.categories.remove(&id);
        for item in tables.items.values_mut() {
            if item.category_id == Some(id) {
                item.category_id = None;
            }
        }
        Ok(true)
    }

    async fn list_items(&self, wishlist_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<WishlistItem> = tables
            .items
            .values()
            .filter(|i| i.wishlist_id == wishlist_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(rows)
    }

    async fn insert_item(&self, wishlist_id: Uuid, item: NewItem) -> StoreResult<WishlistItem> {
        let now = Utc::now();
        let row = WishlistItem {
            id: Uuid::new_v4(),
            wishlist_id,
            category_id: item.category_id,
            name: item.name,
            description: item.description,
            image_url: item.image_url,
            price: item.price,
            currency: item.currency,
            external_link: item.external_link,
            priority: item.priority,
            status: ItemStatus::Available,
            reserved_by: None,
            notes: item.notes,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.items.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_item(
        &self,
        id: Uuid,
        wishlist_id: Uuid,
        changes: ItemChanges,
    ) -> StoreResult<Option<WishlistItem>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .items
            .get_mut(&id)
            .filter(|i| i.wishlist_id == wishlist_id)
        else {
            return Ok(None);
        };
        if let Some(category_id) = changes.category_id {
            row.category_id = category_id;
        }
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(image_url) = changes.image_url {
            row.image_url = image_url;
        }
        if let Some(price) = changes.price {
            row.price = price;
        }
        if let Some(currency) = changes.currency {
            row.currency = currency;
        }
        if let Some(external_link) = changes.external_link {
            row.external_link = external_link;
        }
        if let Some(priority) = changes.priority {
            row.priority = priority;
        }
        if let Some(notes) = changes.notes {
            row.notes = notes;
        }
        if let Some(status) = changes.status {
            row.status = status;
            if status != ItemStatus::Reserved {
                row.reserved_by = None;
            }
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_item(&self, id: Uuid, wishlist_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let matches = tables
            .items
            .get(&id)
            .is_some_and(|i| i.wishlist_id == wishlist_id);
        if matches {
            tables.items.remove(&id);
        }
        Ok(matches)
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        wishlist_id: Uuid,
        transition: &Transition,
    ) -> StoreResult<Option<WishlistItem>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .items
            .get_mut(&id)
            .filter(|i| i.wishlist_id == wishlist_id && transition.guard.admits(i))
        else {
            return Ok(None);
        };
        row.status = transition.status;
        row.reserved_by = transition.reserved_by;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn rotate_share(&self, share: NewShare) -> StoreResult<SharedWishlist> {
        let mut tables = self.tables.write().await;
        if tables
            .shares
            .values()
            .any(|s| s.share_token == share.share_token)
        {
            return Err(unique_violation("shared_wishlists_share_token_key"));
        }

        for existing in tables.shares.values_mut() {
            if existing.wishlist_id == share.wishlist_id
                && existing.created_by == share.created_by
                && existing.is_active
            {
                existing.is_active = false;
            }
        }

        let row = SharedWishlist {
            id: Uuid::new_v4(),
            wishlist_id: share.wishlist_id,
            share_token: share.share_token,
            created_by: share.created_by,
            is_active: true,
            expires_at: share.expires_at,
            created_at: Utc::now(),
        };
        tables.shares.insert(row.id, row.clone());
        Ok(row)
    }

    async fn deactivate_share(&self, id: Uuid, created_by: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .shares
            .get_mut(&id)
            .filter(|s| s.created_by == created_by)
        {
            Some(row) => {
                row.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_share_by_token(&self, token: &str) -> StoreResult<Option<SharedWishlist>> {
        Ok(self
            .tables
            .read()
            .await
            .shares
            .values()
            .find(|s| s.share_token == token)
            .cloned())
    }

    async fn list_shares(&self, wishlist_id: Uuid) -> StoreResult<Vec<SharedWishlist>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<SharedWishlist> = tables
            .shares
            .values()
            .filter(|s| s.wishlist_id == wishlist_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(name: &str, priority: i16) -> NewItem {
        NewItem {
            category_id: None,
            name: name.to_string(),
            description: None,
            image_url: None,
            price: None,
            currency: "EUR".to_string(),
            external_link: None,
            priority,
            notes: None,
        }
    }

    async fn wishlist(store: &MemoryStore, owner: Uuid) -> Wishlist {
        store
            .insert_wishlist(
                owner,
                NewWishlist {
                    name: "List".to_string(),
                    description: None,
                    surprise_mode: false,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_owned_lookup_filters_by_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let w = wishlist(&store, owner).await;

        assert!(store.find_owned_wishlist(w.id, owner).await.unwrap().is_some());
        assert!(store
            .find_owned_wishlist(w.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_wishlist(w.id, Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_items_ordered_by_priority_then_age() {
        let store = MemoryStore::new();
        let w = wishlist(&store, Uuid::new_v4()).await;
        store.insert_item(w.id, new_item("low", 0)).await.unwrap();
        store.insert_item(w.id, new_item("high", 2)).await.unwrap();
        store.insert_item(w.id, new_item("medium", 1)).await.unwrap();

        let names: Vec<String> = store
            .list_items(w.id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["high", "medium", "low"]);
    }

    #[tokio::test]
    async fn test_owner_status_edit_clears_reserver() {
        let store = MemoryStore::new();
        let w = wishlist(&store, Uuid::new_v4()).await;
        let item = store.insert_item(w.id, new_item("gift", 1)).await.unwrap();
        let reserve = crate::reservation::ReservationAction::Reserve.transition(Uuid::new_v4());
        store
            .apply_transition(item.id, w.id, &reserve)
            .await
            .unwrap()
            .unwrap();

        let updated = store
            .update_item(
                item.id,
                w.id,
                ItemChanges {
                    status: Some(ItemStatus::Purchased),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ItemStatus::Purchased);
        assert_eq!(updated.reserved_by, None);
    }

    #[tokio::test]
    async fn test_delete_wishlist_cascades() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let w = wishlist(&store, owner).await;
        store.insert_item(w.id, new_item("gift", 1)).await.unwrap();
        store
            .rotate_share(NewShare {
                wishlist_id: w.id,
                share_token: "abc".to_string(),
                created_by: owner,
                expires_at: None,
            })
            .await
            .unwrap();

        assert!(store.delete_wishlist(w.id, owner).await.unwrap());
        assert!(store.list_items(w.id).await.unwrap().is_empty());
        assert!(store.find_share_by_token("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_category_detaches_items() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let w = wishlist(&store, owner).await;
        let category = store
            .insert_category(
                owner,
                NewCategory {
                    name: "Books".to_string(),
                    icon: None,
                    color: "#3b82f6".to_string(),
                    sort_order: 0,
                },
            )
            .await
            .unwrap();
        let mut item = new_item("novel", 1);
        item.category_id = Some(category.id);
        let item = store.insert_item(w.id, item).await.unwrap();

        assert!(store.delete_category(category.id, owner).await.unwrap());
        let items = store.list_items(w.id).await.unwrap();
        assert_eq!(items[0].id, item.id);
        assert_eq!(items[0].category_id, None);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_structured_violation() {
        let store = MemoryStore::new();
        let profile = |name: &str| NewProfile {
            username: name.to_string(),
            full_name: None,
            avatar_url: None,
        };
        store.insert_profile(Uuid::new_v4(), profile("ana")).await.unwrap();
        let err = store
            .insert_profile(Uuid::new_v4(), profile("ana"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation { ref constraint } if constraint == "profiles_username_key"
        ));
    }
}
