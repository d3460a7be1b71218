//! Data store gateway.
//!
//! Every owner-scoped method takes the acting owner's id and applies it as an
//! equality predicate inside the same statement as the read or write. A
//! `None`/`false` result means the predicate matched zero rows; callers turn
//! that into `AppError::NotFound` without asking why.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{
    Category, CategoryChanges, ItemChanges, NewCategory, NewItem, NewProfile, NewShare,
    NewWishlist, Profile, ProfileChanges, SharedWishlist, Wishlist, WishlistChanges,
    WishlistItem, WishlistSummary,
};
use crate::error::StoreError;
use crate::reservation::Transition;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trip latency to the backing store.
    async fn health_check(&self) -> StoreResult<std::time::Duration>;

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    async fn insert_profile(&self, id: Uuid, profile: NewProfile) -> StoreResult<Profile>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> StoreResult<Option<Profile>>;

    // ------------------------------------------------------------------
    // Wishlists
    // ------------------------------------------------------------------

    /// Owner's wishlists, newest first.
    async fn list_wishlists(&self, owner_id: Uuid) -> StoreResult<Vec<WishlistSummary>>;

    /// `WHERE id = :id AND owner_id = :owner`
    async fn find_owned_wishlist(&self, id: Uuid, owner_id: Uuid)
        -> StoreResult<Option<Wishlist>>;

    /// Unscoped lookup. Only reachable after a share token has been resolved.
    async fn get_wishlist(&self, id: Uuid) -> StoreResult<Option<Wishlist>>;

    async fn insert_wishlist(&self, owner_id: Uuid, wishlist: NewWishlist)
        -> StoreResult<Wishlist>;

    async fn update_wishlist(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: WishlistChanges,
    ) -> StoreResult<Option<Wishlist>>;

    /// Deletes the wishlist together with its items and shares.
    async fn delete_wishlist(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool>;

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    async fn list_categories(&self, owner_id: Uuid) -> StoreResult<Vec<Category>>;

    async fn find_owned_category(&self, id: Uuid, owner_id: Uuid)
        -> StoreResult<Option<Category>>;

    async fn insert_category(&self, owner_id: Uuid, category: NewCategory)
        -> StoreResult<Category>;

    async fn update_category(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>>;

    /// Referencing items keep existing with `category_id` cleared.
    async fn delete_category(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool>;

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Items of one wishlist, priority descending then oldest first.
    async fn list_items(&self, wishlist_id: Uuid) -> StoreResult<Vec<WishlistItem>>;

    async fn insert_item(&self, wishlist_id: Uuid, item: NewItem) -> StoreResult<WishlistItem>;

    /// Owner edit. A status other than `Reserved` clears `reserved_by`.
    async fn update_item(
        &self,
        id: Uuid,
        wishlist_id: Uuid,
        changes: ItemChanges,
    ) -> StoreResult<Option<WishlistItem>>;

    async fn delete_item(&self, id: Uuid, wishlist_id: Uuid) -> StoreResult<bool>;

    /// Compare-and-set on one item row: apply `transition` only if the row
    /// `id = :id AND wishlist_id = :wishlist` currently satisfies its guard.
    /// The check and the write are one atomic step.
    async fn apply_transition(
        &self,
        id: Uuid,
        wishlist_id: Uuid,
        transition: &Transition,
    ) -> StoreResult<Option<WishlistItem>>;

    // ------------------------------------------------------------------
    // Shares
    // ------------------------------------------------------------------

    /// Deactivate the creator's active shares of the wishlist and insert the
    /// new active share, atomically.
    async fn rotate_share(&self, share: NewShare) -> StoreResult<SharedWishlist>;

    /// Set `is_active = false` where `id = :id AND created_by = :actor`.
    /// Returns whether such a share exists, whether or not it was active.
    async fn deactivate_share(&self, id: Uuid, created_by: Uuid) -> StoreResult<bool>;

    async fn find_share_by_token(&self, token: &str) -> StoreResult<Option<SharedWishlist>>;

    /// Shares of one wishlist, newest first.
    async fn list_shares(&self, wishlist_id: Uuid) -> StoreResult<Vec<SharedWishlist>>;
}
