//! Postgres-backed store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::db::models::{
    Category, CategoryChanges, ItemChanges, NewCategory, NewItem, NewProfile, NewShare,
    NewWishlist, Profile, ProfileChanges, SharedWishlist, Wishlist, WishlistChanges,
    WishlistItem, WishlistSummary,
};
use crate::error::StoreError;
use crate::reservation::{Guard, Transition};

const PROFILE_COLUMNS: &str = "id, username, full_name, avatar_url, created_at, updated_at";

const WISHLIST_COLUMNS: &str =
    "id, owner_id, name, description, surprise_mode, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, owner_id, name, icon, color, sort_order, created_at";

const ITEM_COLUMNS: &str = "id, wishlist_id, category_id, name, description, image_url, price, \
     currency, external_link, priority, status, reserved_by, notes, created_at, updated_at";

const SHARE_COLUMNS: &str =
    "id, wishlist_id, share_token, created_by, is_active, expires_at, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Split a `Option<Option<T>>` patch value into the `(touch, value)` pair the
/// UPDATE statements bind: `touch` says whether the column is written at all.
fn patch<T>(value: Option<Option<T>>) -> (bool, Option<T>) {
    match value {
        Some(v) => (true, v),
        None => (false, None),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<std::time::Duration> {
        Ok(crate::db::health_check(&self.pool).await?)
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        Ok(sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_profile(&self, id: Uuid, profile: NewProfile) -> StoreResult<Profile> {
        let sql = format!(
            "INSERT INTO profiles (id, username, full_name, avatar_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, now(), now()) \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(&profile.username)
            .bind(&profile.full_name)
            .bind(&profile.avatar_url)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> StoreResult<Option<Profile>> {
        let (touch_full_name, full_name) = patch(changes.full_name);
        let (touch_avatar_url, avatar_url) = patch(changes.avatar_url);
        let sql = format!(
            "UPDATE profiles SET \
                username = COALESCE($2, username), \
                full_name = CASE WHEN $3 THEN $4 ELSE full_name END, \
                avatar_url = CASE WHEN $5 THEN $6 ELSE avatar_url END, \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(&changes.username)
            .bind(touch_full_name)
            .bind(&full_name)
            .bind(touch_avatar_url)
            .bind(&avatar_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn list_wishlists(&self, owner_id: Uuid) -> StoreResult<Vec<WishlistSummary>> {
        Ok(sqlx::query_as::<_, WishlistSummary>(
            r#"
            SELECT w.id, w.owner_id, w.name, w.description, w.surprise_mode,
                   w.created_at, w.updated_at,
                   (SELECT COUNT(*) FROM wishlist_items i WHERE i.wishlist_id = w.id) AS item_count,
                   (SELECT s.share_token FROM shared_wishlists s
                     WHERE s.wishlist_id = w.id AND s.is_active
                       AND (s.expires_at IS NULL OR s.expires_at >= now())
                     LIMIT 1) AS active_share_token
            FROM wishlists w
            WHERE w.owner_id = $1
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_owned_wishlist(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> StoreResult<Option<Wishlist>> {
        let sql = format!("SELECT {WISHLIST_COLUMNS} FROM wishlists WHERE id = $1 AND owner_id = $2");
        Ok(sqlx::query_as::<_, Wishlist>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_wishlist(&self, id: Uuid) -> StoreResult<Option<Wishlist>> {
        let sql = format!("SELECT {WISHLIST_COLUMNS} FROM wishlists WHERE id = $1");
        Ok(sqlx::query_as::<_, Wishlist>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_wishlist(
        &self,
        owner_id: Uuid,
        wishlist: NewWishlist,
    ) -> StoreResult<Wishlist> {
        let sql = format!(
            "INSERT INTO wishlists (owner_id, name, description, surprise_mode, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, now(), now()) \
             RETURNING {WISHLIST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Wishlist>(&sql)
            .bind(owner_id)
            .bind(&wishlist.name)
            .bind(&wishlist.description)
            .bind(wishlist.surprise_mode)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_wishlist(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: WishlistChanges,
    ) -> StoreResult<Option<Wishlist>> {
        let (touch_description, description) = patch(changes.description);
        let sql = format!(
            "UPDATE wishlists SET \
                name = COALESCE($3, name), \
                description = CASE WHEN $4 THEN $5 ELSE description END, \
                surprise_mode = COALESCE($6, surprise_mode), \
                updated_at = now() \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {WISHLIST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Wishlist>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&changes.name)
            .bind(touch_description)
            .bind(&description)
            .bind(changes.surprise_mode)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_wishlist(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM wishlists WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self, owner_id: Uuid) -> StoreResult<Vec<Category>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE owner_id = $1 ORDER BY sort_order, name"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_owned_category(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> StoreResult<Option<Category>> {
        let sql =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND owner_id = $2");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_category(
        &self,
        owner_id: Uuid,
        category: NewCategory,
    ) -> StoreResult<Category> {
        let sql = format!(
            "INSERT INTO categories (owner_id, name, icon, color, sort_order, created_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(owner_id)
            .bind(&category.name)
            .bind(&category.icon)
            .bind(&category.color)
            .bind(category.sort_order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_category(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let (touch_icon, icon) = patch(changes.icon);
        let sql = format!(
            "UPDATE categories SET \
                name = COALESCE($3, name), \
                icon = CASE WHEN $4 THEN $5 ELSE icon END, \
                color = COALESCE($6, color), \
                sort_order = COALESCE($7, sort_order) \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&changes.name)
            .bind(touch_icon)
            .bind(&icon)
            .bind(&changes.color)
            .bind(changes.sort_order)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_category(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&self, wishlist_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM wishlist_items \
             WHERE wishlist_id = $1 \
             ORDER BY priority DESC, created_at ASC"
        );
        Ok(sqlx::query_as::<_, WishlistItem>(&sql)
            .bind(wishlist_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_item(&self, wishlist_id: Uuid, item: NewItem) -> StoreResult<WishlistItem> {
        let sql = format!(
            "INSERT INTO wishlist_items \
                (wishlist_id, category_id, name, description, image_url, price, currency, \
                 external_link, priority, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now()) \
             RETURNING {ITEM_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, WishlistItem>(&sql)
            .bind(wishlist_id)
            .bind(item.category_id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.image_url)
            .bind(item.price)
            .bind(&item.currency)
            .bind(&item.external_link)
            .bind(item.priority)
            .bind(&item.notes)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_item(
        &self,
        id: Uuid,
        wishlist_id: Uuid,
        changes: ItemChanges,
    ) -> StoreResult<Option<WishlistItem>> {
        let (touch_category, category_id) = patch(changes.category_id);
        let (touch_description, description) = patch(changes.description);
        let (touch_image, image_url) = patch(changes.image_url);
        let (touch_price, price) = patch(changes.price);
        let (touch_link, external_link) = patch(changes.external_link);
        let (touch_notes, notes) = patch(changes.notes);

        let sql = format!(
            "UPDATE wishlist_items SET \
                category_id = CASE WHEN $3 THEN $4 ELSE category_id END, \
                name = COALESCE($5, name), \
                description = CASE WHEN $6 THEN $7 ELSE description END, \
                image_url = CASE WHEN $8 THEN $9 ELSE image_url END, \
                price = CASE WHEN $10 THEN $11 ELSE price END, \
                currency = COALESCE($12, currency), \
                external_link = CASE WHEN $13 THEN $14 ELSE external_link END, \
                priority = COALESCE($15, priority), \
                notes = CASE WHEN $16 THEN $17 ELSE notes END, \
                reserved_by = CASE \
                    WHEN $18::item_status IS NULL OR $18::item_status = 'reserved' THEN reserved_by \
                    ELSE NULL END, \
                status = COALESCE($18::item_status, status), \
                updated_at = now() \
             WHERE id = $1 AND wishlist_id = $2 \
             RETURNING {ITEM_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, WishlistItem>(&sql)
            .bind(id)
            .bind(wishlist_id)
            .bind(touch_category)
            .bind(category_id)
            .bind(&changes.name)
            .bind(touch_description)
            .bind(&description)
            .bind(touch_image)
            .bind(&image_url)
            .bind(touch_price)
            .bind(price)
            .bind(&changes.currency)
            .bind(touch_link)
            .bind(&external_link)
            .bind(changes.priority)
            .bind(touch_notes)
            .bind(&notes)
            .bind(changes.status)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_item(&self, id: Uuid, wishlist_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE id = $1 AND wishlist_id = $2")
            .bind(id)
            .bind(wishlist_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        wishlist_id: Uuid,
        transition: &Transition,
    ) -> StoreResult<Option<WishlistItem>> {
        // The guard lives in the WHERE clause so the check and the write are
        // one statement; Postgres row locking serialises competing writers
        // and re-evaluates the predicate for the losers.
        let query = match transition.guard {
            Guard::Available => {
                let sql = format!(
                    "UPDATE wishlist_items SET status = $3, reserved_by = $4, updated_at = now() \
                     WHERE id = $1 AND wishlist_id = $2 AND status = 'available' \
                     RETURNING {ITEM_COLUMNS}"
                );
                sqlx::query_as::<_, WishlistItem>(&sql)
                    .bind(id)
                    .bind(wishlist_id)
                    .bind(transition.status)
                    .bind(transition.reserved_by)
                    .fetch_optional(&self.pool)
                    .await
            }
            Guard::ReservedBy(actor) => {
                let sql = format!(
                    "UPDATE wishlist_items SET status = $3, reserved_by = $4, updated_at = now() \
                     WHERE id = $1 AND wishlist_id = $2 AND reserved_by = $5 \
                     RETURNING {ITEM_COLUMNS}"
                );
                sqlx::query_as::<_, WishlistItem>(&sql)
                    .bind(id)
                    .bind(wishlist_id)
                    .bind(transition.status)
                    .bind(transition.reserved_by)
                    .bind(actor)
                    .fetch_optional(&self.pool)
                    .await
            }
        };
        Ok(query?)
    }

    async fn rotate_share(&self, share: NewShare) -> StoreResult<SharedWishlist> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE shared_wishlists SET is_active = false \
             WHERE wishlist_id = $1 AND created_by = $2 AND is_active",
        )
        .bind(share.wishlist_id)
        .bind(share.created_by)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO shared_wishlists (wishlist_id, share_token, created_by, is_active, expires_at, created_at) \
             VALUES ($1, $2, $3, true, $4, now()) \
             RETURNING {SHARE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SharedWishlist>(&sql)
            .bind(share.wishlist_id)
            .bind(&share.share_token)
            .bind(share.created_by)
            .bind(share.expires_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;

        tx.commit().await?;
        Ok(row)
    }

    async fn deactivate_share(&self, id: Uuid, created_by: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE shared_wishlists SET is_active = false WHERE id = $1 AND created_by = $2",
        )
        .bind(id)
        .bind(created_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_share_by_token(&self, token: &str) -> StoreResult<Option<SharedWishlist>> {
        let sql = format!("SELECT {SHARE_COLUMNS} FROM shared_wishlists WHERE share_token = $1");
        Ok(sqlx::query_as::<_, SharedWishlist>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_shares(&self, wishlist_id: Uuid) -> StoreResult<Vec<SharedWishlist>> {
        let sql = format!(
            "SELECT {SHARE_COLUMNS} FROM shared_wishlists \
             WHERE wishlist_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, SharedWishlist>(&sql)
            .bind(wishlist_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        assert_eq!(patch::<i32>(None), (false, None));
        assert_eq!(patch::<i32>(Some(None)), (true, None));
        assert_eq!(patch(Some(Some(3))), (true, Some(3)));
    }
}
