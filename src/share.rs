//! Share links: issuing, revoking and resolving capability tokens.
//!
//! A token is the only credential a viewer presents. Liveness (active and
//! not expired) is checked on every use; nothing sweeps stale shares.

use chrono::{DateTime, Utc};
use rand::RngCore;
use uuid::Uuid;

use crate::db::models::{NewShare, SharedWishlist};
use crate::error::{AppError, StoreError};
use crate::store::Store;

/// Random bytes per token (128 bits).
pub const TOKEN_BYTES: usize = 16;

/// Token length once hex-encoded.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// Fresh share token: 128 bits from the thread-local CSPRNG, lowercase hex.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Cheap shape check so obviously bogus tokens never reach the store.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Create a new active share for `wishlist_id`, replacing the caller's
/// previous active share of that wishlist.
pub async fn create_share(
    store: &dyn Store,
    wishlist_id: Uuid,
    actor_id: Uuid,
    expires_at: Option<DateTime<Utc>>,
) -> Result<SharedWishlist, AppError> {
    store
        .find_owned_wishlist(wishlist_id, actor_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let share = store
        .rotate_share(NewShare {
            wishlist_id,
            share_token: generate_token(),
            created_by: actor_id,
            expires_at,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation { .. } => {
                AppError::Conflict("Share link was changed concurrently, try again".to_string())
            }
            other => AppError::Store(other),
        })?;

    tracing::info!(share_id = %share.id, wishlist_id = %wishlist_id, "share link created");
    Ok(share)
}

/// Deactivate a share created by `actor_id`. Revoking an inactive share is
/// a no-op that still succeeds.
pub async fn revoke_share(store: &dyn Store, share_id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
    if !store.deactivate_share(share_id, actor_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(share_id = %share_id, "share link revoked");
    Ok(())
}

/// Why a share does or does not grant access right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Live,
    Inactive,
    Expired,
}

pub fn liveness(share: &SharedWishlist, now: DateTime<Utc>) -> Liveness {
    if !share.is_active {
        Liveness::Inactive
    } else if share.expires_at.is_some_and(|at| at < now) {
        Liveness::Expired
    } else {
        Liveness::Live
    }
}

/// Look up `token` and require it to be live at `now`.
pub async fn resolve(
    store: &dyn Store,
    token: &str,
    now: DateTime<Utc>,
) -> Result<SharedWishlist, AppError> {
    if !is_well_formed_token(token) {
        return Err(AppError::LinkInvalid);
    }

    let share = store
        .find_share_by_token(token)
        .await?
        .ok_or(AppError::LinkInvalid)?;

    match liveness(&share, now) {
        Liveness::Live => Ok(share),
        Liveness::Inactive => Err(AppError::LinkInactive),
        Liveness::Expired => Err(AppError::LinkExpired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewWishlist;
    use crate::store::MemoryStore;
    use chrono::Duration;

    async fn owned_wishlist(store: &MemoryStore) -> (Uuid, Uuid) {
        let owner = Uuid::new_v4();
        let wishlist = store
            .insert_wishlist(
                owner,
                NewWishlist {
                    name: "Wedding".to_string(),
                    description: None,
                    surprise_mode: true,
                },
            )
            .await
            .unwrap();
        (owner, wishlist.id)
    }

    #[test]
    fn test_generate_token_is_128_bit_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(is_well_formed_token(&token));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(!is_well_formed_token(""));
        assert!(!is_well_formed_token("../../etc/passwd"));
        assert!(!is_well_formed_token(&"z".repeat(32)));
    }

    #[tokio::test]
    async fn test_create_share_requires_ownership() {
        let store = MemoryStore::new();
        let (_owner, wishlist_id) = owned_wishlist(&store).await;
        let result = create_share(&store, wishlist_id, Uuid::new_v4(), None).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_only_one_active_share_per_wishlist() {
        let store = MemoryStore::new();
        let (owner, wishlist_id) = owned_wishlist(&store).await;

        let mut tokens = Vec::new();
        for _ in 0..4 {
            tokens.push(create_share(&store, wishlist_id, owner, None).await.unwrap().share_token);
        }

        let shares = store.list_shares(wishlist_id).await.unwrap();
        assert_eq!(shares.len(), 4);
        let active: Vec<_> = shares.iter().filter(|s| s.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(&active[0].share_token, tokens.last().unwrap());

        let now = Utc::now();
        assert!(matches!(
            resolve(&store, &tokens[0], now).await,
            Err(AppError::LinkInactive)
        ));
        assert!(resolve(&store, &tokens[3], now).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = MemoryStore::new();
        let (owner, wishlist_id) = owned_wishlist(&store).await;
        let share = create_share(&store, wishlist_id, owner, None).await.unwrap();

        revoke_share(&store, share.id, owner).await.unwrap();
        revoke_share(&store, share.id, owner).await.unwrap();

        let stored = store
            .find_share_by_token(&share.share_token)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_revoke_by_non_creator_not_found() {
        let store = MemoryStore::new();
        let (owner, wishlist_id) = owned_wishlist(&store).await;
        let share = create_share(&store, wishlist_id, owner, None).await.unwrap();

        let result = revoke_share(&store, share.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound)));
        assert!(resolve(&store, &share.share_token, Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_distinguishes_invalid_and_expired() {
        let store = MemoryStore::new();
        let (owner, wishlist_id) = owned_wishlist(&store).await;
        let expires = Utc::now() + Duration::hours(1);
        let share = create_share(&store, wishlist_id, owner, Some(expires))
            .await
            .unwrap();

        assert!(matches!(
            resolve(&store, &generate_token(), Utc::now()).await,
            Err(AppError::LinkInvalid)
        ));
        assert!(resolve(&store, &share.share_token, Utc::now()).await.is_ok());
        assert!(matches!(
            resolve(&store, &share.share_token, expires + Duration::seconds(1)).await,
            Err(AppError::LinkExpired)
        ));
    }
}
