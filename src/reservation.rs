//! Reservation lifecycle of a wishlist item.
//!
//! ```text
//! available --reserve--> reserved --(owner)--> purchased
//!     ^                     |
//!     +------unreserve------+
//! ```
//!
//! Share-link holders drive `reserve` and `unreserve`. Each is a single
//! guarded write executed by the store; there is no read before the write
//! and no in-process lock. When several actors race for the same item the
//! store admits exactly one of them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{ItemStatus, WishlistItem};
use crate::error::AppError;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationAction {
    Reserve,
    Unreserve,
}

/// Precondition a row must satisfy for a transition to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// `status = 'available'`
    Available,
    /// `reserved_by = :actor` (which implies `status = 'reserved'`)
    ReservedBy(Uuid),
}

impl Guard {
    pub fn admits(&self, item: &WishlistItem) -> bool {
        match self {
            Guard::Available => item.status == ItemStatus::Available,
            Guard::ReservedBy(actor) => {
                item.status == ItemStatus::Reserved && item.reserved_by == Some(*actor)
            }
        }
    }
}

/// A guarded status write: if `guard` admits the row, set `status` and
/// `reserved_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub guard: Guard,
    pub status: ItemStatus,
    pub reserved_by: Option<Uuid>,
}

impl ReservationAction {
    pub fn transition(self, actor_id: Uuid) -> Transition {
        match self {
            ReservationAction::Reserve => Transition {
                guard: Guard::Available,
                status: ItemStatus::Reserved,
                reserved_by: Some(actor_id),
            },
            ReservationAction::Unreserve => Transition {
                guard: Guard::ReservedBy(actor_id),
                status: ItemStatus::Available,
                reserved_by: None,
            },
        }
    }
}

/// Run `action` for `actor_id` against one item of `wishlist_id`.
///
/// Zero matched rows is `TransitionRejected` whatever the cause: already
/// taken, lost race, reserved by someone else, or not in this wishlist.
#[tracing::instrument(skip(store, actor_id))]
pub async fn apply(
    store: &dyn Store,
    action: ReservationAction,
    item_id: Uuid,
    wishlist_id: Uuid,
    actor_id: Uuid,
) -> Result<WishlistItem, AppError> {
    let transition = action.transition(actor_id);

    match store
        .apply_transition(item_id, wishlist_id, &transition)
        .await?
    {
        Some(item) => {
            tracing::info!(action = ?action, status = %item.status, "reservation transition applied");
            Ok(item)
        }
        None => {
            tracing::warn!(action = ?action, "reservation transition rejected");
            Err(AppError::TransitionRejected(action))
        }
    }
}

pub async fn reserve(
    store: &dyn Store,
    item_id: Uuid,
    wishlist_id: Uuid,
    actor_id: Uuid,
) -> Result<WishlistItem, AppError> {
    apply(store, ReservationAction::Reserve, item_id, wishlist_id, actor_id).await
}

pub async fn unreserve(
    store: &dyn Store,
    item_id: Uuid,
    wishlist_id: Uuid,
    actor_id: Uuid,
) -> Result<WishlistItem, AppError> {
    apply(store, ReservationAction::Unreserve, item_id, wishlist_id, actor_id).await
}
