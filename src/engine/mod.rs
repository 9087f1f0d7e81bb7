mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use conflict::{check_no_overlap, conflicts, has_overlap};
pub use error::EngineError;
pub use store::InMemoryStore;

use std::sync::Arc;

use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::model::*;

pub type SharedAssetState = Arc<RwLock<AssetState>>;

/// Per-asset reservation index. Every read of an asset's reservations goes
/// through its `RwLock`; saves hold the write lock across check and insert.
pub struct Engine {
    pub(super) store: InMemoryStore,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
        }
    }

    pub fn get_asset(&self, id: &Ulid) -> Option<SharedAssetState> {
        self.store.get_asset(id)
    }

    pub fn get_asset_for_reservation(&self, reservation_id: &Ulid) -> Option<Ulid> {
        self.store.get_asset_for_reservation(reservation_id)
    }

    /// Lookup reservation → asset, get asset, acquire write lock.
    /// Retries if the reservation moved while the lock was awaited.
    pub(super) async fn resolve_reservation_write(
        &self,
        reservation_id: &Ulid,
    ) -> Result<(Ulid, OwnedRwLockWriteGuard<AssetState>), EngineError> {
        loop {
            let asset_id = self
                .get_asset_for_reservation(reservation_id)
                .ok_or(EngineError::NotFound(*reservation_id))?;
            let asset = self
                .get_asset(&asset_id)
                .ok_or(EngineError::NotFound(asset_id))?;
            let guard = asset.write_owned().await;
            if self.get_asset_for_reservation(reservation_id) == Some(asset_id) {
                return Ok((asset_id, guard));
            }
        }
    }
}
