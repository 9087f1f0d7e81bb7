use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use super::SharedAssetState;

pub struct InMemoryStore {
    assets: DashMap<Ulid, SharedAssetState>,
    reservation_to_asset: DashMap<Ulid, Ulid>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            assets: DashMap::new(),
            reservation_to_asset: DashMap::new(),
        }
    }

    // ── Assets ───────────────────────────────────────────────

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn contains_asset(&self, id: &Ulid) -> bool {
        self.assets.contains_key(id)
    }

    pub fn get_asset(&self, id: &Ulid) -> Option<SharedAssetState> {
        self.assets.get(id).map(|e| e.value().clone())
    }

    /// Returns false, leaving the existing asset in place, if `id` is taken.
    pub fn insert_asset(&self, id: Ulid, state: SharedAssetState) -> bool {
        match self.assets.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(state);
                true
            }
        }
    }

    pub fn remove_asset(&self, id: &Ulid) -> bool {
        self.assets.remove(id).is_some()
    }

    /// Every asset, ordered by id.
    pub fn snapshot(&self) -> Vec<(Ulid, SharedAssetState)> {
        let mut assets: Vec<_> = self
            .assets
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        assets.sort_by_key(|(id, _)| *id);
        assets
    }

    // ── Reservation index ────────────────────────────────────

    pub fn get_asset_for_reservation(&self, reservation_id: &Ulid) -> Option<Ulid> {
        self.reservation_to_asset
            .get(reservation_id)
            .map(|e| *e.value())
    }

    /// Point `reservation_id` at `asset_id` only if it currently points at
    /// `expected` (`None` = unmapped). Returns false when another save got
    /// there first; the caller must re-resolve and retry.
    ///
    /// Callers hold the write lock of `expected` (when `Some`) and of
    /// `asset_id`, so a successful swap also means the asset contents they
    /// are about to change are the ones the index describes.
    pub fn swap_reservation(&self, reservation_id: Ulid, expected: Option<Ulid>, asset_id: Ulid) -> bool {
        match self.reservation_to_asset.entry(reservation_id) {
            Entry::Occupied(mut e) if Some(*e.get()) == expected => {
                e.insert(asset_id);
                true
            }
            Entry::Vacant(e) if expected.is_none() => {
                e.insert(asset_id);
                true
            }
            _ => false,
        }
    }

    pub fn unmap_reservation(&self, reservation_id: &Ulid) {
        self.reservation_to_asset.remove(reservation_id);
    }
}
