use std::time::Instant;

use ulid::Ulid;

use crate::model::*;

use super::conflict::{self, check_no_overlap};
use super::{Engine, EngineError};

impl Engine {
    /// Does `candidate` overlap a published reservation on `asset_id` other
    /// than `exclude`? An unknown asset has no reservations, so never overlaps.
    pub async fn has_overlap(&self, candidate: Span, asset_id: Ulid, exclude: Option<Ulid>) -> bool {
        self.check_overlap(candidate, asset_id, exclude).await.is_err()
    }

    /// `Result` form of [`Engine::has_overlap`]: `Err(Overlap)` names the
    /// earliest conflicting reservation.
    pub async fn check_overlap(
        &self,
        candidate: Span,
        asset_id: Ulid,
        exclude: Option<Ulid>,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = match self.get_asset(&asset_id) {
            Some(asset) => {
                let guard = asset.read().await;
                check_no_overlap(&guard, &candidate, exclude)
            }
            None => Ok(()),
        };
        let outcome = if result.is_ok() { "clear" } else { "overlap" };
        metrics::counter!(crate::observability::OVERLAP_CHECKS_TOTAL, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(crate::observability::CHECK_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// Every published reservation on `asset_id` overlapping `candidate`, by start.
    pub async fn find_conflicts(
        &self,
        candidate: Span,
        asset_id: Ulid,
        exclude: Option<Ulid>,
    ) -> Vec<Reservation> {
        let Some(asset) = self.get_asset(&asset_id) else {
            return Vec::new();
        };
        let guard = asset.read().await;
        conflict::conflicts(&guard, &candidate, exclude)
            .cloned()
            .collect()
    }

    pub async fn get_reservation(&self, id: &Ulid) -> Option<Reservation> {
        let asset_id = self.get_asset_for_reservation(id)?;
        let asset = self.get_asset(&asset_id)?;
        let guard = asset.read().await;
        guard.get(id).cloned()
    }

    pub async fn list_reservations(&self, asset_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        let asset = self
            .get_asset(&asset_id)
            .ok_or(EngineError::NotFound(asset_id))?;
        let guard = asset.read().await;
        Ok(guard.reservations.clone())
    }

    pub async fn list_assets(&self) -> Vec<AssetInfo> {
        let assets = self.store.snapshot();
        let mut out = Vec::with_capacity(assets.len());
        for (_, asset) in assets {
            let guard = asset.read().await;
            out.push(AssetInfo {
                id: guard.id,
                name: guard.name.clone(),
                reservation_count: guard.reservations.len(),
            });
        }
        out
    }
}
