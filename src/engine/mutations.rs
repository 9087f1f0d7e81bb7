use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_overlap, validate_span};
use super::{Engine, EngineError};

impl Engine {
    pub fn create_asset(&self, id: Ulid, name: Option<String>) -> Result<(), EngineError> {
        if self.store.asset_count() >= MAX_ASSETS {
            return Err(EngineError::LimitExceeded("too many assets"));
        }
        if let Some(ref n) = name
            && n.len() > MAX_NAME_LEN
        {
            return Err(EngineError::LimitExceeded("asset name too long"));
        }
        let state = Arc::new(RwLock::new(AssetState::new(id, name)));
        if !self.store.insert_asset(id, state) {
            return Err(EngineError::AlreadyExists(id));
        }
        metrics::gauge!(crate::observability::ASSETS_ACTIVE).set(self.store.asset_count() as f64);
        info!("asset {id} created");
        Ok(())
    }

    pub async fn delete_asset(&self, id: Ulid) -> Result<(), EngineError> {
        let asset = self.get_asset(&id).ok_or(EngineError::NotFound(id))?;
        let guard = asset.write().await;
        if !guard.reservations.is_empty() {
            return Err(EngineError::HasReservations(id));
        }
        self.store.remove_asset(&id);
        drop(guard);

        metrics::gauge!(crate::observability::ASSETS_ACTIVE).set(self.store.asset_count() as f64);
        info!("asset {id} deleted");
        Ok(())
    }

    /// Create or edit a reservation.
    ///
    /// Published reservations are checked for overlap against the target
    /// asset while its write lock is held, so two overlapping saves racing on
    /// the same asset cannot both commit. The reservation's own previous
    /// version never conflicts with itself. Editing may move a reservation to
    /// a different asset.
    pub async fn save_reservation(
        &self,
        id: Ulid,
        asset_id: Ulid,
        span: Span,
        status: ReservationStatus,
        title: Option<String>,
    ) -> Result<(), EngineError> {
        validate_span(&span)?;
        if let Some(ref t) = title
            && t.len() > MAX_TITLE_LEN
        {
            return Err(EngineError::LimitExceeded("title too long"));
        }
        let target = self
            .get_asset(&asset_id)
            .ok_or(EngineError::NotFound(asset_id))?;

        let reservation = Reservation {
            id,
            asset_id,
            span,
            status,
            title,
        };

        // The index is re-read under the locks: a concurrent save may have
        // moved or created this reservation since it was first resolved.
        loop {
            match self.get_asset_for_reservation(&id) {
                Some(previous) if previous != asset_id => {
                    let source = self
                        .get_asset(&previous)
                        .ok_or(EngineError::NotFound(previous))?;
                    // Acquire write locks in sorted order to prevent deadlocks.
                    let (mut source_guard, mut target_guard) = if previous < asset_id {
                        let s = source.write_owned().await;
                        let t = target.clone().write_owned().await;
                        (s, t)
                    } else {
                        let t = target.clone().write_owned().await;
                        let s = source.write_owned().await;
                        (s, t)
                    };
                    if self.get_asset_for_reservation(&id) != Some(previous) {
                        debug!("reservation {id} changed owner during save, retrying");
                        continue;
                    }
                    if !self.store.contains_asset(&asset_id) {
                        return Err(EngineError::NotFound(asset_id));
                    }
                    if target_guard.reservations.len() >= MAX_RESERVATIONS_PER_ASSET {
                        return Err(EngineError::LimitExceeded("too many reservations on asset"));
                    }
                    if status.is_blocking() {
                        self.check_for_save(&target_guard, &span, id)?;
                    }
                    if !self.store.swap_reservation(id, Some(previous), asset_id) {
                        continue;
                    }
                    source_guard.remove_reservation(id);
                    target_guard.insert_reservation(reservation);
                    debug!("reservation {id} moved from asset {previous} to {asset_id}");
                    break;
                }
                previous => {
                    let mut guard = target.write().await;
                    if self.get_asset_for_reservation(&id) != previous {
                        debug!("reservation {id} changed owner during save, retrying");
                        continue;
                    }
                    if !self.store.contains_asset(&asset_id) {
                        return Err(EngineError::NotFound(asset_id));
                    }
                    if previous.is_none() && guard.reservations.len() >= MAX_RESERVATIONS_PER_ASSET {
                        return Err(EngineError::LimitExceeded("too many reservations on asset"));
                    }
                    if status.is_blocking() {
                        self.check_for_save(&guard, &span, id)?;
                    }
                    if !self.store.swap_reservation(id, previous, asset_id) {
                        continue;
                    }
                    guard.remove_reservation(id);
                    guard.insert_reservation(reservation);
                    break;
                }
            }
        }

        metrics::counter!(crate::observability::RESERVATIONS_SAVED_TOTAL).increment(1);
        info!("reservation {id} saved on asset {asset_id} [{}, {})", span.start, span.end);
        Ok(())
    }

    fn check_for_save(&self, asset: &AssetState, span: &Span, id: Ulid) -> Result<(), EngineError> {
        let result = check_no_overlap(asset, span, Some(id));
        if let Err(EngineError::Overlap { conflicting, .. }) = &result {
            metrics::counter!(crate::observability::SAVE_CONFLICTS_TOTAL).increment(1);
            debug!("save of reservation {id} rejected: overlaps {conflicting}");
        }
        result
    }

    /// Change a reservation's status. Publishing re-runs the overlap check,
    /// since a draft was never checked against its neighbours.
    pub async fn set_status(&self, id: Ulid, status: ReservationStatus) -> Result<Ulid, EngineError> {
        let (asset_id, mut guard) = self.resolve_reservation_write(&id).await?;
        let span = guard.get(&id).ok_or(EngineError::NotFound(id))?.span;
        if status.is_blocking() {
            self.check_for_save(&guard, &span, id)?;
        }
        if let Some(r) = guard.reservations.iter_mut().find(|r| r.id == id) {
            r.status = status;
        }
        info!("reservation {id} set to {status:?}");
        Ok(asset_id)
    }

    pub async fn delete_reservation(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let (asset_id, mut guard) = self.resolve_reservation_write(&id).await?;
        guard
            .remove_reservation(id)
            .ok_or(EngineError::NotFound(id))?;
        self.store.unmap_reservation(&id);
        info!("reservation {id} deleted from asset {asset_id}");
        Ok(asset_id)
    }
}
