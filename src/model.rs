use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix seconds. The only time type.
pub type Secs = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Secs,
    pub end: Secs,
}

impl Span {
    pub fn new(start: Secs, end: Secs) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Checked constructor for untrusted input. `None` unless `start < end`.
    pub fn try_new(start: Secs, end: Secs) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_secs(&self) -> Secs {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Whether a reservation takes part in overlap checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Active reservation. Blocks every other published reservation on its asset.
    #[default]
    Published,
    /// Draft. Never blocks and is never blocked.
    Unpublished,
}

impl ReservationStatus {
    pub fn is_blocking(&self) -> bool {
        matches!(self, ReservationStatus::Published)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub asset_id: Ulid,
    pub span: Span,
    pub status: ReservationStatus,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssetState {
    pub id: Ulid,
    pub name: Option<String>,
    /// All reservations on this asset, sorted by `span.start`.
    pub reservations: Vec<Reservation>,
}

impl AssetState {
    pub fn new(id: Ulid, name: Option<String>) -> Self {
        Self {
            id,
            name,
            reservations: Vec::new(),
        }
    }

    /// Insert reservation maintaining sort order by span.start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    /// Remove reservation by id.
    pub fn remove_reservation(&mut self, id: Ulid) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn get(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    /// Return only reservations whose span overlaps the query window.
    /// Uses binary search to skip reservations starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub id: Ulid,
    pub name: Option<String>,
    pub reservation_count: usize,
}
