use ulid::Ulid;

use crate::model::*;

use super::EngineError;

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.start < MIN_VALID_TIMESTAMP || span.end > MAX_VALID_TIMESTAMP {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_secs() > MAX_SPAN_DURATION_SECS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(())
}

/// Published reservations on `asset` that overlap `candidate`, skipping `exclude`.
/// Yielded in start order.
pub fn conflicts<'a>(
    asset: &'a AssetState,
    candidate: &'a Span,
    exclude: Option<Ulid>,
) -> impl Iterator<Item = &'a Reservation> {
    asset
        .overlapping(candidate)
        .filter(move |r| Some(r.id) != exclude && r.status.is_blocking())
}

/// The overlap predicate: does `candidate` intersect any blocking reservation?
pub fn has_overlap(asset: &AssetState, candidate: &Span, exclude: Option<Ulid>) -> bool {
    conflicts(asset, candidate, exclude).next().is_some()
}

/// Same as [`has_overlap`], reporting the earliest conflicting reservation.
pub fn check_no_overlap(
    asset: &AssetState,
    candidate: &Span,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match conflicts(asset, candidate, exclude).next() {
        Some(r) => Err(EngineError::Overlap {
            conflicting: r.id,
            span: r.span,
        }),
        None => Ok(()),
    }
}
