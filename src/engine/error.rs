use ulid::Ulid;

use crate::model::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Candidate span intersects a published reservation on the same asset.
    Overlap {
        conflicting: Ulid,
        span: Span,
    },
    HasReservations(Ulid),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Overlap { conflicting, span } => write!(
                f,
                "overlaps reservation {conflicting} [{}, {})",
                span.start, span.end
            ),
            EngineError::HasReservations(id) => {
                write!(f, "cannot delete asset {id}: has reservations")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
