//! Submission-time validation of a reservation.
//!
//! A [`Submission`] is the raw, possibly incomplete set of values a client
//! sends when creating or editing a reservation. [`validate`] turns it into a
//! well-formed [`Candidate`] or a list of field-keyed [`ValidationError`]s;
//! [`submit`] additionally commits the candidate to the engine.

use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::model::*;

/// Accepted datetime layouts for textual input without an offset. Interpreted as UTC.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// A point in time as submitted: unix seconds or a datetime string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Unix(Secs),
    Text(String),
}

impl TimeInput {
    /// Resolve to unix seconds. Sub-second precision is truncated.
    pub fn to_secs(&self) -> Option<Secs> {
        match self {
            TimeInput::Unix(s) => Some(*s),
            TimeInput::Text(s) => parse_datetime(s.trim()),
        }
    }
}

fn parse_datetime(s: &str) -> Option<Secs> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}

/// `YYYY-MM-DD HH:MM`, with `:SS` appended when the seconds are non-zero.
pub(crate) fn format_secs(secs: Secs) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(dt) if dt.second() == 0 => dt.format("%Y-%m-%d %H:%M").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Submission {
    /// Set when editing an existing reservation.
    #[serde(default)]
    pub reservation_id: Option<Ulid>,
    #[serde(default)]
    pub asset_id: Option<Ulid>,
    #[serde(default)]
    pub start: Option<TimeInput>,
    #[serde(default)]
    pub end: Option<TimeInput>,
    #[serde(default)]
    pub status: ReservationStatus,
    #[serde(default)]
    pub title: Option<String>,
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub reservation_id: Option<Ulid>,
    pub asset_id: Ulid,
    pub span: Span,
    pub status: ReservationStatus,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Asset,
    TimeRange,
    Title,
    Reservation,
}

impl Field {
    fn label(&self) -> &'static str {
        match self {
            Field::Asset => "asset",
            Field::TimeRange => "time_range",
            Field::Title => "title",
            Field::Reservation => "reservation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn overlap(span: &Span) -> Self {
        Self::new(
            Field::TimeRange,
            format!(
                "This asset is already reserved from {} to {}.",
                format_secs(span.start),
                format_secs(span.end)
            ),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn has_field(&self, field: Field) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field.label(), e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn reject(errors: Vec<ValidationError>) -> ValidationErrors {
    for e in &errors {
        metrics::counter!(crate::observability::VALIDATION_FAILURES_TOTAL, "field" => e.field.label())
            .increment(1);
    }
    ValidationErrors(errors)
}

/// Required-field and well-formedness checks, no engine access.
fn extract(submission: &Submission) -> Result<Candidate, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if submission.asset_id.is_none() {
        errors.push(ValidationError::new(Field::Asset, "Asset field is required."));
    }

    let start = submission.start.as_ref().map(TimeInput::to_secs);
    let end = submission.end.as_ref().map(TimeInput::to_secs);
    let span = match (start, end) {
        (None, _) | (_, None) => {
            errors.push(ValidationError::new(
                Field::TimeRange,
                "Time range field is required.",
            ));
            None
        }
        (Some(None), _) | (_, Some(None)) => {
            errors.push(ValidationError::new(
                Field::TimeRange,
                "Time range contains an invalid date.",
            ));
            None
        }
        (Some(Some(start)), Some(Some(end))) => {
            let span = Span::try_new(start, end);
            if span.is_none() {
                errors.push(ValidationError::new(
                    Field::TimeRange,
                    "The end date must be after the start date.",
                ));
            }
            span
        }
    };

    match (submission.asset_id, span) {
        (Some(asset_id), Some(span)) if errors.is_empty() => Ok(Candidate {
            reservation_id: submission.reservation_id,
            asset_id,
            span,
            status: submission.status,
            title: submission.title.clone(),
        }),
        _ => Err(errors),
    }
}

/// Validate a submission against the reservations already on its asset.
///
/// Drafts skip the overlap check: they neither block nor get blocked.
pub async fn validate(engine: &Engine, submission: &Submission) -> Result<Candidate, ValidationErrors> {
    let candidate = extract(submission).map_err(reject)?;

    if candidate.status.is_blocking()
        && let Err(EngineError::Overlap { conflicting, span }) = engine
            .check_overlap(candidate.span, candidate.asset_id, candidate.reservation_id)
            .await
    {
        debug!("submission for asset {} overlaps {conflicting}", candidate.asset_id);
        return Err(reject(vec![ValidationError::overlap(&span)]));
    }
    Ok(candidate)
}

/// Validate and commit. Returns the reservation id (freshly minted when
/// the submission does not name one).
///
/// The engine repeats the overlap check under the asset's write lock, so a
/// conflicting reservation committed between validation and save is still
/// reported as a time-range error.
pub async fn submit(engine: &Engine, submission: &Submission) -> Result<Ulid, ValidationErrors> {
    let candidate = validate(engine, submission).await?;
    let id = candidate.reservation_id.unwrap_or_else(Ulid::new);

    engine
        .save_reservation(
            id,
            candidate.asset_id,
            candidate.span,
            candidate.status,
            candidate.title,
        )
        .await
        .map_err(|e| reject(vec![save_error(e, candidate.asset_id)]))?;
    Ok(id)
}

fn save_error(err: EngineError, asset_id: Ulid) -> ValidationError {
    match err {
        EngineError::Overlap { span, .. } => ValidationError::overlap(&span),
        EngineError::NotFound(id) if id == asset_id => {
            ValidationError::new(Field::Asset, "The referenced asset does not exist.")
        }
        EngineError::LimitExceeded(msg) if msg.starts_with("title") => {
            ValidationError::new(Field::Title, "Title is too long.")
        }
        EngineError::LimitExceeded(msg) if msg.starts_with("too many") => {
            ValidationError::new(Field::Asset, format!("Limit exceeded: {msg}."))
        }
        EngineError::LimitExceeded(msg) => {
            ValidationError::new(Field::TimeRange, format!("Invalid time range: {msg}."))
        }
        other => ValidationError::new(Field::Reservation, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2026-02-04T00:00:00Z
    const DAY: Secs = 1_770_163_200;
    const H: Secs = 3600;

    #[test]
    fn parses_naive_iso_as_utc() {
        let t = TimeInput::Text("2026-02-04T10:00:00".into());
        assert_eq!(t.to_secs(), Some(DAY + 10 * H));
        let t = TimeInput::Text("2026-02-04 10:00:00".into());
        assert_eq!(t.to_secs(), Some(DAY + 10 * H));
        let t = TimeInput::Text("2026-02-04T12:01".into());
        assert_eq!(t.to_secs(), Some(DAY + 12 * H + 60));
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let t = TimeInput::Text("2026-02-04T11:00:00+01:00".into());
        assert_eq!(t.to_secs(), Some(DAY + 10 * H));
    }

    #[test]
    fn rejects_garbage_datetime() {
        assert_eq!(TimeInput::Text("tomorrow-ish".into()).to_secs(), None);
        assert_eq!(TimeInput::Unix(42).to_secs(), Some(42));
    }

    #[test]
    fn time_input_deserializes_both_forms() {
        let n: TimeInput = serde_json::from_str("1770199200").unwrap();
        assert_eq!(n, TimeInput::Unix(1_770_199_200));
        let s: TimeInput = serde_json::from_str("\"2026-02-04T10:00:00\"").unwrap();
        assert_eq!(s, TimeInput::Text("2026-02-04T10:00:00".into()));
    }

    #[test]
    fn format_secs_renders_minutes() {
        assert_eq!(format_secs(DAY + 10 * H), "2026-02-04 10:00");
    }

    #[test]
    fn format_secs_keeps_nonzero_seconds() {
        assert_eq!(format_secs(DAY + 10 * H + 30), "2026-02-04 10:00:30");
        assert_eq!(format_secs(DAY + 12 * H - 1), "2026-02-04 11:59:59");
    }

    #[test]
    fn extract_reports_missing_fields() {
        let errors = extract(&Submission::default()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, Field::Asset);
        assert_eq!(errors[1].field, Field::TimeRange);
    }

    #[test]
    fn extract_rejects_inverted_range() {
        let sub = Submission {
            asset_id: Some(Ulid::new()),
            start: Some(TimeInput::Unix(DAY + 12 * H)),
            end: Some(TimeInput::Unix(DAY + 10 * H)),
            ..Default::default()
        };
        let errors = extract(&sub).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, Field::TimeRange);
    }

    #[test]
    fn extract_rejects_empty_range() {
        let sub = Submission {
            asset_id: Some(Ulid::new()),
            start: Some(TimeInput::Unix(DAY)),
            end: Some(TimeInput::Unix(DAY)),
            ..Default::default()
        };
        assert!(extract(&sub).is_err());
    }

    #[test]
    fn extract_builds_candidate() {
        let asset = Ulid::new();
        let sub = Submission {
            asset_id: Some(asset),
            start: Some(TimeInput::Text("2026-02-04T10:00:00".into())),
            end: Some(TimeInput::Text("2026-02-04T12:00:00".into())),
            title: Some("Projector".into()),
            ..Default::default()
        };
        let c = extract(&sub).unwrap();
        assert_eq!(c.asset_id, asset);
        assert_eq!(c.span, Span::new(DAY + 10 * H, DAY + 12 * H));
        assert_eq!(c.status, ReservationStatus::Published);
        assert_eq!(c.reservation_id, None);
    }

    #[test]
    fn display_joins_errors() {
        let errs = ValidationErrors(vec![
            ValidationError::new(Field::Asset, "Asset field is required."),
            ValidationError::new(Field::TimeRange, "Time range field is required."),
        ]);
        assert_eq!(
            errs.to_string(),
            "asset: Asset field is required.; time_range: Time range field is required."
        );
        assert!(errs.has_field(Field::Asset));
        assert!(!errs.has_field(Field::Title));
    }

    #[test]
    fn save_error_maps_to_fields() {
        let asset = Ulid::new();
        let e = save_error(
            EngineError::Overlap {
                conflicting: Ulid::new(),
                span: Span::new(DAY + 10 * H, DAY + 12 * H),
            },
            asset,
        );
        assert_eq!(e.field, Field::TimeRange);
        assert_eq!(
            e.message,
            "This asset is already reserved from 2026-02-04 10:00 to 2026-02-04 12:00."
        );
        assert_eq!(save_error(EngineError::NotFound(asset), asset).field, Field::Asset);
        assert_eq!(
            save_error(EngineError::LimitExceeded("title too long"), asset).field,
            Field::Title
        );
        assert_eq!(
            save_error(EngineError::LimitExceeded("span too wide"), asset).field,
            Field::TimeRange
        );
    }
}
