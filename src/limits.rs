use crate::model::Secs;

pub const MAX_ASSETS: usize = 100_000;
pub const MAX_RESERVATIONS_PER_ASSET: usize = 100_000;
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_TITLE_LEN: usize = 255;

/// 1970-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP: Secs = 0;
/// 9999-12-31T23:59:59Z
pub const MAX_VALID_TIMESTAMP: Secs = 253_402_300_799;
/// One year.
pub const MAX_SPAN_DURATION_SECS: Secs = 366 * 24 * 3600;

/// Longest command line the session will buffer.
pub const MAX_LINE_LEN: usize = 64 * 1024;
