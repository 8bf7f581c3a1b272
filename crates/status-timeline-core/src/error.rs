use chrono::NaiveDate;
use thiserror::Error;

/// Configuration errors raised before any snapshot computation begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("invalid date range: end {end} must be after start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid cutover window: end {end} is before start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}
