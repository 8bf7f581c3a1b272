//! Day-granular status timeline.
//!
//! [`build_timeline`] walks a [`DateRange`] one calendar day at a time,
//! takes the corpus snapshot at the start of each day, and writes one
//! [`TimelinePoint`] per status that at least one page holds.
//!
//! Points are append-only and inserted idempotently, so a run that was
//! aborted can be resumed by running it again: days already written are
//! recomputed and matched, missing points are added, nothing is
//! duplicated. When the underlying facts have changed since a day was
//! written (for example after a backfill), the stored count no longer
//! matches the recomputed one; such points are reported as stale and the
//! caller decides whether to clear the range and rebuild.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use chrono::NaiveDate;

use crate::error::TimelineError;
use crate::models::{start_of_day, TimelinePoint};
use crate::snapshot::RevisionIndex;
use crate::status::CanonicalStatus;
use crate::store::Store;

/// A range of calendar days, start inclusive and end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Fails when `end <= start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TimelineError> {
        if end <= start {
            return Err(TimelineError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn num_days(&self) -> u64 {
        (self.end - self.start).num_days() as u64
    }

    /// Every day in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(move |d| *d < end)
    }
}

/// Outcome of one timeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineReport {
    pub days: u64,
    pub points_inserted: u64,
    pub points_unchanged: u64,
    /// Stored (date, status) pairs whose count differs from the recomputed
    /// one, including statuses that no longer occur on that day.
    pub points_stale: u64,
    /// The recomputed points for the range, ordered by date then status.
    pub points: Vec<TimelinePoint>,
}

/// Timeline points for one day from a prebuilt index.
pub fn points_for_day(index: &RevisionIndex, date: NaiveDate) -> Vec<TimelinePoint> {
    index
        .snapshot_counts(start_of_day(date))
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(category, count)| TimelinePoint {
            date,
            category,
            count,
        })
        .collect()
}

/// Compute and store the timeline for `range`.
///
/// Returns the recomputed point sequence in [`TimelineReport::points`]
/// together with the write counters. `on_day` is called after each day with `(days_done, days_total)`.
pub async fn build_timeline<F>(
    store: &dyn Store,
    range: DateRange,
    mut on_day: F,
) -> Result<TimelineReport>
where
    F: FnMut(u64, u64) + Send,
{
    let index = RevisionIndex::load(store).await?;

    let mut existing: BTreeMap<(NaiveDate, CanonicalStatus), BTreeSet<i64>> = BTreeMap::new();
    for point in store.timeline_points(Some(range)).await? {
        existing
            .entry((point.date, point.category))
            .or_default()
            .insert(point.count);
    }

    let total = range.num_days();
    let mut report = TimelineReport::default();

    for date in range.days() {
        let points = points_for_day(&index, date);

        // A status absent from the recomputed day has a count of zero.
        for status in CanonicalStatus::ALL {
            let count = points
                .iter()
                .find(|p| p.category == status)
                .map_or(0, |p| p.count);
            if let Some(stored) = existing.get(&(date, status)) {
                if stored.iter().any(|c| *c != count) {
                    report.points_stale += 1;
                }
            }
        }

        for point in points {
            if store.insert_timeline_point(&point).await? {
                report.points_inserted += 1;
            } else {
                report.points_unchanged += 1;
            }
            report.points.push(point);
        }
        report.days += 1;
        on_day(report.days, total);
    }

    if report.points_stale > 0 {
        tracing::warn!(
            stale = report.points_stale,
            "stored timeline counts differ from recomputed ones; rebuild the range to replace them"
        );
    }
    tracing::info!(
        days = report.days,
        inserted = report.points_inserted,
        unchanged = report.points_unchanged,
        "timeline built"
    );

    Ok(report)
}
