//! Conflict Engine (C4) — pure functions over time intervals, no I/O.
//! spec.md §4.3.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::TimeWindow;

/// `Overlap([s1,e1), [s2,e2)) := s1 < e2 ∧ s2 < e1`.
#[must_use]
pub fn overlap(a_start: DateTime<Utc>, a_end: DateTime<Utc>, b_start: DateTime<Utc>, b_end: DateTime<Utc>) -> bool {
    a_start < b_end && b_start < a_end
}

/// An interval within a single day, always clipped to that day by the
/// caller before reaching the free-slot search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Clip `intervals` to `[day_start, day_end)`, sort by start, and merge
/// overlaps — step 1 of `FindFreeSlot` (spec.md §4.3).
#[must_use]
pub fn canonicalize_busy(intervals: &[Interval], day_start: DateTime<Utc>, day_end: DateTime<Utc>) -> Vec<Interval> {
    let mut clipped: Vec<Interval> = intervals
        .iter()
        .filter_map(|iv| {
            let start = iv.start.max(day_start);
            let end = iv.end.min(day_end);
            (start < end).then_some(Interval { start, end })
        })
        .collect();

    clipped.sort_by_key(|iv| iv.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(clipped.len());
    for iv in clipped.drain(..) {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end => {
                last.end = last.end.max(iv.end);
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// Resolve an hour-of-day `TimeWindow` against a concrete calendar `day`
/// into absolute UTC instants. `day` and the window's hours are wall-clock
/// values in `tz` (spec.md §4.4/§6); the result is the UTC instant that
/// wall-clock time corresponds to, via `local_hour_to_utc`.
#[must_use]
pub fn window_to_interval(day: NaiveDate, window: TimeWindow, tz: Tz) -> Interval {
    let start = local_hour_to_utc(day, window.start_hour, tz);
    let end = start + Duration::hours(i64::from(window.end_hour - window.start_hour));
    Interval { start, end }
}

/// Convert a wall-clock `day` + `hour` in `tz` into the corresponding UTC
/// instant. DST-gap wall-clock times (`LocalResult::None`, e.g. 02:30
/// during a spring-forward transition) have no real local instant; rather
/// than failing the cycle, the naive time is treated as already UTC —
/// shifting that one day's window by the DST offset is preferable to
/// aborting planning. Ambiguous (fall-back) times resolve to the earlier
/// of the two offsets.
#[must_use]
pub fn local_hour_to_utc(day: NaiveDate, hour: u32, tz: Tz) -> DateTime<Utc> {
    let naive = day.and_hms_opt(hour, 0, 0).expect("valid hour");
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

/// The calendar date `instant` falls on in `tz` — keeps "today" and
/// day/week boundaries aligned with the user's local calendar rather than
/// UTC's (spec.md §4.4 "timezone-local, Monday-start").
#[must_use]
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Find the earliest gap of at least `duration` within `window`, after
/// removing `busy`. Falls back to `alternate_window` under the `flexible`
/// policy if `window` has no gap. Returns `None` if neither window has
/// room (spec.md §4.3 steps 2–4, tie-break: earliest start wins).
#[must_use]
pub fn find_free_slot(
    window: Interval,
    alternate_window: Option<Interval>,
    duration: Duration,
    busy: &[Interval],
) -> Option<DateTime<Utc>> {
    first_gap(window, duration, busy).or_else(|| alternate_window.and_then(|alt| first_gap(alt, duration, busy)))
}

fn first_gap(window: Interval, duration: Duration, busy: &[Interval]) -> Option<DateTime<Utc>> {
    let relevant: Vec<Interval> = busy
        .iter()
        .filter(|iv| iv.end > window.start && iv.start < window.end)
        .copied()
        .collect();

    let mut cursor = window.start;
    for iv in &relevant {
        if iv.start > cursor && iv.start - cursor >= duration {
            return Some(cursor);
        }
        cursor = cursor.max(iv.end);
    }
    if window.end > cursor && window.end - cursor >= duration {
        return Some(cursor);
    }
    None
}
