//! Derived statistics over a member's voice history.
//!
//! Durations are summed as calendar spans (years, months, days, hours,
//! minutes, seconds) rather than as a flat number of seconds, so a session
//! that crosses a month boundary is reported in months and days.

use chrono::{Datelike, Months, NaiveDateTime};
use std::fmt;
use std::ops::Add;

use crate::db::Timestamp;

/// A calendar-aware difference between two points in time.
///
/// Fields may be negative when the history is out of order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarSpan {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl CalendarSpan {
    /// Difference from `start` to `end`.
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if end < start {
            return Self::between(end, start).negated();
        }

        let mut months = (end.year() - start.year()) as i64 * 12
            + end.month() as i64
            - start.month() as i64;
        let mut anchor = add_months(start, months);
        while months > 0 && anchor > end {
            months -= 1;
            anchor = add_months(start, months);
        }

        let rest = (end - anchor).num_seconds();

        Self {
            years: months / 12,
            months: months % 12,
            days: rest / 86_400,
            hours: rest % 86_400 / 3_600,
            minutes: rest % 3_600 / 60,
            seconds: rest % 60,
        }
    }

    fn negated(self) -> Self {
        Self {
            years: -self.years,
            months: -self.months,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
        }
    }

    /// Carries overflowing units upwards. Days never carry into months since
    /// a month has no fixed length.
    fn normalized(mut self) -> Self {
        carry(&mut self.seconds, &mut self.minutes, 60);
        carry(&mut self.minutes, &mut self.hours, 60);
        carry(&mut self.hours, &mut self.days, 24);
        carry(&mut self.months, &mut self.years, 12);
        self
    }
}

impl Add for CalendarSpan {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            years: self.years + rhs.years,
            months: self.months + rhs.months,
            days: self.days + rhs.days,
            hours: self.hours + rhs.hours,
            minutes: self.minutes + rhs.minutes,
            seconds: self.seconds + rhs.seconds,
        }
        .normalized()
    }
}

impl fmt::Display for CalendarSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} years, {} months, {} days, {} hours, {} minutes, {} seconds",
            self.years, self.months, self.days, self.hours, self.minutes, self.seconds
        )
    }
}

fn add_months(at: NaiveDateTime, months: i64) -> NaiveDateTime {
    u32::try_from(months)
        .ok()
        .and_then(|months| at.checked_add_months(Months::new(months)))
        .unwrap_or(at)
}

fn carry(lower: &mut i64, upper: &mut i64, base: i64) {
    let sign = lower.signum();
    let magnitude = lower.abs();
    if magnitude >= base {
        *upper += magnitude / base * sign;
        *lower = magnitude % base * sign;
    }
}

/// Pairs start entries with end entries by index.
///
/// An end that precedes the first start is an unmatched leading end and
/// shifts every pairing by one. A start later than the last end is an
/// unmatched trailing start and is dropped. Returns `None` when nothing
/// pairs up or a start is left without a partner.
pub fn paired_spans(
    starts: &[Timestamp],
    ends: &[Timestamp],
) -> Option<Vec<(NaiveDateTime, NaiveDateTime)>> {
    let (first_start, first_end) = (starts.first()?, ends.first()?);
    let (last_start, last_end) = (starts.last()?, ends.last()?);

    let offset = usize::from(first_end < first_start);
    let mut count = starts.len();
    if last_start > last_end {
        count -= 1;
    }

    let pairs = (0..count)
        .map(|i| Some((starts[i].at(), ends.get(i + offset)?.at())))
        .collect::<Option<Vec<_>>>()?;

    if pairs.is_empty() { None } else { Some(pairs) }
}

/// Sum of all paired start→end spans, or `None` if the history holds no
/// complete pair.
pub fn total_span(starts: &[Timestamp], ends: &[Timestamp]) -> Option<CalendarSpan> {
    let pairs = paired_spans(starts, ends)?;
    Some(
        pairs
            .into_iter()
            .map(|(start, end)| CalendarSpan::between(start, end))
            .fold(CalendarSpan::default(), |total, span| total + span),
    )
}
