//! Next-due scheduling.
//!
//! The single place that turns a frequency and its administration times into the next
//! timestamp at which a scheduled medication becomes eligible. Recomputed on demand after every
//! administration and every schedule edit; no schedule state is persisted here.
//!
//! Times of day are interpreted in the UTC offset of the supplied `now`.

use crate::dosing::DosingPolicy;
use crate::medication::Frequency;
use crate::Timestamp;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike};

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Compute when a medication is next due.
///
/// - PRN and continuous medications are due immediately (`now`).
/// - A `start_date` later than today pins the result to the first slot on that date.
/// - Otherwise the earliest daily slot at or after `now` is returned, wrapping to tomorrow's
///   first slot once today's have all passed.
pub fn compute_next_due(
    frequency: &Frequency,
    start_date: Option<NaiveDate>,
    admin_times: &[NaiveTime],
    now: Timestamp,
    policy: &DosingPolicy,
) -> Timestamp {
    if matches!(frequency, Frequency::AsNeeded | Frequency::Continuous) {
        return now;
    }

    let slots = daily_slots(frequency, admin_times, policy.default_admin_time());
    let today = now.date_naive();

    if let Some(start) = start_date.filter(|start| *start > today) {
        return at_local(&now, start, slots[0]);
    }

    let time_now = now.time();
    match slots.iter().find(|slot| **slot >= time_now) {
        Some(slot) => at_local(&now, today, *slot),
        None => at_local(&now, today + Duration::days(1), slots[0]),
    }
}

/// The sorted, de-duplicated administration slots of one day. Never empty.
///
/// More than one configured time is used as-is. Otherwise slots are derived from a single anchor
/// (the configured time, or the policy default) by stepping the frequency's interval and
/// wrapping into the day. Unknown frequencies get one slot per day at the anchor.
pub fn daily_slots(
    frequency: &Frequency,
    admin_times: &[NaiveTime],
    default_admin_time: NaiveTime,
) -> Vec<NaiveTime> {
    let mut slots: Vec<NaiveTime> = if admin_times.len() > 1 {
        admin_times.to_vec()
    } else {
        let anchor = admin_times.first().copied().unwrap_or(default_admin_time);
        let step_seconds = match frequency {
            Frequency::EveryHours(n) if *n > 0 => n.saturating_mul(3600),
            other => match other.doses_per_day() {
                Some(doses) => SECONDS_PER_DAY / doses,
                None => SECONDS_PER_DAY,
            },
        };
        derive_slots(anchor, step_seconds)
    };

    slots.sort();
    slots.dedup();
    slots
}

fn derive_slots(anchor: NaiveTime, step_seconds: u32) -> Vec<NaiveTime> {
    let anchor_seconds = anchor.num_seconds_from_midnight();
    let step = step_seconds.clamp(1, SECONDS_PER_DAY);
    (0..SECONDS_PER_DAY.div_ceil(step))
        .map(|i| (anchor_seconds + i * step) % SECONDS_PER_DAY)
        .filter_map(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0))
        .collect()
}

/// Build a timestamp for `date` + `time` in the offset of `reference`.
fn at_local(reference: &Timestamp, date: NaiveDate, time: NaiveTime) -> Timestamp {
    let offset = *reference.offset();
    let utc = date.and_time(time) - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}
