//! Dosing-interval guard.
//!
//! Decides whether an administration attempt is acceptable now, given the medication's
//! frequency, category, last-administered timestamp and scheduled next-due timestamp.
//!
//! The minimum-interval table is deliberately shorter than the nominal dosing interval so that
//! schedule drift does not block a legitimate dose while a double dose is still refused. Both the
//! table and the early window are policy, carried by [`DosingPolicy`] and overridable through the
//! policy file (see [`crate::config`]).

use crate::constants::{
    DEFAULT_ADMIN_TIME, DEFAULT_EARLY_WINDOW_MINUTES, DEFAULT_MINIMUM_INTERVAL_MINUTES,
};
use crate::medication::{Frequency, MedicationCategory};
use crate::Timestamp;
use chrono::{Duration, NaiveTime};
use std::collections::BTreeMap;

/// Policy parameters for the dosing guard and the next-due scheduler.
#[derive(Clone, Debug, PartialEq)]
pub struct DosingPolicy {
    early_window: Duration,
    default_minimum_interval: Duration,
    default_admin_time: NaiveTime,
    /// Minimum interval keyed by canonical frequency label.
    minimum_intervals: BTreeMap<String, Duration>,
}

impl Default for DosingPolicy {
    fn default() -> Self {
        let table = [
            (Frequency::OnceDaily, 20 * 60),
            (Frequency::TwiceDaily, 10 * 60),
            (Frequency::ThreeTimesDaily, 6 * 60),
            (Frequency::FourTimesDaily, 4 * 60),
            (Frequency::EveryHours(4), 3 * 60),
            (Frequency::EveryHours(6), 4 * 60),
            (Frequency::EveryHours(8), 6 * 60),
            (Frequency::EveryHours(12), 10 * 60),
            (Frequency::Continuous, 0),
        ];

        Self {
            early_window: Duration::minutes(DEFAULT_EARLY_WINDOW_MINUTES),
            default_minimum_interval: Duration::minutes(DEFAULT_MINIMUM_INTERVAL_MINUTES),
            default_admin_time: NaiveTime::parse_from_str(DEFAULT_ADMIN_TIME, "%H:%M")
                .unwrap_or_default(),
            minimum_intervals: table
                .into_iter()
                .map(|(f, minutes)| (f.label(), Duration::minutes(minutes)))
                .collect(),
        }
    }
}

impl DosingPolicy {
    pub fn early_window(&self) -> Duration {
        self.early_window
    }

    pub fn default_admin_time(&self) -> NaiveTime {
        self.default_admin_time
    }

    pub fn default_minimum_interval(&self) -> Duration {
        self.default_minimum_interval
    }

    pub fn with_early_window(mut self, window: Duration) -> Self {
        self.early_window = window;
        self
    }

    pub fn with_default_minimum_interval(mut self, interval: Duration) -> Self {
        self.default_minimum_interval = interval;
        self
    }

    pub fn with_default_admin_time(mut self, time: NaiveTime) -> Self {
        self.default_admin_time = time;
        self
    }

    /// Override (or add) the minimum interval for one frequency.
    pub fn with_minimum_interval(mut self, frequency: &Frequency, interval: Duration) -> Self {
        self.minimum_intervals.insert(frequency.label(), interval);
        self
    }

    /// Minimum wait since the last dose before another dose of this frequency is allowed.
    ///
    /// Labels missing from the table fall back to the default minimum interval (6 hours unless
    /// configured otherwise).
    pub fn minimum_interval(&self, frequency: &Frequency) -> Duration {
        self.minimum_intervals
            .get(&frequency.label())
            .copied()
            .unwrap_or(self.default_minimum_interval)
    }

    /// Decide whether a dose may be given at `now`.
    ///
    /// Checks run in order: unconstrained (PRN by category or by frequency, or no next-due), too
    /// soon since the last dose, early relative to next-due, on time.
    pub fn validate_timing(
        &self,
        now: Timestamp,
        next_due: Option<Timestamp>,
        last_administered: Option<Timestamp>,
        frequency: &Frequency,
        category: MedicationCategory,
    ) -> TimingDecision {
        let prn = category == MedicationCategory::Prn || *frequency == Frequency::AsNeeded;
        let next_due = match next_due {
            Some(due) if !prn => due,
            _ => return TimingDecision::Unconstrained,
        };

        if let Some(last) = last_administered {
            let elapsed = now.signed_duration_since(last);
            let minimum = self.minimum_interval(frequency);
            if elapsed < minimum {
                let remaining = (minimum - elapsed).num_seconds();
                return TimingDecision::TooSoon {
                    remaining_hours: ceil_div(remaining, 3600),
                };
            }
        }

        if now < next_due {
            let early = next_due.signed_duration_since(now);
            return TimingDecision::Early {
                minutes_early: ceil_div(early.num_seconds(), 60),
                within_window: early <= self.early_window,
            };
        }

        TimingDecision::OnTime
    }
}

fn ceil_div(value: i64, unit: i64) -> i64 {
    (value + unit - 1).div_euclid(unit)
}

/// Outcome of [`DosingPolicy::validate_timing`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimingDecision {
    /// PRN, or nothing scheduled: no timing constraint applies.
    Unconstrained,
    OnTime,
    /// Before next-due. Accepted with a warning.
    Early {
        minutes_early: i64,
        /// Whether the dose falls inside the configured early window.
        within_window: bool,
    },
    /// Inside the minimum interval since the last dose. Blocking.
    TooSoon { remaining_hours: i64 },
}

impl TimingDecision {
    /// Whether the administration may proceed without an override.
    pub fn is_ok(&self) -> bool {
        !matches!(self, TimingDecision::TooSoon { .. })
    }

    /// Human-readable reason, present for warnings and rejections.
    pub fn reason(&self) -> Option<String> {
        match self {
            TimingDecision::Unconstrained | TimingDecision::OnTime => None,
            TimingDecision::Early {
                minutes_early,
                within_window: true,
            } => Some(format!(
                "Administering early: {minutes_early} minute(s) before scheduled time"
            )),
            TimingDecision::Early {
                minutes_early,
                within_window: false,
            } => Some(format!(
                "Administering early: {minutes_early} minute(s) before scheduled time, outside the early administration window"
            )),
            TimingDecision::TooSoon { remaining_hours } => Some(format!(
                "Too soon since last dose: wait at least {remaining_hours} more hour(s)"
            )),
        }
    }

    /// True for an accepted-with-warning outcome.
    pub fn is_warning(&self) -> bool {
        matches!(self, TimingDecision::Early { .. })
    }
}
