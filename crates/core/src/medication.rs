//! Medication orders and the frequency vocabulary.
//!
//! Frequencies arrive as the labels the charting forms offer ("Once daily", "Every 6 hours",
//! "As needed (PRN)", ...). They are parsed into [`Frequency`] so the dosing guard and the
//! scheduler match on variants instead of strings. Labels outside the vocabulary are preserved
//! in [`Frequency::Other`] and handled by the documented fallbacks.

use crate::Timestamp;
use chrono::{Duration, NaiveDate, NaiveTime};
use haccare_types::{NonEmptyText, Sex};
use serde::{Deserialize, Serialize};

/// How often a medication is given.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Frequency {
    OnceDaily,
    TwiceDaily,
    ThreeTimesDaily,
    FourTimesDaily,
    /// "Every N hours".
    EveryHours(u32),
    /// "As needed (PRN)".
    AsNeeded,
    Continuous,
    /// A label outside the vocabulary, kept verbatim.
    Other(String),
}

impl Frequency {
    /// The labels the charting forms offer.
    pub const VOCABULARY: [Frequency; 10] = [
        Frequency::OnceDaily,
        Frequency::TwiceDaily,
        Frequency::ThreeTimesDaily,
        Frequency::FourTimesDaily,
        Frequency::EveryHours(4),
        Frequency::EveryHours(6),
        Frequency::EveryHours(8),
        Frequency::EveryHours(12),
        Frequency::AsNeeded,
        Frequency::Continuous,
    ];

    /// Parse a frequency label. Never fails; unknown labels become [`Frequency::Other`].
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "once daily" | "daily" | "qd" => Frequency::OnceDaily,
            "twice daily" | "bid" => Frequency::TwiceDaily,
            "three times daily" | "tid" => Frequency::ThreeTimesDaily,
            "four times daily" | "qid" => Frequency::FourTimesDaily,
            "as needed (prn)" | "as needed" | "prn" => Frequency::AsNeeded,
            "continuous" => Frequency::Continuous,
            _ => parse_every_hours(&lower)
                .map(Frequency::EveryHours)
                .unwrap_or_else(|| Frequency::Other(trimmed.to_string())),
        }
    }

    /// Canonical label, as stored and as used for policy table lookups.
    pub fn label(&self) -> String {
        match self {
            Frequency::OnceDaily => "Once daily".into(),
            Frequency::TwiceDaily => "Twice daily".into(),
            Frequency::ThreeTimesDaily => "Three times daily".into(),
            Frequency::FourTimesDaily => "Four times daily".into(),
            Frequency::EveryHours(1) => "Every 1 hour".into(),
            Frequency::EveryHours(n) => format!("Every {n} hours"),
            Frequency::AsNeeded => "As needed (PRN)".into(),
            Frequency::Continuous => "Continuous".into(),
            Frequency::Other(label) => label.clone(),
        }
    }

    /// The nominal interval between doses, if the frequency implies one.
    pub fn nominal_interval(&self) -> Option<Duration> {
        match self {
            Frequency::OnceDaily => Some(Duration::hours(24)),
            Frequency::TwiceDaily => Some(Duration::hours(12)),
            Frequency::ThreeTimesDaily => Some(Duration::hours(8)),
            Frequency::FourTimesDaily => Some(Duration::hours(6)),
            Frequency::EveryHours(n) if *n > 0 => Some(Duration::hours(i64::from(*n))),
            _ => None,
        }
    }

    /// Doses per day for the fixed daily frequencies.
    pub fn doses_per_day(&self) -> Option<u32> {
        match self {
            Frequency::OnceDaily => Some(1),
            Frequency::TwiceDaily => Some(2),
            Frequency::ThreeTimesDaily => Some(3),
            Frequency::FourTimesDaily => Some(4),
            _ => None,
        }
    }
}

fn parse_every_hours(lower: &str) -> Option<u32> {
    let rest = lower.strip_prefix("every ")?;
    let rest = rest
        .strip_suffix(" hours")
        .or_else(|| rest.strip_suffix(" hour"))
        .or_else(|| rest.strip_suffix("h"))?;
    rest.trim().parse::<u32>().ok().filter(|n| *n > 0 && *n <= 24)
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Frequency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Frequency::parse(&s))
    }
}

/// Medication category as recorded on the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicationCategory {
    #[default]
    Scheduled,
    Unscheduled,
    Prn,
    Continuous,
}

impl MedicationCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "unscheduled" => Some(Self::Unscheduled),
            "prn" => Some(Self::Prn),
            "continuous" => Some(Self::Continuous),
            _ => None,
        }
    }
}

/// A medication order on a patient's MAR.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub patient_id: String,
    pub name: NonEmptyText,
    pub dosage: NonEmptyText,
    pub route: NonEmptyText,
    pub frequency: Frequency,
    #[serde(default)]
    pub category: MedicationCategory,
    #[serde(default)]
    pub admin_times: Vec<NaiveTime>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_administered: Option<Timestamp>,
    #[serde(default)]
    pub next_due: Option<Timestamp>,
}

/// The subset of a patient record the medication and lab rules need.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    /// Human-readable identifier printed on the wristband, e.g. `PT12345`.
    pub patient_number: NonEmptyText,
    pub name: NonEmptyText,
    #[serde(default)]
    pub sex: Sex,
}
