//! Lab flag classifier.
//!
//! A pure decision evaluated in strict order: absent value, critical low, critical high,
//! abnormal low, abnormal high, normal. Critical bounds always win over reference bounds, and
//! abnormal checks only fire for a side the range operator actually applies.

use super::range::ReferenceRange;
use haccare_types::Sex;
use serde::{Deserialize, Serialize};

/// Classification of a lab value relative to its reference range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabFlag {
    Normal,
    AbnormalHigh,
    AbnormalLow,
    CriticalHigh,
    CriticalLow,
}

impl LabFlag {
    pub fn is_critical(&self) -> bool {
        matches!(self, LabFlag::CriticalHigh | LabFlag::CriticalLow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabFlag::Normal => "normal",
            LabFlag::AbnormalHigh => "abnormal_high",
            LabFlag::AbnormalLow => "abnormal_low",
            LabFlag::CriticalHigh => "critical_high",
            LabFlag::CriticalLow => "critical_low",
        }
    }
}

impl std::fmt::Display for LabFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `value` against `range` for a patient of the given sex.
///
/// An absent or non-finite value is `Normal`: "not yet measured" has nothing to flag. Callers
/// must not read that as an actually-normal result.
pub fn classify(value: Option<f64>, range: &ReferenceRange, sex: Sex) -> LabFlag {
    let value = match value {
        Some(v) if v.is_finite() => v,
        _ => return LabFlag::Normal,
    };

    let bounds = range.effective_bounds(sex);

    if range.critical_low.is_some_and(|critical| value < critical) {
        return LabFlag::CriticalLow;
    }
    if range.critical_high.is_some_and(|critical| value > critical) {
        return LabFlag::CriticalHigh;
    }
    if bounds.low.is_some_and(|low| value < low) {
        return LabFlag::AbnormalLow;
    }
    if bounds.high.is_some_and(|high| value > high) {
        return LabFlag::AbnormalHigh;
    }

    LabFlag::Normal
}
