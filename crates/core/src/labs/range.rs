//! Reference range data and effective bound resolution.

use haccare_types::Sex;
use serde::{Deserialize, Serialize};

/// How a reference range's bounds are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeOperator {
    /// Both `low` and `high` apply.
    #[serde(rename = "between")]
    Between,
    /// Only `low` applies.
    #[serde(rename = ">=")]
    AtLeast,
    /// Only `high` applies.
    #[serde(rename = "<=")]
    AtMost,
    /// Separate male and female bounds.
    #[serde(rename = "sex-specific")]
    SexSpecific,
}

impl RangeOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOperator::Between => "between",
            RangeOperator::AtLeast => ">=",
            RangeOperator::AtMost => "<=",
            RangeOperator::SexSpecific => "sex-specific",
        }
    }
}

/// A pair of optional bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
}

impl Bounds {
    pub fn new(low: Option<f64>, high: Option<f64>) -> Self {
        Self { low, high }
    }

    /// The widest interval covering both: min of lows, max of highs.
    ///
    /// A bound missing on one side is taken from the other.
    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            low: combine(self.low, other.low, f64::min),
            high: combine(self.high, other.high, f64::max),
        }
    }
}

fn combine(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(pick(x, y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Reference data for one lab test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub test_code: String,
    pub name: String,
    pub category: String,
    pub units: String,
    pub operator: RangeOperator,
    /// Raw bounds, used by every operator except `SexSpecific`.
    pub bounds: Bounds,
    pub male: Option<Bounds>,
    pub female: Option<Bounds>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
}

impl ReferenceRange {
    /// A `between` range with no critical bounds.
    pub fn between(test_code: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            test_code: test_code.into(),
            name: String::new(),
            category: String::new(),
            units: String::new(),
            operator: RangeOperator::Between,
            bounds: Bounds::new(Some(low), Some(high)),
            male: None,
            female: None,
            critical_low: None,
            critical_high: None,
        }
    }

    pub fn with_critical(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.critical_low = low;
        self.critical_high = high;
        self
    }

    /// The bounds that apply to a patient of the given sex under this range's operator.
    ///
    /// For sex-specific ranges an unknown sex gets the union of both, so nothing is
    /// under-flagged. Operators mask the side that does not apply.
    pub fn effective_bounds(&self, sex: Sex) -> Bounds {
        match self.operator {
            RangeOperator::Between => self.bounds,
            RangeOperator::AtLeast => Bounds::new(self.bounds.low, None),
            RangeOperator::AtMost => Bounds::new(None, self.bounds.high),
            RangeOperator::SexSpecific => {
                let male = self.male.unwrap_or(self.bounds);
                let female = self.female.unwrap_or(self.bounds);
                match sex {
                    Sex::Male => male,
                    Sex::Female => female,
                    Sex::Unknown => male.union(female),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn haemoglobin() -> ReferenceRange {
        ReferenceRange {
            operator: RangeOperator::SexSpecific,
            male: Some(Bounds::new(Some(70.0), Some(120.0))),
            female: Some(Bounds::new(Some(50.0), Some(90.0))),
            ..ReferenceRange::between("HGB", 0.0, 0.0)
        }
    }

    #[test]
    fn sex_specific_selects_by_sex() {
        let range = haemoglobin();
        assert_eq!(
            range.effective_bounds(Sex::Male),
            Bounds::new(Some(70.0), Some(120.0))
        );
        assert_eq!(
            range.effective_bounds(Sex::Female),
            Bounds::new(Some(50.0), Some(90.0))
        );
    }

    #[test]
    fn sex_specific_unknown_uses_union() {
        assert_eq!(
            haemoglobin().effective_bounds(Sex::Unknown),
            Bounds::new(Some(50.0), Some(120.0))
        );
    }

    #[test]
    fn operators_mask_unused_sides() {
        let mut range = ReferenceRange::between("X", 1.0, 2.0);
        range.operator = RangeOperator::AtLeast;
        assert_eq!(range.effective_bounds(Sex::Male), Bounds::new(Some(1.0), None));
        range.operator = RangeOperator::AtMost;
        assert_eq!(range.effective_bounds(Sex::Male), Bounds::new(None, Some(2.0)));
    }

    #[test]
    fn union_fills_missing_sides() {
        let a = Bounds::new(Some(3.0), None);
        let b = Bounds::new(None, Some(9.0));
        assert_eq!(a.union(b), Bounds::new(Some(3.0), Some(9.0)));
    }
}
