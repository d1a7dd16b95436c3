//! Lab reference range catalogue.
//!
//! Immutable reference data keyed by unique test code, loaded from YAML. The wire schema is
//! strict (`deny_unknown_fields`) and schema errors carry the failing path, e.g.
//! `tests[3].critical_low`.
//!
//! Responsibilities:
//! - Parse the YAML wire model and translate it to [`ReferenceRange`] values
//! - Validate each entry against its operator (required bounds, ordering)
//! - Reject duplicate test codes

use super::range::{Bounds, RangeOperator, ReferenceRange};
use crate::constants::DEFAULT_LAB_CATALOGUE_YAML;
use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Reference ranges keyed by upper-cased test code.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabCatalogue {
    ranges: BTreeMap<String, ReferenceRange>,
}

impl LabCatalogue {
    /// The catalogue bundled with the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled YAML is malformed, which the tests guard against.
    pub fn builtin() -> CoreResult<Self> {
        Self::parse(DEFAULT_LAB_CATALOGUE_YAML)
    }

    /// Parse a catalogue from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Catalogue`] if:
    /// - the YAML does not match the wire schema (unknown keys, wrong types),
    /// - an entry is missing a bound its operator requires,
    /// - a lower bound exceeds its upper bound,
    /// - a test code appears twice.
    pub fn parse(yaml_text: &str) -> CoreResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire = match serde_path_to_error::deserialize::<_, CatalogueWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(CoreError::Catalogue(format!(
                    "lab catalogue schema mismatch at {path}: {source}"
                )));
            }
        };

        let mut ranges = BTreeMap::new();
        for entry in wire.tests {
            let range = wire_to_domain(entry)?;
            let key = range.test_code.to_ascii_uppercase();
            if ranges.contains_key(&key) {
                return Err(CoreError::Catalogue(format!(
                    "duplicate test code: {}",
                    range.test_code
                )));
            }
            ranges.insert(key, range);
        }

        Ok(Self { ranges })
    }

    /// Load and parse a catalogue file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CoreError::FileRead)?;
        Self::parse(&text)
    }

    /// Render the catalogue back to YAML.
    pub fn render(&self) -> CoreResult<String> {
        let wire = CatalogueWire {
            tests: self.ranges.values().map(domain_to_wire).collect(),
        };
        serde_yaml::to_string(&wire)
            .map_err(|e| CoreError::Catalogue(format!("failed to serialise catalogue: {e}")))
    }

    /// Look up a test by code (case-insensitive).
    pub fn get(&self, test_code: &str) -> Option<&ReferenceRange> {
        self.ranges.get(&test_code.trim().to_ascii_uppercase())
    }

    /// Look up a test, failing with [`CoreError::UnknownLabTest`].
    pub fn require(&self, test_code: &str) -> CoreResult<&ReferenceRange> {
        self.get(test_code)
            .ok_or_else(|| CoreError::UnknownLabTest(test_code.trim().to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceRange> {
        self.ranges.values()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct CatalogueWire {
    tests: Vec<RangeWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RangeWire {
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    units: String,
    operator: RangeOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    male: Option<BoundsWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    female: Option<BoundsWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    critical_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    critical_high: Option<f64>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct BoundsWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    high: Option<f64>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: RangeWire) -> CoreResult<ReferenceRange> {
    let code = wire.code.trim().to_string();
    if code.is_empty() {
        return Err(CoreError::Catalogue("test code cannot be empty".into()));
    }

    let invalid = |msg: &str| CoreError::Catalogue(format!("{code}: {msg}"));

    let bounds = Bounds::new(wire.low, wire.high);
    let male = wire.male.map(|b| Bounds::new(b.low, b.high));
    let female = wire.female.map(|b| Bounds::new(b.low, b.high));

    match wire.operator {
        RangeOperator::Between if bounds.low.is_none() || bounds.high.is_none() => {
            return Err(invalid("'between' requires both low and high"));
        }
        RangeOperator::AtLeast if bounds.low.is_none() => {
            return Err(invalid("'>=' requires low"));
        }
        RangeOperator::AtMost if bounds.high.is_none() => {
            return Err(invalid("'<=' requires high"));
        }
        RangeOperator::SexSpecific if male.is_none() || female.is_none() => {
            return Err(invalid("'sex-specific' requires male and female bounds"));
        }
        _ => {}
    }

    for candidate in [Some(bounds), male, female].into_iter().flatten() {
        if let (Some(low), Some(high)) = (candidate.low, candidate.high) {
            if low > high {
                return Err(invalid("low bound exceeds high bound"));
            }
        }
    }

    if let (Some(low), Some(high)) = (wire.critical_low, wire.critical_high) {
        if low > high {
            return Err(invalid("critical_low exceeds critical_high"));
        }
    }

    Ok(ReferenceRange {
        test_code: code,
        name: wire.name,
        category: wire.category,
        units: wire.units,
        operator: wire.operator,
        bounds,
        male,
        female,
        critical_low: wire.critical_low,
        critical_high: wire.critical_high,
    })
}

fn domain_to_wire(range: &ReferenceRange) -> RangeWire {
    let to_wire = |b: Bounds| BoundsWire {
        low: b.low,
        high: b.high,
    };
    RangeWire {
        code: range.test_code.clone(),
        name: range.name.clone(),
        category: range.category.clone(),
        units: range.units.clone(),
        operator: range.operator,
        low: range.bounds.low,
        high: range.bounds.high,
        male: range.male.map(to_wire),
        female: range.female.map(to_wire),
        critical_low: range.critical_low,
        critical_high: range.critical_high,
    }
}
