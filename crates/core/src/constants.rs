//! Constants used throughout the hacCare core crate.
//!
//! Policy defaults live here so the dosing, scheduling and config modules agree on them.

/// Minutes before `next_due` within which an administration only raises an early warning.
pub const DEFAULT_EARLY_WINDOW_MINUTES: i64 = 30;

/// Minimum interval applied to frequency labels missing from the policy table.
pub const DEFAULT_MINIMUM_INTERVAL_MINUTES: i64 = 6 * 60;

/// Administration time used when a medication has no configured time of day.
pub const DEFAULT_ADMIN_TIME: &str = "08:00";

/// Built-in lab reference range catalogue.
pub const DEFAULT_LAB_CATALOGUE_YAML: &str = include_str!("../data/lab_ranges.yaml");

/// Upper bound on tenant identifier length.
pub const MAX_TENANT_ID_LEN: usize = 253;

/// Prefix of derived patient scan codes.
pub const PATIENT_CODE_PREFIX: &str = "PT";

/// Prefix of derived medication scan codes.
pub const MEDICATION_CODE_PREFIX: &str = "M";

/// Modulus of the medication identifier fold; also fixes the 5-digit width.
pub const MEDICATION_CODE_MODULUS: u32 = 100_000;
