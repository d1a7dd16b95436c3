//! Barcode identity resolver.
//!
//! Wristbands and medication labels have been printed in several code generations over time.
//! Each generation is a variant of [`CodeGeneration`] with its own encoder per entity kind; a
//! scan resolves to the first generation whose encoding matches, so adding or retiring a format
//! is a change to one enum.

use crate::constants::{MEDICATION_CODE_MODULUS, MEDICATION_CODE_PREFIX, PATIENT_CODE_PREFIX};
use crate::medication::{Medication, Patient};
use serde::Serialize;

/// Generations of scan codes accepted at the bedside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeGeneration {
    /// The record identifier itself (patients also accept their patient number).
    RawIdentifier,
    /// Short fixed-form code: `PT…` for patients, `M…` for medications.
    Compact,
    /// `PT-{id}` / `MED-{id}`.
    LegacyShort,
    /// `PAT-{id}` / `RX-{id}`.
    LegacyLong,
}

impl CodeGeneration {
    /// All generations, in resolution order.
    pub const ALL: [CodeGeneration; 4] = [
        CodeGeneration::RawIdentifier,
        CodeGeneration::Compact,
        CodeGeneration::LegacyShort,
        CodeGeneration::LegacyLong,
    ];
}

/// Something that can be identified by a scanned code.
pub trait ScanTarget {
    /// Noun used in mismatch messages.
    const KIND: &'static str;

    /// Every code this target answers to under `generation`.
    fn encode(&self, generation: CodeGeneration) -> Vec<String>;
}

impl ScanTarget for Patient {
    const KIND: &'static str = "patient";

    fn encode(&self, generation: CodeGeneration) -> Vec<String> {
        match generation {
            CodeGeneration::RawIdentifier => {
                vec![self.id.clone(), self.patient_number.as_str().to_string()]
            }
            CodeGeneration::Compact => vec![derive_patient_code(self.patient_number.as_str())],
            CodeGeneration::LegacyShort => vec![format!("PT-{}", self.id)],
            CodeGeneration::LegacyLong => vec![format!("PAT-{}", self.id)],
        }
    }
}

impl ScanTarget for Medication {
    const KIND: &'static str = "medication";

    fn encode(&self, generation: CodeGeneration) -> Vec<String> {
        match generation {
            CodeGeneration::RawIdentifier => vec![self.id.clone()],
            CodeGeneration::Compact => {
                vec![derive_medication_code(self.name.as_str(), &self.id)]
            }
            CodeGeneration::LegacyShort => vec![format!("MED-{}", self.id)],
            CodeGeneration::LegacyLong => vec![format!("RX-{}", self.id)],
        }
    }
}

fn clean(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Derive the compact medication code: `M` + name initial (or `X`) + 5-digit id fold.
pub fn derive_medication_code(name: &str, id: &str) -> String {
    let initial = clean(name).chars().next().unwrap_or('X');
    let fold = clean(id).bytes().fold(0u32, |acc, b| {
        (acc * 37 + u32::from(b)) % MEDICATION_CODE_MODULUS
    });
    format!("{MEDICATION_CODE_PREFIX}{initial}{fold:05}")
}

/// Derive the compact patient code: `PT` + last 8 characters of the patient number, uppercased.
pub fn derive_patient_code(patient_number: &str) -> String {
    let upper = patient_number.trim().to_uppercase();
    let chars: Vec<char> = upper.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
    format!("{PATIENT_CODE_PREFIX}{tail}")
}

/// Which generation, if any, `scanned` belongs to for `target`.
///
/// Scanned input is trimmed and compared ASCII case-insensitively.
pub fn resolve<T: ScanTarget>(scanned: &str, target: &T) -> Option<CodeGeneration> {
    let scanned = scanned.trim();
    if scanned.is_empty() {
        return None;
    }

    CodeGeneration::ALL.into_iter().find(|generation| {
        target
            .encode(*generation)
            .iter()
            .any(|code| !code.is_empty() && code.eq_ignore_ascii_case(scanned))
    })
}

/// Whether `scanned` denotes `target` under any accepted generation.
pub fn matches<T: ScanTarget>(scanned: &str, target: &T) -> bool {
    resolve(scanned, target).is_some()
}

/// Validation triple returned to the charting forms.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanVerification {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Check one scanned code against its expected target.
///
/// Legacy generations are accepted but reported as a warning so label reprints can be chased.
pub fn check_scan<T: ScanTarget>(scanned: &str, target: &T, out: &mut ScanVerification) -> bool {
    match resolve(scanned, target) {
        Some(generation @ (CodeGeneration::LegacyShort | CodeGeneration::LegacyLong)) => {
            out.warnings.push(format!(
                "{} code '{}' uses a legacy label format ({:?})",
                T::KIND,
                scanned.trim(),
                generation
            ));
            true
        }
        Some(_) => true,
        None if scanned.trim().is_empty() => {
            out.errors.push(format!("{} code was not scanned", T::KIND));
            false
        }
        None => {
            out.errors.push(format!(
                "Scanned {} code '{}' does not match the selected {}",
                T::KIND,
                scanned.trim(),
                T::KIND
            ));
            false
        }
    }
}

/// Verify a patient scan and a medication scan together.
pub fn verify_scan(
    scanned_patient: &str,
    patient: &Patient,
    scanned_medication: &str,
    medication: &Medication,
) -> ScanVerification {
    let mut out = ScanVerification::default();
    let patient_ok = check_scan(scanned_patient, patient, &mut out);
    let medication_ok = check_scan(scanned_medication, medication, &mut out);
    out.is_valid = patient_ok && medication_ok;
    out
}
