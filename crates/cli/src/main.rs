use clap::{Parser, Subcommand};
use haccare_core::barcode::{check_scan, derive_medication_code, derive_patient_code, ScanVerification};
use haccare_core::config::load_policy;
use haccare_core::dosing::DosingPolicy;
use haccare_core::labs::{classify, LabCatalogue};
use haccare_core::medication::{Frequency, Medication, MedicationCategory, Patient};
use haccare_core::schedule::compute_next_due;
use haccare_core::validation::{now, parse_date, parse_optional_timestamp, parse_time_of_day};
use haccare_core::{CoreError, CoreResult, NonEmptyText, Sex, Timestamp};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "haccare")]
#[command(about = "hacCare clinical rules CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compact label code for a medication
    MedicationCode {
        /// Medication name
        name: String,
        /// Medication record id
        id: String,
    },
    /// Print the compact wristband code for a patient
    PatientCode {
        /// Patient number, e.g. PT12345
        patient_number: String,
    },
    /// Check a scanned code against a patient or a medication
    Match {
        /// The scanned code
        scanned: String,
        /// Patient record id
        #[arg(long, requires = "patient_number", conflicts_with = "medication_id")]
        patient_id: Option<String>,
        /// Patient number
        #[arg(long)]
        patient_number: Option<String>,
        /// Medication record id
        #[arg(long, requires = "medication_name")]
        medication_id: Option<String>,
        /// Medication name
        #[arg(long)]
        medication_name: Option<String>,
    },
    /// Decide whether a dose may be given now
    CheckTiming {
        /// Frequency label, e.g. "Every 6 hours"
        #[arg(long)]
        frequency: String,
        /// scheduled, unscheduled, prn or continuous
        #[arg(long)]
        category: Option<String>,
        /// RFC 3339 next-due time
        #[arg(long)]
        next_due: Option<String>,
        /// RFC 3339 time of the last dose
        #[arg(long)]
        last_administered: Option<String>,
        /// RFC 3339 evaluation time (defaults to the current time)
        #[arg(long)]
        now: Option<String>,
        /// YAML dosing policy overrides
        #[arg(long)]
        policy: Option<PathBuf>,
    },
    /// Compute when a medication is next due
    NextDue {
        /// Frequency label, e.g. "Twice daily"
        #[arg(long)]
        frequency: String,
        /// Administration time (HH:MM); repeat for several
        #[arg(long = "admin-time")]
        admin_times: Vec<String>,
        /// First day of the order (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,
        /// RFC 3339 evaluation time (defaults to the current time)
        #[arg(long)]
        now: Option<String>,
        /// YAML dosing policy overrides
        #[arg(long)]
        policy: Option<PathBuf>,
    },
    /// Classify a lab value against its reference range
    LabFlag {
        /// Test code, e.g. K
        test_code: String,
        /// Measured value
        value: f64,
        /// male, female or unknown
        #[arg(long)]
        sex: Option<String>,
        /// YAML lab catalogue (defaults to the built-in one)
        #[arg(long)]
        catalogue: Option<PathBuf>,
    },
    /// List the lab reference range catalogue
    LabTests {
        /// YAML lab catalogue (defaults to the built-in one)
        #[arg(long)]
        catalogue: Option<PathBuf>,
        /// Print the catalogue as YAML, in the format `--catalogue` accepts
        #[arg(long)]
        yaml: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::MedicationCode { name, id }) => {
            println!("{}", derive_medication_code(&name, &id));
        }
        Some(Commands::PatientCode { patient_number }) => {
            println!("{}", derive_patient_code(&patient_number));
        }
        Some(Commands::Match {
            scanned,
            patient_id,
            patient_number,
            medication_id,
            medication_name,
        }) => {
            let mut out = ScanVerification::default();
            out.is_valid = match (patient_id, patient_number, medication_id, medication_name) {
                (Some(id), Some(number), _, _) => {
                    let patient = Patient {
                        id,
                        patient_number: NonEmptyText::new(number)?,
                        name: NonEmptyText::new("scanned patient")?,
                        sex: Sex::Unknown,
                    };
                    check_scan(&scanned, &patient, &mut out)
                }
                (_, _, Some(id), Some(name)) => {
                    let medication = scan_medication(id, &name)?;
                    check_scan(&scanned, &medication, &mut out)
                }
                _ => {
                    return Err(CoreError::InvalidInput(
                        "pass --patient-id/--patient-number or --medication-id/--medication-name"
                            .into(),
                    )
                    .into())
                }
            };
            print_verification(&out);
            if !out.is_valid {
                std::process::exit(1);
            }
        }
        Some(Commands::CheckTiming {
            frequency,
            category,
            next_due,
            last_administered,
            now: at,
            policy,
        }) => {
            let policy = policy_from(policy.as_deref())?;
            let category = match category {
                Some(c) => MedicationCategory::parse(&c).ok_or_else(|| {
                    CoreError::InvalidInput(format!("unknown medication category: {c}"))
                })?,
                None => MedicationCategory::default(),
            };
            let decision = policy.validate_timing(
                evaluation_time(at.as_deref())?,
                parse_optional_timestamp(next_due.as_deref())?,
                parse_optional_timestamp(last_administered.as_deref())?,
                &Frequency::parse(&frequency),
                category,
            );
            match decision.reason() {
                Some(reason) => println!("{reason}"),
                None => println!("OK: {decision:?}"),
            }
            if !decision.is_ok() {
                std::process::exit(1);
            }
        }
        Some(Commands::NextDue {
            frequency,
            admin_times,
            start_date,
            now: at,
            policy,
        }) => {
            let policy = policy_from(policy.as_deref())?;
            let admin_times = admin_times
                .iter()
                .map(|t| parse_time_of_day(t))
                .collect::<CoreResult<Vec<_>>>()?;
            let start_date = start_date.as_deref().map(parse_date).transpose()?;
            let due = compute_next_due(
                &Frequency::parse(&frequency),
                start_date,
                &admin_times,
                evaluation_time(at.as_deref())?,
                &policy,
            );
            println!("{}", due.to_rfc3339());
        }
        Some(Commands::LabFlag {
            test_code,
            value,
            sex,
            catalogue,
        }) => {
            let catalogue = catalogue_from(catalogue.as_deref())?;
            let range = catalogue.require(&test_code)?;
            let sex = sex.as_deref().map(Sex::parse_lenient).unwrap_or_default();
            let flag = classify(Some(value), range, sex);
            println!("{} {} {}: {}", range.test_code, value, range.units, flag);
        }
        Some(Commands::LabTests { catalogue, yaml }) => {
            let catalogue = catalogue_from(catalogue.as_deref())?;
            if yaml {
                print!("{}", catalogue.render()?);
                return Ok(());
            }
            for range in catalogue.iter() {
                let bounds = range.effective_bounds(Sex::Unknown);
                println!(
                    "{:<6} {:<24} {:<14} {:<12} low={:?} high={:?} critical=({:?}, {:?})",
                    range.test_code,
                    range.name,
                    range.units,
                    range.operator.as_str(),
                    bounds.low,
                    bounds.high,
                    range.critical_low,
                    range.critical_high
                );
            }
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

fn evaluation_time(value: Option<&str>) -> CoreResult<Timestamp> {
    Ok(parse_optional_timestamp(value)?.unwrap_or_else(now))
}

fn policy_from(path: Option<&Path>) -> CoreResult<DosingPolicy> {
    match path {
        Some(path) => load_policy(path),
        None => Ok(DosingPolicy::default()),
    }
}

fn catalogue_from(path: Option<&Path>) -> CoreResult<LabCatalogue> {
    match path {
        Some(path) => LabCatalogue::load(path),
        None => LabCatalogue::builtin(),
    }
}

/// A medication carrying only the fields the barcode encoders read.
fn scan_medication(id: String, name: &str) -> CoreResult<Medication> {
    let placeholder = NonEmptyText::new("-")?;
    Ok(Medication {
        id,
        patient_id: String::new(),
        name: NonEmptyText::new(name)?,
        dosage: placeholder.clone(),
        route: placeholder,
        frequency: Frequency::AsNeeded,
        category: MedicationCategory::default(),
        admin_times: Vec::new(),
        start_date: None,
        last_administered: None,
        next_due: None,
    })
}

fn print_verification(out: &ScanVerification) {
    println!("{}", if out.is_valid { "MATCH" } else { "NO MATCH" });
    for warning in &out.warnings {
        println!("warning: {warning}");
    }
    for error in &out.errors {
        println!("error: {error}");
    }
}
