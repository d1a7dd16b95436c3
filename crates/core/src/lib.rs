//! # hacCare Core
//!
//! Clinical rules behind the hacCare simulated electronic health record:
//!
//! - barcode code generations and scan resolution ([`barcode`])
//! - medication timing guards and next-due scheduling ([`dosing`], [`schedule`])
//! - the five-rights administration check ([`bcma`])
//! - lab reference ranges and flag classification ([`labs`])
//! - services that apply those rules against a record store ([`services`], [`store`])
//!
//! Rules are pure and take `now` from the caller. **No API concerns**: HTTP servers, headers
//! and authentication belong in `api-rest` and `api-shared`.

pub mod barcode;
pub mod bcma;
pub mod clinician;
pub mod config;
pub mod constants;
pub mod dosing;
pub mod error;
pub mod labs;
pub mod medication;
pub mod schedule;
pub mod services;
pub mod store;
pub mod validation;

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use haccare_types::{NonEmptyText, Sex, TextError};

/// Instant with the UTC offset it was recorded in.
pub type Timestamp = chrono::DateTime<chrono::FixedOffset>;
