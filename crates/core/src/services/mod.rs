//! Stateful services over a [`RecordStore`](crate::store::RecordStore).
//!
//! Each service owns an `Arc` of the resolved [`CoreConfig`](crate::config::CoreConfig) and of the
//! store, so it can be cloned into request handlers cheaply.

mod labs;
mod medication;

pub use labs::{LabResult, LabService};
pub use medication::{
    AdministrationEvent, AdministrationOutcome, AdministrationRequest, MedicationService,
    NewMedication,
};
