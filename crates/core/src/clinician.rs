//! Authenticated clinician identity.
//!
//! The hosted backend authenticates users; this crate only receives the resulting identity and
//! copies it into audit fields (administered-by, entered-by, acknowledged-by).

use crate::{CoreError, CoreResult};
use haccare_types::NonEmptyText;
use serde::{Deserialize, Serialize};

/// Role of the acting user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicianRole {
    Nurse,
    Instructor,
    Admin,
    SuperAdmin,
}

impl std::str::FromStr for ClinicianRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "nurse" => Ok(Self::Nurse),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(CoreError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// The acting user, as supplied by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinician {
    pub user_id: NonEmptyText,
    pub name: NonEmptyText,
    pub role: ClinicianRole,
}

impl Clinician {
    pub fn new(user_id: &str, name: &str, role: &str) -> CoreResult<Self> {
        Ok(Self {
            user_id: NonEmptyText::new(user_id)?,
            name: NonEmptyText::new(name)?,
            role: role.parse()?,
        })
    }
}
