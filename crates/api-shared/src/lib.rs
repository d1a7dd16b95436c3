//! # API Shared
//!
//! Shared definitions for the hacCare outer surfaces.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - `HealthService`
//! - API key validation
//!
//! Used by `api-rest` and the workspace runner.

pub mod auth;
pub mod dto;
pub mod health;

pub use health::HealthService;
