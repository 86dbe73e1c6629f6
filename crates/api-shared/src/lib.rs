//! # API Shared
//!
//! Shared utilities and definitions for MediBook APIs.
//!
//! Contains:
//! - Wire types (`dto` module) with their OpenAPI schemas
//! - Bearer token issuing and verification (`token` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `medibook-run` binary.

pub mod dto;
pub mod health;
pub mod token;

pub use health::HealthService;
pub use token::{Claims, TokenError, TokenService};
