//! Shared types, errors, and configuration for Bursar.
//!
//! This crate provides common building blocks used by every other crate:
//! - Typed IDs for tenants, actors, students, fees, ledger records and audit entries
//! - Application-wide error type with HTTP mapping
//! - Configuration loading
//! - Bearer token claims and verification

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtError, JwtService, JwtSettings};
