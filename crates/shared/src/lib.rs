//! Shared types, errors, and configuration for Postline.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for posts, attachments and users
//! - Pagination types for feed endpoints
//! - Application-wide error types
//! - Configuration management
//! - JWT claims and token handling

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::Claims;
pub use config::{AppConfig, ReaperConfig, StorageSettings};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
