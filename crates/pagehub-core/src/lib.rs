//! # pagehub-core
//!
//! Core crate for PageHub. Contains the unified error system, configuration
//! schemas, logging initialisation and the content traits consumed by the
//! event core.
//!
//! This crate has **no** internal dependencies on other PageHub crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
