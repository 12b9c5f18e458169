//! # DataBridge Common Library
//!
//! Shared code for the DataBridge backend including:
//! - Error types
//! - Configuration loading
//! - Database initialization and schema
//! - Settings key-value accessors

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
