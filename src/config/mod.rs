//! # Configuration Module
//!
//! Runtime settings shared by the CLI and the library entry points.

pub mod config;

pub use config::{LensConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
