//! Shared models and configuration for the SQLGate query safety gateway.
//!
//! This crate carries the types every other gateway crate depends on:
//! - Type-safe identifier wrappers ([`models::TableName`], [`models::RequesterId`])
//! - The gateway configuration tree with serde defaults and a TOML loader
//! - Configuration errors

pub mod config;
pub mod models;

pub use config::{ConfigError, GatewayConfig};
pub use models::{RequesterId, TableName};
