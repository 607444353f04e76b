//! # CPA demo library
//!
//! Demonstrates a Cross-Platform Authentication (CPA) token provider driven
//! from two screens: a domain list and a domain detail view.
//!
//! Modules:
//! - `config`: demo configuration, loading and validation
//! - `cache`: tokens, client identity and the token store
//! - `provider`: provider trait, CPA implementation, request handles
//! - `ui`: bootstrap, domain list, domain detail, terminal shell

pub mod cache;
pub mod config;
pub mod helpers;
pub mod observability;
pub mod provider;
pub mod resilience;
pub mod ui;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::settings::DemoConfig;
pub use crate::provider::TokenProvider;
