//! # Painel Common Library
//!
//! Shared code for the results dashboard:
//! - Error type used by configuration and selection parsing
//! - Configuration loading (TOML bootstrap, credential store, upstream API settings)
//! - Assessment vocabulary (entity codes, subjects, grades, cycles, network classification)

pub mod config;
pub mod credentials;
pub mod error;
pub mod selection;

pub use credentials::CredentialStore;
pub use error::{Error, Result};
pub use selection::{AssessmentSelection, Cycle, EntityCode, EntityKind, Grade, Network, Subject};
