//! Domain layer for the printflow workflow engine
//!
//! Core models, the transition policy, errors and the storage ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, ErrorKind};
