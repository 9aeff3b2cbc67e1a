//! Infrastructure adapters implementing the domain ports.

pub mod blob;
pub mod memory;
pub mod sqlite;
