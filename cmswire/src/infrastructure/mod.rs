//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod di;
pub mod embed;
pub mod error;
pub mod extensions;
pub mod mail;
pub mod memory;
pub mod traits;

pub use error::InfraError;
