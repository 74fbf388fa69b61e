//! Domain layer: entities and business rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod acl;
pub mod entities;
pub mod error;
pub mod events;
pub mod payload;

pub use acl::{AclSnapshot, Permission, PrivilegeSet};
pub use entities::*;
pub use error::DomainError;
pub use payload::Payload;
