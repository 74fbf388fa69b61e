//! Application layer: registry, hook pipeline and services
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod acl;
pub mod auth;
pub mod error;
pub mod error_ext;
pub mod gateway;
pub mod hooks;
pub mod password;
pub mod registry;
pub mod services;

pub use acl::AccessControlBuilder;
pub use auth::Auth;
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{DbResultExt, IoResultExt};
pub use gateway::TableGateway;
pub use hooks::{ErrorReporter, HookEmitter, TracingErrorReporter};
pub use registry::{ServiceArg, ServiceHandle, ServiceRegistry};
