//! Dependency injection: service registration and request scopes

mod service_container;

pub use service_container::{RequestScope, ServiceContainer};
