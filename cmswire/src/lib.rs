//! cmswire: service registry and hook pipeline for a content-management backend
//!
//! Layers:
//! - `domain`: payloads, events, permission snapshots
//! - `application`: registry, hook emitter, table gateway, handler library
//! - `infrastructure`: I/O boundaries, in-process implementations, DI container
//! - `cli`: the `cmswire` inspection binary

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
