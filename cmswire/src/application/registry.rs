//! Lazy service registry
//!
//! Maps a `ServiceName` to a factory. The first non-fresh `resolve` runs the
//! factory and caches its value; later calls return the cached value. A fresh
//! resolve always runs the factory and leaves the cache untouched.
//!
//! Factories receive the registry and may resolve their own dependencies.
//! The chain of services under construction is tracked per thread, so a
//! factory that transitively needs itself fails with `CircularDependency`
//! instead of recursing without bound.
//!
//! Two threads can still close a cycle between them: each owns one cached
//! initialization and blocks on the other's. Every blocked thread records
//! which service it waits on, and a thread about to block first follows
//! owner -> awaited service -> owner. Reaching itself means the wait would
//! never end, so it fails with `CircularDependency` instead.

use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::ServiceName;

/// A constructed service. Concrete types are recovered with `get::<T>`.
pub type ServiceHandle = Arc<dyn Any + Send + Sync>;

/// Optional argument handed to a factory.
pub type ServiceArg = Value;

pub type Factory = Box<
    dyn Fn(&ServiceRegistry, Option<&ServiceArg>) -> ApplicationResult<ServiceHandle>
        + Send
        + Sync,
>;

struct ServiceEntry {
    factory: Factory,
    cached: OnceCell<ServiceHandle>,
}

pub struct ServiceRegistry {
    entries: HashMap<ServiceName, ServiceEntry>,
    building: Mutex<BuildState>,
}

#[derive(Default)]
struct BuildState {
    /// Services under construction, per thread, outermost first
    chains: HashMap<ThreadId, Vec<ServiceName>>,
    /// Thread running the cached initialization of a service
    owners: HashMap<ServiceName, ThreadId>,
    /// Service whose cached initialization a thread is blocked on
    waiting: HashMap<ThreadId, ServiceName>,
}

/// Pops the service off the construction chain when construction ends.
struct BuildGuard<'a> {
    building: &'a Mutex<BuildState>,
    thread: ThreadId,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.building.lock();
        if let Some(chain) = state.chains.get_mut(&self.thread) {
            chain.pop();
            if chain.is_empty() {
                state.chains.remove(&self.thread);
            }
        }
    }
}

/// Clears the thread's wait record once it stops waiting on `name`.
struct WaitGuard<'a> {
    building: &'a Mutex<BuildState>,
    thread: ThreadId,
    name: ServiceName,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.building.lock();
        if state.waiting.get(&self.thread) == Some(&self.name) {
            state.waiting.remove(&self.thread);
        }
    }
}

/// Marks the thread as owner of a cached initialization while it runs.
struct OwnerGuard<'a> {
    building: &'a Mutex<BuildState>,
    name: ServiceName,
}

impl<'a> OwnerGuard<'a> {
    fn acquire(building: &'a Mutex<BuildState>, name: ServiceName) -> Self {
        let thread = thread::current().id();
        let mut state = building.lock();
        state.owners.insert(name, thread);
        state.waiting.remove(&thread);
        Self { building, name }
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.building.lock().owners.remove(&self.name);
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            building: Mutex::new(BuildState::default()),
        }
    }

    /// Register (or replace) the factory for a service.
    pub fn register<F>(&mut self, name: ServiceName, factory: F)
    where
        F: Fn(&ServiceRegistry, Option<&ServiceArg>) -> ApplicationResult<ServiceHandle>
            + Send
            + Sync
            + 'static,
    {
        debug!("register service: {}", name);
        self.entries.insert(
            name,
            ServiceEntry {
                factory: Box::new(factory),
                cached: OnceCell::new(),
            },
        );
    }

    pub fn is_registered(&self, name: ServiceName) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn is_cached(&self, name: ServiceName) -> bool {
        self.entries
            .get(&name)
            .map(|e| e.cached.get().is_some())
            .unwrap_or(false)
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<ServiceName> {
        let mut names: Vec<ServiceName> = self.entries.keys().copied().collect();
        names.sort();
        names
    }

    /// Resolve a service by its string name (case-insensitive).
    pub fn resolve_by_name(
        &self,
        name: &str,
        arg: Option<&ServiceArg>,
        fresh: bool,
    ) -> ApplicationResult<ServiceHandle> {
        let service = ServiceName::parse(name)
            .ok_or_else(|| ApplicationError::UnknownService(name.to_string()))?;
        self.resolve(service, arg, fresh)
    }

    pub fn resolve(
        &self,
        name: ServiceName,
        arg: Option<&ServiceArg>,
        fresh: bool,
    ) -> ApplicationResult<ServiceHandle> {
        let entry = self
            .entries
            .get(&name)
            .ok_or_else(|| ApplicationError::UnknownService(name.to_string()))?;

        if !fresh {
            if let Some(handle) = entry.cached.get() {
                return Ok(handle.clone());
            }
        }

        let _guard = self.enter(name)?;
        if fresh {
            debug!("construct fresh service: {}", name);
            return self.construct(name, entry, arg);
        }
        let _waiting = self.wait_for(name)?;
        entry
            .cached
            .get_or_try_init(|| {
                let _owner = OwnerGuard::acquire(&self.building, name);
                debug!("construct service: {}", name);
                self.construct(name, entry, arg)
            })
            .cloned()
    }

    /// Cached (or newly cached) service of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: ServiceName) -> ApplicationResult<Arc<T>> {
        Self::downcast(name, self.resolve(name, None, false)?)
    }

    /// Newly constructed service of type `T`, bypassing the cache.
    pub fn fresh<T: Any + Send + Sync>(
        &self,
        name: ServiceName,
        arg: Option<&ServiceArg>,
    ) -> ApplicationResult<Arc<T>> {
        Self::downcast(name, self.resolve(name, arg, true)?)
    }

    fn downcast<T: Any + Send + Sync>(
        name: ServiceName,
        handle: ServiceHandle,
    ) -> ApplicationResult<Arc<T>> {
        handle
            .downcast::<T>()
            .map_err(|_| ApplicationError::ServiceType {
                service: name.to_string(),
                expected: type_name::<T>().to_string(),
            })
    }

    fn enter(&self, name: ServiceName) -> ApplicationResult<BuildGuard<'_>> {
        let thread = thread::current().id();
        let mut state = self.building.lock();
        let chain = state.chains.entry(thread).or_default();
        if chain.contains(&name) {
            let mut names: Vec<String> = chain.iter().map(ToString::to_string).collect();
            names.push(name.to_string());
            return Err(ApplicationError::CircularDependency { chain: names });
        }
        chain.push(name);
        Ok(BuildGuard {
            building: &self.building,
            thread,
        })
    }

    /// Record that this thread may block on `name`'s cached initialization.
    ///
    /// Fails when the owner of `name` is, through other blocked threads,
    /// waiting on a service this thread is initializing.
    fn wait_for(&self, name: ServiceName) -> ApplicationResult<WaitGuard<'_>> {
        let thread = thread::current().id();
        let mut state = self.building.lock();

        let mut hops = Vec::new();
        let mut seen = HashSet::new();
        let mut owner = state.owners.get(&name).copied();
        while let Some(t) = owner {
            if t == thread {
                let mut names: Vec<String> = state
                    .chains
                    .get(&thread)
                    .map(|chain| chain.iter().map(ToString::to_string).collect())
                    .unwrap_or_default();
                names.extend(hops.iter().map(ToString::to_string));
                debug!("cross-thread cycle on {}: {}", name, names.join(" -> "));
                return Err(ApplicationError::CircularDependency { chain: names });
            }
            if !seen.insert(t) {
                break;
            }
            let Some(next) = state.waiting.get(&t).copied() else {
                break;
            };
            hops.push(next);
            owner = state.owners.get(&next).copied();
        }

        state.waiting.insert(thread, name);
        Ok(WaitGuard {
            building: &self.building,
            thread,
            name,
        })
    }

    fn construct(
        &self,
        name: ServiceName,
        entry: &ServiceEntry,
        arg: Option<&ServiceArg>,
    ) -> ApplicationResult<ServiceHandle> {
        (entry.factory)(self, arg).map_err(|e| match e {
            e @ (ApplicationError::MissingConfiguration { .. }
            | ApplicationError::CircularDependency { .. }
            | ApplicationError::Connection) => e,
            other => ApplicationError::ServiceConstruction {
                service: name.to_string(),
                source: Box::new(other),
            },
        })
    }
}

/// Box a value as a service handle.
pub fn handle<T: Any + Send + Sync>(value: T) -> ServiceHandle {
    Arc::new(value)
}
