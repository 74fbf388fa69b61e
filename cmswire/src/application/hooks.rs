//! Hook emitter: actions and filters
//!
//! Handlers for an event run by priority (high first), ties in registration
//! order. Actions run for their side effects: a failing action is reported
//! and its siblings still run. Filters thread a `Payload` through the chain:
//! each handler's output is the next handler's input, and a failing filter
//! aborts the chain.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::events::APPLICATION_ERROR;
use crate::domain::{HookKind, Payload, Priority};

pub type ActionHandler = Arc<dyn Fn(&Payload) -> ApplicationResult<()> + Send + Sync>;
pub type FilterHandler = Arc<dyn Fn(Payload) -> ApplicationResult<Payload> + Send + Sync>;

#[derive(Clone)]
enum Handler {
    Action(ActionHandler),
    Filter(FilterHandler),
}

#[derive(Clone)]
struct Registration {
    priority: Priority,
    seq: u64,
    handler: Handler,
}

impl Registration {
    fn kind(&self) -> HookKind {
        match self.handler {
            Handler::Action(_) => HookKind::Action,
            Handler::Filter(_) => HookKind::Filter,
        }
    }
}

/// Receives action failures that were isolated during dispatch.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, event: &str, error: &ApplicationError);
}

/// Logs failures and forwards them to `application.error` listeners.
#[derive(Default)]
pub struct TracingErrorReporter {
    emitter: Weak<HookEmitter>,
}

impl TracingErrorReporter {
    /// Reporter that only logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter that also re-dispatches failures on `emitter`.
    pub fn forwarding(emitter: Weak<HookEmitter>) -> Self {
        Self { emitter }
    }
}

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, event: &str, err: &ApplicationError) {
        error!("hook `{}` failed: {}", event, err);
        if event == APPLICATION_ERROR {
            return;
        }
        if let Some(emitter) = self.emitter.upgrade() {
            let payload = Payload::new()
                .with("event", event)
                .with("error", err.to_string());
            emitter.dispatch_action(APPLICATION_ERROR, &payload);
        }
    }
}

/// Listener summary for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub kind: HookKind,
    pub priority: Priority,
}

pub struct HookEmitter {
    registrations: RwLock<BTreeMap<String, Vec<Registration>>>,
    next_seq: AtomicU64,
    reporter: Arc<dyn ErrorReporter>,
}

impl HookEmitter {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            registrations: RwLock::new(BTreeMap::new()),
            next_seq: AtomicU64::new(0),
            reporter,
        }
    }

    /// Emitter whose failures are logged and re-dispatched as
    /// `application.error`.
    pub fn with_tracing() -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            Self::new(Arc::new(TracingErrorReporter::forwarding(weak.clone())))
        })
    }

    pub fn add_action<F>(&self, event: &str, priority: Priority, handler: F)
    where
        F: Fn(&Payload) -> ApplicationResult<()> + Send + Sync + 'static,
    {
        self.register(event, priority, Handler::Action(Arc::new(handler)));
    }

    pub fn add_filter<F>(&self, event: &str, priority: Priority, handler: F)
    where
        F: Fn(Payload) -> ApplicationResult<Payload> + Send + Sync + 'static,
    {
        self.register(event, priority, Handler::Filter(Arc::new(handler)));
    }

    fn register(&self, event: &str, priority: Priority, handler: Handler) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut registrations = self.registrations.write();
        let list = registrations.entry(event.to_string()).or_default();
        list.push(Registration {
            priority,
            seq,
            handler,
        });
        list.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        debug!("hook registered: {} ({}, {})", event, list.len(), priority);
    }

    /// Copy of the handlers for an event, so handlers may register or
    /// dispatch while running.
    fn snapshot(&self, event: &str) -> Vec<Registration> {
        self.registrations
            .read()
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    /// Run every action for `event`. Failures are reported, never returned.
    pub fn dispatch_action(&self, event: &str, payload: &Payload) {
        for registration in self.snapshot(event) {
            if let Handler::Action(handler) = registration.handler {
                if let Err(err) = handler(payload) {
                    self.reporter.report(event, &err);
                }
            }
        }
    }

    /// Thread `payload` through every filter for `event` and return the
    /// last output. No filters means the payload comes back unchanged.
    pub fn dispatch_filter(&self, event: &str, payload: Payload) -> ApplicationResult<Payload> {
        let mut current = payload;
        for registration in self.snapshot(event) {
            if let Handler::Filter(handler) = registration.handler {
                current = handler(current).map_err(|source| ApplicationError::Handler {
                    event: event.to_string(),
                    source: Box::new(source),
                })?;
            }
        }
        Ok(current)
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.registrations
            .read()
            .get(event)
            .map(|l| !l.is_empty())
            .unwrap_or(false)
    }

    /// Listeners of an event in dispatch order.
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.snapshot(event)
            .iter()
            .map(|r| Listener {
                kind: r.kind(),
                priority: r.priority,
            })
            .collect()
    }

    /// Events with at least one listener, sorted.
    pub fn events(&self) -> Vec<String> {
        self.registrations.read().keys().cloned().collect()
    }
}
