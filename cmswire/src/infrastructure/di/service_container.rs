//! Service container for dependency injection
//!
//! Registers a factory for every service into a `ServiceRegistry` and
//! exposes typed accessors. Services are created lazily and cached, except
//! `Auth` and the ACL snapshot: those follow a session, so a `RequestScope`
//! builds both for the session it is opened with.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::application::registry::handle;
use crate::application::services::{register_builtin, HandlerDeps};
use crate::application::{
    AccessControlBuilder, ApplicationError, ApplicationResult, Auth, ErrorReporter, HookEmitter,
    ServiceArg, ServiceHandle, ServiceRegistry, TableGateway,
};
use crate::config::{FilesystemConfig, Settings};
use crate::domain::events::APPLICATION_BOOT;
use crate::domain::{value_as_id, AclSnapshot, Payload, ServiceName};
use crate::infrastructure::embed::EmbedManager;
use crate::infrastructure::extensions::{discover, API_ENTRY, UI_ENTRY};
use crate::infrastructure::mail::Mailer;
use crate::infrastructure::memory::{MemoryConnector, MemorySession};
use crate::infrastructure::traits::{
    Database, DatabaseConnector, FileSystem, RealFileSystem, SessionStore,
};

/// Discovered extensions: name to entry file.
pub type Extensions = BTreeMap<String, PathBuf>;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    registry: ServiceRegistry,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Self::with_deps(
            settings,
            Arc::clone(&fs),
            Arc::new(MemoryConnector::new(fs)),
            Arc::new(MemorySession::new()),
            None,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    ///
    /// Without a `reporter`, failing actions are logged and re-dispatched
    /// as `application.error`.
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        connector: Arc<dyn DatabaseConnector>,
        session: Arc<dyn SessionStore>,
        reporter: Option<Arc<dyn ErrorReporter>>,
    ) -> Self {
        let settings = Arc::new(settings);
        let mut registry = ServiceRegistry::new();
        register_services(
            &mut registry,
            &settings,
            &fs,
            connector,
            session,
            reporter,
        );
        Self {
            settings,
            fs,
            registry,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn config(&self) -> ApplicationResult<Arc<Settings>> {
        self.registry.get::<Settings>(ServiceName::Config)
    }

    pub fn database(&self) -> ApplicationResult<Arc<dyn Database>> {
        database(&self.registry)
    }

    pub fn session(&self) -> ApplicationResult<Arc<dyn SessionStore>> {
        let session = self
            .registry
            .get::<Arc<dyn SessionStore>>(ServiceName::Session)?;
        Ok(Arc::clone(&session))
    }

    /// `Auth` bound to the container's session, built on each call.
    pub fn auth(&self) -> ApplicationResult<Arc<Auth>> {
        self.registry.fresh::<Auth>(ServiceName::Auth, None)
    }

    /// Freshly built permission snapshot for the session's user.
    pub fn acl(&self) -> ApplicationResult<Arc<AclSnapshot>> {
        self.registry.fresh::<AclSnapshot>(ServiceName::Acl, None)
    }

    /// Permission snapshot for an explicit user id.
    pub fn acl_for(&self, user_id: i64) -> ApplicationResult<Arc<AclSnapshot>> {
        self.registry
            .fresh::<AclSnapshot>(ServiceName::Acl, Some(&ServiceArg::from(user_id)))
    }

    pub fn files(&self) -> ApplicationResult<Arc<FilesystemConfig>> {
        self.registry.get::<FilesystemConfig>(ServiceName::Files)
    }

    pub fn mailer(&self) -> ApplicationResult<Option<Mailer>> {
        let mailer = self.registry.get::<Option<Mailer>>(ServiceName::Mailer)?;
        Ok((*mailer).clone())
    }

    pub fn extensions(&self) -> ApplicationResult<Arc<Extensions>> {
        self.registry.get::<Extensions>(ServiceName::Extensions)
    }

    pub fn uis(&self) -> ApplicationResult<Arc<Extensions>> {
        self.registry.get::<Extensions>(ServiceName::Uis)
    }

    pub fn embed(&self) -> ApplicationResult<Arc<EmbedManager>> {
        self.registry.get::<EmbedManager>(ServiceName::Embed)
    }

    pub fn hooks(&self) -> ApplicationResult<Arc<HookEmitter>> {
        self.registry.get::<HookEmitter>(ServiceName::Hooks)
    }

    /// Open a request for the container's own session.
    pub fn request(&self) -> ApplicationResult<RequestScope> {
        self.request_for(self.session()?)
    }

    /// Open a request for `session`: `Auth` and the ACL snapshot are built
    /// for it alone, so concurrent requests never see each other's user.
    pub fn request_for(&self, session: Arc<dyn SessionStore>) -> ApplicationResult<RequestScope> {
        let db = self.database()?;
        let acl = AccessControlBuilder::new(self.settings.tables.clone())
            .build(db.as_ref(), session.as_ref())?;
        debug!("request scope: user={:?}", acl.user_id());
        Ok(RequestScope {
            auth: Arc::new(Auth::new(
                Arc::clone(&db),
                session,
                self.settings.tables.clone(),
            )),
            acl: Arc::new(acl),
            hooks: self.hooks()?,
            db,
        })
    }
}

/// Services bound to one request.
pub struct RequestScope {
    auth: Arc<Auth>,
    acl: Arc<AclSnapshot>,
    db: Arc<dyn Database>,
    hooks: Arc<HookEmitter>,
}

impl RequestScope {
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn acl(&self) -> &AclSnapshot {
        &self.acl
    }

    pub fn actor(&self) -> Option<i64> {
        self.acl.user_id()
    }

    /// Gateway whose payloads carry this request's user as `actor`.
    pub fn gateway(&self, table: &str) -> TableGateway {
        TableGateway::new(
            table,
            Arc::clone(&self.db),
            Arc::clone(&self.hooks),
            self.actor(),
        )
    }
}

fn register_services(
    registry: &mut ServiceRegistry,
    settings: &Arc<Settings>,
    fs: &Arc<dyn FileSystem>,
    connector: Arc<dyn DatabaseConnector>,
    session: Arc<dyn SessionStore>,
    reporter: Option<Arc<dyn ErrorReporter>>,
) {
    let s = Arc::clone(settings);
    registry.register(ServiceName::Config, move |_, _| Ok(handle((*s).clone())));

    let s = Arc::clone(settings);
    registry.register(ServiceName::Database, move |_, _| {
        s.require(&s.database.required_keys())?;
        let db = connector
            .connect(&s.database)
            .map_err(|e| ApplicationError::database("connect", e))?;
        Ok(handle(db))
    });

    registry.register(ServiceName::Session, move |_, _| {
        Ok(handle(Arc::clone(&session)))
    });

    let s = Arc::clone(settings);
    registry.register(ServiceName::Auth, move |r, _| {
        let session = r.get::<Arc<dyn SessionStore>>(ServiceName::Session)?;
        Ok(handle(Auth::new(
            database(r)?,
            Arc::clone(&session),
            s.tables.clone(),
        )))
    });

    let s = Arc::clone(settings);
    registry.register(ServiceName::Acl, move |r, arg| {
        let builder = AccessControlBuilder::new(s.tables.clone());
        let db = database(r)?;
        let snapshot = match arg.and_then(value_as_id) {
            Some(user_id) => builder.build(&*db, &MemorySession::logged_in_as(user_id))?,
            None => {
                let auth = r.fresh::<Auth>(ServiceName::Auth, None)?;
                builder.build(&*db, auth.session())?
            }
        };
        Ok(handle(snapshot))
    });

    let s = Arc::clone(settings);
    registry.register(ServiceName::Files, move |_, _| {
        Ok(handle(s.filesystem.clone()))
    });

    let s = Arc::clone(settings);
    registry.register(ServiceName::Mailer, move |_, _| {
        Ok(handle(Mailer::from_config(s.mail.as_ref())?))
    });

    let (s, f) = (Arc::clone(settings), Arc::clone(fs));
    registry.register(ServiceName::Extensions, move |_, _| {
        Ok(handle(discover(f.as_ref(), &s.extensions.dir, API_ENTRY)?))
    });

    let (s, f) = (Arc::clone(settings), Arc::clone(fs));
    registry.register(ServiceName::Uis, move |_, _| {
        Ok(handle(discover(f.as_ref(), &s.extensions.uis_dir, UI_ENTRY)?))
    });

    registry.register(ServiceName::Embed, |_, _| {
        Ok(handle(EmbedManager::with_defaults()))
    });

    let (s, f) = (Arc::clone(settings), Arc::clone(fs));
    registry.register(ServiceName::Hooks, move |r, _| {
        let db = database(r)?;
        let embed = r.get::<EmbedManager>(ServiceName::Embed)?;
        let storage = r.get::<FilesystemConfig>(ServiceName::Files)?;

        let hooks = match &reporter {
            Some(reporter) => Arc::new(HookEmitter::new(Arc::clone(reporter))),
            None => HookEmitter::with_tracing(),
        };
        register_builtin(
            &hooks,
            HandlerDeps {
                db,
                fs: Arc::clone(&f),
                embed,
                storage: storage.as_ref().clone(),
                tables: s.tables.clone(),
            },
        );
        hooks.dispatch_action(APPLICATION_BOOT, &Payload::new());
        debug!("hooks ready: {} event(s)", hooks.events().len());
        let hooks: ServiceHandle = hooks;
        Ok(hooks)
    });
}

/// The database handle is stored as `Arc<dyn Database>` inside the handle.
fn database(registry: &ServiceRegistry) -> ApplicationResult<Arc<dyn Database>> {
    let db = registry.get::<Arc<dyn Database>>(ServiceName::Database)?;
    Ok(Arc::clone(&db))
}
