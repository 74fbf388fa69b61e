//! Hook handler library
//!
//! Business rules implemented as hook handlers. Each handler is a concrete
//! struct holding its collaborators and registers itself on an emitter.

mod files;
mod groups;
mod messages;
mod translation;
mod users;

use std::sync::Arc;

pub use files::{thumbnail_extension, FileFilters};
pub use groups::GroupActions;
pub use messages::MessageFilters;
pub use translation::{TranslationFilter, TRANSLATION_UI};
pub use users::{hash_row_password, redact, UserFilters, PRIVATE_USER_FIELDS};

use crate::application::HookEmitter;
use crate::config::FilesystemConfig;
use crate::domain::TableNames;
use crate::infrastructure::embed::EmbedManager;
use crate::infrastructure::traits::{Database, FileSystem};

/// Collaborators shared by the handler library.
pub struct HandlerDeps {
    pub db: Arc<dyn Database>,
    pub fs: Arc<dyn FileSystem>,
    pub embed: Arc<EmbedManager>,
    pub storage: FilesystemConfig,
    pub tables: TableNames,
}

/// Register every built-in handler on `hooks`.
pub fn register_builtin(hooks: &Arc<HookEmitter>, deps: HandlerDeps) {
    Arc::new(FileFilters::new(
        Arc::clone(&deps.fs),
        deps.storage.clone(),
        Arc::clone(&deps.embed),
        deps.tables.clone(),
    ))
    .register(hooks);
    Arc::new(MessageFilters::new(
        Arc::clone(&deps.db),
        Arc::downgrade(hooks),
        deps.tables.clone(),
    ))
    .register(hooks);
    Arc::new(UserFilters::new(deps.tables.clone())).register(hooks);
    Arc::new(GroupActions::new(Arc::clone(&deps.db), deps.tables.clone())).register(hooks);
    Arc::new(TranslationFilter::new(deps.db)).register(hooks);
}
