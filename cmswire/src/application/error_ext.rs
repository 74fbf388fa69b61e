//! Error conversion helpers for I/O and driver results

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::traits::DbResult;

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// fs.list_dir(&dir).with_path_context("scan extensions", &dir)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Extension trait attaching a table context to driver errors.
pub trait DbResultExt<T> {
    fn with_table_context(self, action: &str, table: &str) -> ApplicationResult<T>;
}

impl<T> DbResultExt<T> for DbResult<T> {
    fn with_table_context(self, action: &str, table: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::database(format!("{action} {table}"), e))
    }
}
