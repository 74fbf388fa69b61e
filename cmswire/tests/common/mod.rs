//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use cmswire::application::{ApplicationError, ErrorReporter, HookEmitter};
use cmswire::domain::Row;
use cmswire::util::testing::init_test_setup;

/// Build a row from a JSON object literal.
pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row must be a JSON object")
}

/// Collects reported action failures as `(event, message)`.
#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<(String, String)>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, event: &str, error: &ApplicationError) {
        self.reports
            .lock()
            .push((event.to_string(), error.to_string()));
    }
}

pub fn emitter() -> (Arc<HookEmitter>, Arc<RecordingReporter>) {
    init_test_setup();
    let reporter = Arc::new(RecordingReporter::default());
    let hooks = Arc::new(HookEmitter::new(reporter.clone()));
    (hooks, reporter)
}
