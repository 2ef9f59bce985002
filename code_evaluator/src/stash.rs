use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

pub const LAST_RESULT_KEY: &str = "last_submission_result";

/// Ephemeral copy of the last computed result payload, so a follow-up view
/// can show it without another round trip. Never authoritative.
#[derive(Debug, Default)]
pub struct ResultStash {
    entries: Mutex<HashMap<&'static str, Value>>,
}

impl ResultStash {
    pub fn put<T: Serialize>(&self, payload: &T) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!("failed to stash result: {err}");
                return;
            }
        };
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(LAST_RESULT_KEY, value);
            }
            Err(err) => warn!("result stash unavailable: {err}"),
        }
    }

    pub fn last(&self) -> Option<Value> {
        self.entries.lock().ok()?.get(LAST_RESULT_KEY).cloned()
    }
}
