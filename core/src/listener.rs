use serde_json::Value;
use std::sync::Mutex;

/// Sink for progress events. Implementations must not block the caller and
/// must not fail.
pub trait Listener: Send + Sync {
    fn send(&self, key: &str, value: Option<Value>);
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(String, Option<Value>)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Option<Value>)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.events().into_iter().map(|(key, _)| key).collect()
    }
}

impl Listener for RecordingListener {
    fn send(&self, key: &str, value: Option<Value>) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push((key.to_string(), value));
    }
}
