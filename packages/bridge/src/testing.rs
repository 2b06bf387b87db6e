//! Test doubles for the engine and the dispatch bus.
//!
//! `FakeEngine` stands in for the embedded datastore page. It records every
//! expression it is asked to evaluate, answers the `initialized`/`locked`
//! property reads from in-memory flags and, when auto-reply is on, posts
//! the completion callback a real datastore would post.
//!
//! `RecordingDispatcher` keeps every published event for inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lockbox_wire::CallbackFunction;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use url::Url;

use crate::dispatch::{DataStoreEvent, Dispatcher};
use crate::engine::{EngineChannel, EngineError, EngineNotification};

const NOTIFICATION_CAPACITY: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct FakeState {
    scripts: Vec<String>,
    loads: Vec<(Url, Url, Vec<CallbackFunction>)>,
    initialized: bool,
    locked: bool,
    auto_reply: bool,
    list_payload: Value,
    failures: VecDeque<(String, EngineError)>,
    load_failure: Option<EngineError>,
}

/// A scriptable in-memory engine.
#[derive(Debug)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
    notifications: mpsc::Sender<EngineNotification>,
    evaluated: Notify,
}

impl FakeEngine {
    /// Create an engine and the notification stream to hand to
    /// [`DataStoreBridge::spawn_ingest`](crate::DataStoreBridge::spawn_ingest).
    ///
    /// With `auto_reply` set, every datastore call posts its completion
    /// callback right after it is evaluated.
    pub fn new(auto_reply: bool) -> (Arc<Self>, mpsc::Receiver<EngineNotification>) {
        let (tx, rx) = mpsc::channel(NOTIFICATION_CAPACITY);
        let engine = Self {
            state: Mutex::new(FakeState {
                auto_reply,
                list_payload: Value::Array(Vec::new()),
                ..FakeState::default()
            }),
            notifications: tx,
            evaluated: Notify::new(),
        };
        (Arc::new(engine), rx)
    }

    /// Post the page-loaded notification.
    pub fn finish_loading(&self) {
        self.post(EngineNotification::Loaded);
    }

    /// Post a message on a named callback channel.
    pub fn post_message(&self, name: &str, body: Value) {
        self.post(EngineNotification::message(name, body));
    }

    fn post(&self, notification: EngineNotification) {
        if self.notifications.try_send(notification).is_err() {
            tracing::warn!("fake engine notification dropped");
        }
    }

    pub fn set_auto_reply(&self, auto_reply: bool) {
        lock(&self.state).auto_reply = auto_reply;
    }

    pub fn set_initialized(&self, initialized: bool) {
        lock(&self.state).initialized = initialized;
    }

    pub fn set_locked(&self, locked: bool) {
        lock(&self.state).locked = locked;
    }

    /// Body posted on `ListComplete` when auto-replying to `list()`.
    pub fn set_list_payload(&self, payload: Value) {
        lock(&self.state).list_payload = payload;
    }

    /// Fail the next evaluation whose expression contains `pattern`.
    pub fn fail_next(&self, pattern: impl Into<String>, error: EngineError) {
        lock(&self.state)
            .failures
            .push_back((pattern.into(), error));
    }

    /// Fail the next page load.
    pub fn fail_load(&self, error: EngineError) {
        lock(&self.state).load_failure = Some(error);
    }

    /// Every expression evaluated so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        lock(&self.state).scripts.clone()
    }

    /// How many evaluated expressions contain `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        lock(&self.state)
            .scripts
            .iter()
            .filter(|s| s.contains(pattern))
            .count()
    }

    /// Every page load requested so far.
    pub fn loads(&self) -> Vec<(Url, Url, Vec<CallbackFunction>)> {
        lock(&self.state).loads.clone()
    }

    /// Wait until at least `n` expressions containing `pattern` were
    /// evaluated. Panics after `limit`.
    pub async fn wait_for_script(&self, pattern: &str, n: usize, limit: Duration) {
        let waiting = async {
            loop {
                let notified = self.evaluated.notified();
                if self.count(pattern) >= n {
                    return;
                }
                notified.await;
            }
        };
        if tokio::time::timeout(limit, waiting).await.is_err() {
            panic!(
                "expected {n} evaluations matching {pattern:?}, saw {:?}",
                self.scripts()
            );
        }
    }

    /// Decide the immediate result and the callback for `script`.
    fn respond(
        state: &mut FakeState,
        script: &str,
    ) -> (Result<Value, EngineError>, Option<EngineNotification>) {
        if let Some(index) = state
            .failures
            .iter()
            .position(|(pattern, _)| script.contains(pattern.as_str()))
        {
            if let Some((_, error)) = state.failures.remove(index) {
                return (Err(error), None);
            }
        }

        if script.ends_with(".initialized") {
            return (Ok(Value::Bool(state.initialized)), None);
        }
        if script.ends_with(".locked") {
            return (Ok(Value::Bool(state.locked)), None);
        }

        let callback = if script.contains("swiftOpen(") {
            Some(EngineNotification::message("OpenComplete", Value::Null))
        } else if script.contains(".initialize(") {
            state.initialized = true;
            state.locked = false;
            Some(EngineNotification::message("InitializeComplete", Value::Null))
        } else if script.contains(".unlock(") {
            state.locked = false;
            Some(EngineNotification::message("UnlockComplete", Value::Null))
        } else if script.ends_with(".lock()") {
            state.locked = true;
            Some(EngineNotification::message("LockComplete", Value::Null))
        } else if script.ends_with(".list()") {
            Some(EngineNotification::message(
                "ListComplete",
                state.list_payload.clone(),
            ))
        } else if let Some(start) = script.find(".touch(") {
            let json = script[start + ".touch(".len()..].trim_end_matches(')');
            let body = serde_json::from_str(json).unwrap_or(Value::Null);
            Some(EngineNotification::message("UpdateComplete", body))
        } else {
            None
        };

        let callback = if state.auto_reply { callback } else { None };
        (Ok(Value::Null), callback)
    }
}

#[async_trait]
impl EngineChannel for FakeEngine {
    async fn load(
        &self,
        page: &Url,
        read_access: &Url,
        callbacks: &[CallbackFunction],
    ) -> Result<(), EngineError> {
        let mut state = lock(&self.state);
        if let Some(error) = state.load_failure.take() {
            return Err(error);
        }
        state
            .loads
            .push((page.clone(), read_access.clone(), callbacks.to_vec()));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, EngineError> {
        let (result, callback) = {
            let mut state = lock(&self.state);
            state.scripts.push(script.to_string());
            Self::respond(&mut state, script)
        };
        self.evaluated.notify_waiters();
        if let Some(callback) = callback {
            self.post(callback);
        }
        result
    }
}

/// A dispatcher that remembers every event.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<DataStoreEvent>>,
    published: Notify,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every event published so far, in order.
    pub fn events(&self) -> Vec<DataStoreEvent> {
        lock(&self.events).clone()
    }

    /// Only the error events.
    pub fn errors(&self) -> Vec<crate::DataStoreError> {
        lock(&self.events)
            .iter()
            .filter_map(|e| e.error().cloned())
            .collect()
    }

    /// How many published events satisfy `predicate`.
    pub fn count(&self, predicate: impl Fn(&DataStoreEvent) -> bool) -> usize {
        lock(&self.events).iter().filter(|e| predicate(*e)).count()
    }

    /// Wait until at least `n` events were published. Panics after `limit`.
    pub async fn wait_for(&self, n: usize, limit: Duration) -> Vec<DataStoreEvent> {
        let waiting = async {
            loop {
                let notified = self.published.notified();
                let events = self.events();
                if events.len() >= n {
                    return events;
                }
                notified.await;
            }
        };
        match tokio::time::timeout(limit, waiting).await {
            Ok(events) => events,
            Err(_) => panic!("expected {n} events, saw {:?}", self.events()),
        }
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, event: DataStoreEvent) {
        lock(&self.events).push(event);
        self.published.notify_waiters();
    }
}
