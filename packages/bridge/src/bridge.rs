//! The datastore bridge.
//!
//! `DataStoreBridge` drives the encrypted store living inside the engine.
//! Every public operation is fire-and-forget: it registers for its
//! completion at call time, then runs in a spawned task that
//!
//! 1. waits for its lifecycle precondition (engine ready, store opened),
//! 2. re-checks `initialized`/`locked` for sensitive operations,
//! 3. evaluates its script in the engine,
//! 4. waits for the named callback, and
//! 5. publishes exactly one [`DataStoreEvent`].
//!
//! Failures at any step end the call with a single `Error` event.

use std::future::Future;
use std::sync::Arc;

use lockbox_domain::Item;
use lockbox_wire::{decode_bool, Callback, CallbackFunction, OperationKind, Script};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::BridgeConfig;
use crate::dispatch::{DataStoreEvent, Dispatcher};
use crate::engine::{EngineChannel, EngineNotification};
use crate::error::{DataStoreError, Result};
use crate::registry::{CompletionRegistry, Payload};

struct Inner {
    config: BridgeConfig,
    engine: Arc<dyn EngineChannel>,
    dispatcher: Arc<dyn Dispatcher>,
    registry: CompletionRegistry,
}

/// Handle to the datastore living in the embedded engine.
///
/// Cheap to clone; clones share the same engine, registry and dispatcher.
/// Operations spawn onto the current tokio runtime and must be called from
/// within one.
///
/// # Example
///
/// ```rust,ignore
/// let bus = BroadcastDispatcher::new(config.event_capacity);
/// let bridge = DataStoreBridge::launch(config, engine, bus.clone()).await;
/// bridge.spawn_ingest(notifications);
///
/// bridge.open(uid);
/// bridge.initialize(scoped_key);
/// bridge.list();
/// // ItemsListed arrives on the bus once the engine answers.
/// ```
#[derive(Clone)]
pub struct DataStoreBridge {
    inner: Arc<Inner>,
}

impl DataStoreBridge {
    /// Create a bridge without touching the engine.
    ///
    /// Call [`load`](Self::load) to start the datastore page.
    pub fn new<E, D>(config: BridgeConfig, engine: E, dispatcher: D) -> Self
    where
        E: EngineChannel + 'static,
        D: Dispatcher + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                config,
                engine: Arc::new(engine),
                dispatcher: Arc::new(dispatcher),
                registry: CompletionRegistry::new(),
            }),
        }
    }

    /// Create a bridge and immediately start loading the datastore page.
    pub async fn launch<E, D>(config: BridgeConfig, engine: E, dispatcher: D) -> Self
    where
        E: EngineChannel + 'static,
        D: Dispatcher + 'static,
    {
        let bridge = Self::new(config, engine, dispatcher);
        bridge.load().await;
        bridge
    }

    /// Ask the engine to load the datastore page.
    ///
    /// Publishes `Opened(false)` once the page location is known, or
    /// `Error(Unknown)` if the bundle path cannot form one.
    pub async fn load(&self) {
        let inner = &self.inner;
        let (page, base) = match (inner.config.page_url(), inner.config.base_url()) {
            (Ok(page), Ok(base)) => (page, base),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(
                    bundle = %inner.config.bundle_path.display(),
                    "datastore page location is not a file URL"
                );
                inner.dispatcher.dispatch(DataStoreEvent::Error(e));
                return;
            }
        };

        inner.dispatcher.dispatch(DataStoreEvent::Opened(false));
        tracing::debug!(page = %page, "loading datastore page");
        if let Err(e) = inner
            .engine
            .load(&page, &base, &CallbackFunction::ALL)
            .await
        {
            tracing::warn!(error = %e, "datastore page failed to load");
            inner.dispatcher.dispatch(DataStoreEvent::Error(e.into()));
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Whether the engine has reported that the page finished loading.
    pub fn is_engine_ready(&self) -> bool {
        self.inner.registry.is_engine_ready()
    }

    /// Whether an `open` has completed.
    pub fn is_opened(&self) -> bool {
        self.inner.registry.is_opened()
    }

    /// Number of calls of `kind` awaiting their callback.
    pub fn pending(&self, kind: OperationKind) -> usize {
        self.inner.registry.pending(kind)
    }

    /// Open the store for user `uid`. Publishes `Opened(true)`.
    pub fn open(&self, uid: impl Into<String>) -> JoinHandle<()> {
        let script = Script::Open { uid: uid.into() };
        self.run(OperationKind::Open, move |inner| async move {
            inner.registry.engine_ready().await?;
            inner.evaluate(&script).await.map(drop)
        })
    }

    /// Initialize the store with the user's scoped key. Publishes
    /// `Initialized(true)`.
    pub fn initialize(&self, scoped_key: impl Into<String>) -> JoinHandle<()> {
        let script = Script::Initialize {
            scoped_key: scoped_key.into(),
        };
        self.run(OperationKind::Initialize, move |inner| async move {
            inner.registry.opened().await?;
            inner.evaluate(&script).await.map(drop)
        })
    }

    /// Unlock the store. Publishes `Locked(false)`.
    pub fn unlock(&self, scoped_key: impl Into<String>) -> JoinHandle<()> {
        let script = Script::Unlock {
            scoped_key: scoped_key.into(),
        };
        self.run(OperationKind::Unlock, move |inner| async move {
            inner.registry.opened().await?;
            inner.evaluate(&script).await.map(drop)
        })
    }

    /// Lock the store. Publishes `Locked(true)`.
    pub fn lock(&self) -> JoinHandle<()> {
        self.run(OperationKind::Lock, |inner| async move {
            inner.registry.opened().await?;
            inner.evaluate(&Script::Lock).await.map(drop)
        })
    }

    /// List every item. Publishes `ItemsListed`.
    ///
    /// Fails with `NotInitialized` or `Locked` without calling `list` in
    /// the engine when the store is not usable.
    pub fn list(&self) -> JoinHandle<()> {
        self.run(OperationKind::List, |inner| async move {
            inner.registry.opened().await?;
            inner.check_state().await?;
            inner.evaluate(&Script::List).await.map(drop)
        })
    }

    /// Touch an item. Publishes `ItemUpdated` with the item the engine
    /// returns.
    ///
    /// An item without an id fails with `NoIdPassed` before anything is
    /// sent to the engine.
    pub fn touch(&self, item: Item) -> JoinHandle<()> {
        if !item.has_id() {
            tracing::warn!(title = %item.title, "touch requested for item without id");
            self.inner
                .dispatcher
                .dispatch(DataStoreEvent::Error(DataStoreError::NoIdPassed));
            return tokio::spawn(std::future::ready(()));
        }

        self.run(OperationKind::Touch, move |inner| async move {
            inner.registry.opened().await?;
            inner.check_state().await?;
            let script = Script::touch(&item)?;
            inner.evaluate(&script).await.map(drop)
        })
    }

    /// Read the `initialized` flag once the store is open.
    pub async fn is_initialized(&self) -> Result<bool> {
        self.inner.status(Script::ReadInitialized).await
    }

    /// Read the `locked` flag once the store is open.
    pub async fn is_locked(&self) -> Result<bool> {
        self.inner.status(Script::ReadLocked).await
    }

    /// Publish the current `initialized` flag as `Initialized(value)`.
    pub fn refresh_initialized(&self) -> JoinHandle<()> {
        self.refresh(Script::ReadInitialized, DataStoreEvent::Initialized)
    }

    /// Publish the current `locked` flag as `Locked(value)`.
    pub fn refresh_locked(&self) -> JoinHandle<()> {
        self.refresh(Script::ReadLocked, DataStoreEvent::Locked)
    }

    /// Feed one engine notification into the bridge.
    pub fn ingest(&self, notification: EngineNotification) {
        match notification {
            EngineNotification::Loaded => {
                if self.inner.registry.fire_engine_ready() {
                    tracing::debug!("datastore engine ready");
                } else {
                    tracing::trace!("ignoring repeated load notification");
                }
            }
            EngineNotification::Message { name, body } => self.inner.handle_message(&name, body),
        }
    }

    /// Ingest notifications from `rx` until the sender side closes.
    pub fn spawn_ingest(&self, mut rx: mpsc::Receiver<EngineNotification>) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                bridge.ingest(notification);
            }
            tracing::debug!("engine notification channel closed");
        })
    }

    /// Register for `kind`'s completion now, then drive `call` and publish
    /// the outcome from a spawned task.
    fn run<F, Fut>(&self, kind: OperationKind, call: F) -> JoinHandle<()>
    where
        F: FnOnce(Arc<Inner>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let completion = self.inner.registry.subscribe(kind);
        let inner = Arc::clone(&self.inner);
        let call = call(Arc::clone(&inner));

        tokio::spawn(async move {
            let flow = async {
                tracing::trace!(operation = %kind, callback = %kind.callback(), "call started");
                if let Err(e) = call.await {
                    tracing::warn!(operation = %kind, error = %e, "datastore call failed");
                    inner.registry.fail(kind, e);
                }
                completion.wait().await
            };

            let outcome = match inner.within_timeout(kind.as_str(), flow).await {
                Err(e @ DataStoreError::Timeout { .. }) => {
                    inner.registry.fail(kind, e.clone());
                    Err(e)
                }
                other => other,
            };

            let event = outcome
                .and_then(|payload| success_event(kind, payload))
                .unwrap_or_else(DataStoreEvent::Error);
            inner.dispatcher.dispatch(event);
        })
    }

    fn refresh(&self, script: Script, event: fn(bool) -> DataStoreEvent) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let event = inner
                .status(script)
                .await
                .map(event)
                .unwrap_or_else(DataStoreEvent::Error);
            inner.dispatcher.dispatch(event);
        })
    }
}

impl Inner {
    async fn evaluate(&self, script: &Script) -> Result<Value> {
        tracing::debug!(script = script.name(), "evaluating in engine");
        let expression = script.render(&self.config.data_store_name);
        Ok(self.engine.evaluate(&expression).await?)
    }

    async fn read_flag(&self, script: Script) -> Result<bool> {
        let value = self.evaluate(&script).await?;
        Ok(decode_bool(&value)?)
    }

    /// Wait for `opened`, then read a flag, bounded by the callback timeout.
    async fn status(&self, script: Script) -> Result<bool> {
        let label = script.name();
        let flow = async {
            self.registry.opened().await?;
            self.read_flag(script).await
        };
        self.within_timeout(label, flow).await
    }

    /// Query `initialized`, then `locked`, fresh on every call.
    ///
    /// `locked` is never queried for an uninitialized store.
    async fn check_state(&self) -> Result<()> {
        if !self.read_flag(Script::ReadInitialized).await? {
            return Err(DataStoreError::NotInitialized);
        }
        if self.read_flag(Script::ReadLocked).await? {
            return Err(DataStoreError::Locked);
        }
        Ok(())
    }

    async fn within_timeout<T>(
        &self,
        label: &'static str,
        flow: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let Some(limit) = self.config.callback_timeout() else {
            return flow.await;
        };
        match tokio::time::timeout(limit, flow).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(operation = label, ?limit, "datastore call timed out");
                Err(DataStoreError::Timeout { operation: label })
            }
        }
    }

    fn handle_message(&self, name: &str, body: Value) {
        let function: CallbackFunction = match name.parse() {
            Ok(function) => function,
            Err(e) => {
                tracing::warn!(error = %e, "callback on unregistered channel");
                self.dispatcher
                    .dispatch(DataStoreEvent::Error(DataStoreError::UnexpectedJavaScriptMethod));
                return;
            }
        };
        tracing::debug!(callback = %function, "engine callback");

        let callback = match Callback::decode(function, body) {
            Ok(callback) => callback,
            Err(e) => {
                tracing::warn!(callback = %function, error = %e, "undecodable callback body");
                let error = DataStoreError::from(e);
                // With no touch waiting, a bad update still reaches the bus.
                let failed = match function.operation() {
                    OperationKind::Touch => self.registry.fail(OperationKind::Touch, error.clone()),
                    _ => 0,
                };
                if failed == 0 {
                    self.dispatcher.dispatch(DataStoreEvent::Error(error));
                }
                return;
            }
        };

        let kind = callback.function().operation();
        let payload = match callback {
            Callback::OpenComplete => {
                self.registry.fire_opened();
                Payload::Unit
            }
            Callback::InitializeComplete | Callback::UnlockComplete | Callback::LockComplete => {
                Payload::Unit
            }
            Callback::ListComplete(items) => Payload::Items(items),
            Callback::UpdateComplete(item) => Payload::Item(item),
        };

        if !self.registry.resolve(kind, payload) {
            tracing::debug!(operation = %kind, "completion arrived with no caller waiting");
        }
    }
}

fn success_event(kind: OperationKind, payload: Payload) -> Result<DataStoreEvent> {
    match (kind, payload) {
        (OperationKind::Open, Payload::Unit) => Ok(DataStoreEvent::Opened(true)),
        (OperationKind::Initialize, Payload::Unit) => Ok(DataStoreEvent::Initialized(true)),
        (OperationKind::Unlock, Payload::Unit) => Ok(DataStoreEvent::Locked(false)),
        (OperationKind::Lock, Payload::Unit) => Ok(DataStoreEvent::Locked(true)),
        (OperationKind::List, Payload::Items(items)) => Ok(DataStoreEvent::ItemsListed(items)),
        (OperationKind::Touch, Payload::Item(item)) => Ok(DataStoreEvent::ItemUpdated(item)),
        _ => Err(DataStoreError::UnexpectedType),
    }
}
