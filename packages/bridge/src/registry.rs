//! The completion registry.
//!
//! Correlates every call made into the engine with the named callback that
//! eventually completes it. One [`OneShot`] per [`OperationKind`], plus two
//! [`Latch`]es for the monotonic lifecycle facts.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use lockbox_domain::Item;
use lockbox_wire::OperationKind;

use crate::error::{DataStoreError, Result};
use crate::signal::{Completion, Latch, OneShot};

/// What a completion callback carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Open, initialize, unlock and lock complete with no data.
    Unit,
    /// The full item listing, keyed by id.
    Items(BTreeMap<String, Item>),
    /// The item a touch produced.
    Item(Item),
}

struct Signals {
    engine_ready: Latch<()>,
    opened: Latch<()>,
    completions: HashMap<OperationKind, OneShot<Payload>>,
}

/// Registry of completion signals, owned by the bridge.
pub struct CompletionRegistry {
    signals: Mutex<Signals>,
}

impl Default for CompletionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionRegistry {
    pub fn new() -> Self {
        let completions = OperationKind::ALL
            .into_iter()
            .map(|kind| (kind, OneShot::new()))
            .collect();
        Self {
            signals: Mutex::new(Signals {
                engine_ready: Latch::new(),
                opened: Latch::new(),
                completions,
            }),
        }
    }

    fn signals(&self) -> MutexGuard<'_, Signals> {
        // Critical sections never panic half-way, so a poisoned guard is
        // still consistent.
        self.signals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a waiter for the next completion of `kind`.
    pub fn subscribe(&self, kind: OperationKind) -> Completion<Payload> {
        self.signals()
            .completions
            .entry(kind)
            .or_default()
            .subscribe()
    }

    /// Complete the oldest in-flight call of `kind`.
    ///
    /// Returns `false` when no call was waiting.
    pub fn resolve(&self, kind: OperationKind, payload: Payload) -> bool {
        self.signals()
            .completions
            .entry(kind)
            .or_default()
            .resolve(payload)
    }

    /// Fail every in-flight call of `kind` and replace its signal.
    ///
    /// Failing `Open` also fails the `opened` latch, unless it already
    /// fired, so calls parked behind it see the error; the latch is then
    /// recreated so a later `open` can still succeed.
    pub fn fail(&self, kind: OperationKind, error: DataStoreError) -> usize {
        let mut signals = self.signals();
        let spent = signals.completions.insert(kind, OneShot::new());
        if kind == OperationKind::Open && signals.opened.fail(error.clone()) {
            signals.opened = Latch::new();
        }
        spent.map_or(0, |signal| signal.fail(error))
    }

    /// Number of calls of `kind` still awaiting completion.
    pub fn pending(&self, kind: OperationKind) -> usize {
        self.signals()
            .completions
            .get(&kind)
            .map_or(0, OneShot::pending)
    }

    /// Record that the engine finished loading. Later calls are no-ops.
    pub fn fire_engine_ready(&self) -> bool {
        self.signals().engine_ready.fire(())
    }

    /// Record that the store is open. Later calls are no-ops.
    pub fn fire_opened(&self) -> bool {
        self.signals().opened.fire(())
    }

    pub fn is_engine_ready(&self) -> bool {
        self.signals().engine_ready.is_fired()
    }

    pub fn is_opened(&self) -> bool {
        self.signals().opened.is_fired()
    }

    /// Wait until the engine is ready.
    pub fn engine_ready(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        self.signals().engine_ready.wait()
    }

    /// Wait until the store is open.
    pub fn opened(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        self.signals().opened.wait()
    }
}
