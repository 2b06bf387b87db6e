//! Lockbox DataStore bridge.
//!
//! The encrypted credential store lives inside an embedded script engine
//! that the host loads as a local page. This crate drives that store:
//!
//! - `EngineChannel`: evaluate-and-callback access to the engine (supplied by the host)
//! - `CompletionRegistry`: correlates each engine call with its named callback
//! - `DataStoreBridge`: the lifecycle and operations (`open`, `initialize`,
//!   `unlock`, `lock`, `list`, `touch`, status reads)
//! - `Dispatcher`: where results and failures are published as `DataStoreEvent`s
//!
//! # Lifecycle
//!
//! ```text
//! engine ready ──► opened ──► initialize / unlock / lock / status reads
//!                     │
//!                     └──► initialized ∧ ¬locked ──► list / touch
//! ```
//!
//! `engine ready` and `opened` are latched facts: once true they stay
//! true. `initialized` and `locked` are re-read from the engine before
//! every `list` and `touch`.
//!
//! # Testing
//!
//! Enable the `test-utils` feature for `testing::FakeEngine` and
//! `testing::RecordingDispatcher`.

mod bridge;
mod config;
mod dispatch;
mod engine;
mod error;
pub mod registry;
pub mod signal;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use bridge::DataStoreBridge;
pub use config::BridgeConfig;
pub use dispatch::{BroadcastDispatcher, DataStoreEvent, Dispatcher};
pub use engine::{EngineChannel, EngineError, EngineNotification};
pub use error::{DataStoreError, Result};
pub use registry::{CompletionRegistry, Payload};

// Re-export the model and wire types the bridge API speaks in
pub use lockbox_domain::{EntryKind, Item, ItemEntry};
pub use lockbox_wire::{CallbackFunction, OperationKind};
