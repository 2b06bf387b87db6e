//! Lockbox: host-side access to the encrypted credential datastore.
//!
//! The datastore runs as a local page inside an embedded script engine.
//! This crate gathers the three layers that talk to it:
//!
//! - [`domain`]: the `Item` model and its JSON shape
//! - [`wire`]: callback channels, payload decoding and script rendering
//! - [`bridge`]: the lifecycle-aware `DataStoreBridge` and its event bus
//!
//! The common types are re-exported at the top level.

pub use lockbox_bridge as bridge;
pub use lockbox_domain as domain;
pub use lockbox_wire as wire;

pub use lockbox_bridge::{
    BridgeConfig, BroadcastDispatcher, DataStoreBridge, DataStoreError, DataStoreEvent,
    Dispatcher, EngineChannel, EngineError, EngineNotification,
};
pub use lockbox_domain::{EntryKind, Item, ItemBuilder, ItemEntry, ItemEntryBuilder};
pub use lockbox_wire::{CallbackFunction, OperationKind};
