//! Lockbox wire layer.
//!
//! The embedded datastore engine speaks untyped JSON. This crate is the only
//! place that looks inside those payloads:
//! - `codec`: item and item-list decoding/encoding
//! - `Callback`: closed decoding of the six named completion channels
//! - `Script`: the expressions evaluated against the store handle
//! - `OperationKind` / `CallbackFunction`: the 1:1 operation/channel mapping
//!
//! # Example
//!
//! ```rust
//! use lockbox_wire::{Callback, CallbackFunction};
//! use serde_json::json;
//!
//! let function: CallbackFunction = "LockComplete".parse().unwrap();
//! let callback = Callback::decode(function, json!(null)).unwrap();
//! assert_eq!(callback.function(), CallbackFunction::LockComplete);
//! ```

mod callback;
pub mod codec;
mod error;
mod operation;
mod script;

pub use callback::Callback;
pub use codec::{decode_bool, decode_item, decode_item_list, encode_item, item_to_json_string};
pub use error::{Result, WireError};
pub use operation::{CallbackFunction, OperationKind};
pub use script::Script;
