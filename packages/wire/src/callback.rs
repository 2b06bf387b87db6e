//! Typed decoding of inbound engine callbacks.

use std::collections::BTreeMap;

use lockbox_domain::Item;
use serde_json::Value;

use crate::codec::{decode_item, decode_item_list};
use crate::error::Result;
use crate::operation::CallbackFunction;

/// A decoded callback from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    OpenComplete,
    InitializeComplete,
    UnlockComplete,
    LockComplete,
    ListComplete(BTreeMap<String, Item>),
    UpdateComplete(Item),
}

impl Callback {
    /// Decode the body posted on `function`.
    ///
    /// The four lifecycle channels ignore their body. A list body decodes
    /// leniently (see [`decode_item_list`]); an update body must be a
    /// single valid item.
    pub fn decode(function: CallbackFunction, body: Value) -> Result<Self> {
        Ok(match function {
            CallbackFunction::OpenComplete => Callback::OpenComplete,
            CallbackFunction::InitializeComplete => Callback::InitializeComplete,
            CallbackFunction::UnlockComplete => Callback::UnlockComplete,
            CallbackFunction::LockComplete => Callback::LockComplete,
            CallbackFunction::ListComplete => Callback::ListComplete(decode_item_list(body)?),
            CallbackFunction::UpdateComplete => Callback::UpdateComplete(decode_item(body)?),
        })
    }

    /// The channel this callback arrived on.
    pub fn function(&self) -> CallbackFunction {
        match self {
            Callback::OpenComplete => CallbackFunction::OpenComplete,
            Callback::InitializeComplete => CallbackFunction::InitializeComplete,
            Callback::UnlockComplete => CallbackFunction::UnlockComplete,
            Callback::LockComplete => CallbackFunction::LockComplete,
            Callback::ListComplete(_) => CallbackFunction::ListComplete,
            Callback::UpdateComplete(_) => CallbackFunction::UpdateComplete,
        }
    }
}
