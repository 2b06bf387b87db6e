//! Script expressions sent to the engine.
//!
//! The engine exposes a small fixed API against a store handle bound in its
//! global scope. Each [`Script`] renders to one expression against a handle
//! name chosen by the host (`ds` by default).

use lockbox_domain::Item;

use crate::codec::item_to_json_string;
use crate::error::Result;

/// An expression to evaluate in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Open the store for a user and bind it to the handle.
    Open { uid: String },
    /// Initialize a fresh store with the user's scoped key (a JSON key object).
    Initialize { scoped_key: String },
    /// Read the `initialized` flag.
    ReadInitialized,
    Unlock { scoped_key: String },
    Lock,
    /// Read the `locked` flag.
    ReadLocked,
    List,
    /// Touch an item; `item_json` is the encoded item.
    Touch { item_json: String },
}

impl Script {
    /// Build a touch script for an item.
    pub fn touch(item: &Item) -> Result<Self> {
        Ok(Script::Touch {
            item_json: item_to_json_string(item)?,
        })
    }

    /// A short label for logs. Never includes keys or item contents.
    pub fn name(&self) -> &'static str {
        match self {
            Script::Open { .. } => "open",
            Script::Initialize { .. } => "initialize",
            Script::ReadInitialized => "initialized",
            Script::Unlock { .. } => "unlock",
            Script::Lock => "lock",
            Script::ReadLocked => "locked",
            Script::List => "list",
            Script::Touch { .. } => "touch",
        }
    }

    /// Render this script against the store handle `store`.
    pub fn render(&self, store: &str) -> String {
        match self {
            Script::Open { uid } => {
                // A JSON string literal is a valid script string literal.
                let salt = serde_json::Value::String(uid.clone()).to_string();
                format!(
                    "var {store};swiftOpen({{\"salt\":{salt}}}).then(function (datastore) {{{store} = datastore;}});"
                )
            }
            Script::Initialize { scoped_key } => {
                format!("{store}.initialize({{\"appKey\":{scoped_key}}})")
            }
            Script::ReadInitialized => format!("{store}.initialized"),
            Script::Unlock { scoped_key } => format!("{store}.unlock({scoped_key})"),
            Script::Lock => format!("{store}.lock()"),
            Script::ReadLocked => format!("{store}.locked"),
            Script::List => format!("{store}.list()"),
            Script::Touch { item_json } => format!("{store}.touch({item_json})"),
        }
    }
}
