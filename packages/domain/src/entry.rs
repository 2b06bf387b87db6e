//! Item entries - the kind-tagged secret payload of an item.

use serde::{Deserialize, Serialize};

/// The tag describing what an [`ItemEntry`] holds.
///
/// Only `login` entries exist today. Any other tag is kept verbatim in
/// [`EntryKind::Other`] so that entries written by a newer datastore survive
/// a decode/encode cycle untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    /// A username/password login.
    #[default]
    Login,
    /// A kind this client does not know about.
    Other(String),
}

impl EntryKind {
    /// The wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EntryKind::Login => "login",
            EntryKind::Other(tag) => tag,
        }
    }
}

impl From<String> for EntryKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "login" => EntryKind::Login,
            _ => EntryKind::Other(tag),
        }
    }
}

impl From<&str> for EntryKind {
    fn from(tag: &str) -> Self {
        EntryKind::from(tag.to_string())
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Login => "login".to_string(),
            EntryKind::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The secret part of an item.
///
/// `kind` is always present; the remaining fields depend on the kind and
/// may be absent. Absent fields are encoded as `null`, never omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    pub kind: EntryKind,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ItemEntry {
    /// Start building an entry. Defaults to a `login` entry with no fields.
    pub fn builder() -> ItemEntryBuilder {
        ItemEntryBuilder::default()
    }

    /// Shorthand for a login entry with credentials.
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::builder().username(username).password(password).build()
    }
}

/// Fluent builder for [`ItemEntry`].
#[derive(Clone, Debug, Default)]
pub struct ItemEntryBuilder {
    entry: ItemEntry,
}

impl ItemEntryBuilder {
    pub fn kind(mut self, kind: impl Into<EntryKind>) -> Self {
        self.entry.kind = kind.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.entry.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.entry.password = Some(password.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.entry.notes = Some(notes.into());
        self
    }

    pub fn build(self) -> ItemEntry {
        self.entry
    }
}
