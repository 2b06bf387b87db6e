//! The credential item.

use serde::{Deserialize, Serialize};

use crate::entry::ItemEntry;

/// A credential record as stored by the datastore.
///
/// Items created locally have no `id` until the datastore assigns one.
/// Mutating operations require it to be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Site origins this item applies to, in the order the user gave them.
    #[serde(default)]
    pub origins: Vec<String>,
    pub entry: ItemEntry,
}

impl Item {
    /// Start building an item.
    pub fn builder() -> ItemBuilder {
        ItemBuilder::default()
    }

    /// The item's id, if the datastore has assigned one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }
}

/// Fluent builder for [`Item`].
#[derive(Clone, Debug, Default)]
pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.item.id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.item.title = title.into();
        self
    }

    pub fn origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item.origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn entry(mut self, entry: ItemEntry) -> Self {
        self.item.entry = entry;
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}
