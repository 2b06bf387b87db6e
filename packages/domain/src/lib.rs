//! Lockbox domain model.
//!
//! Plain value types for the credentials held by the Lockbox datastore:
//! - `Item`: a credential record (title, origins, entry)
//! - `ItemEntry`: the kind-tagged secret payload of an item
//! - `EntryKind`: the extensible entry tag
//!
//! The serde representation of these types is the JSON shape the datastore
//! speaks. Absent optional fields serialize as `null`.
//!
//! # Example
//!
//! ```rust
//! use lockbox_domain::{Item, ItemEntry};
//!
//! let item = Item::builder()
//!     .title("Reddit")
//!     .origins(["www.reddit.com"])
//!     .entry(ItemEntry::login("tjacobson@yahoo.com", "hunter2"))
//!     .build();
//!
//! assert!(item.id().is_none());
//! ```

mod entry;
mod item;

pub use entry::{EntryKind, ItemEntry, ItemEntryBuilder};
pub use item::{Item, ItemBuilder};
