//! Bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{DataStoreError, Result};

/// Configuration for a [`DataStoreBridge`](crate::DataStoreBridge).
///
/// Every field has a default, so a JSON document only needs the keys it
/// wants to override:
///
/// ```rust
/// use lockbox_bridge::BridgeConfig;
///
/// let config = BridgeConfig::from_json(r#"{"bundle_path": "/app/Lockbox.app"}"#).unwrap();
/// assert_eq!(config.data_store_name, "ds");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Global name the store handle is bound to inside the engine.
    pub data_store_name: String,

    /// Absolute path of the application bundle.
    pub bundle_path: PathBuf,

    /// Directory under the bundle holding the datastore page.
    pub datastore_dir: String,

    /// How long an operation may wait for its completion, in milliseconds.
    /// `None` waits forever.
    pub callback_timeout_ms: Option<u64>,

    /// Buffer size for [`BroadcastDispatcher`](crate::BroadcastDispatcher)s
    /// built from this config.
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            data_store_name: "ds".to_string(),
            bundle_path: std::env::current_dir().unwrap_or_default(),
            datastore_dir: "lockbox-datastore".to_string(),
            callback_timeout_ms: None,
            event_capacity: 64,
        }
    }
}

impl BridgeConfig {
    /// Default configuration rooted at `bundle_path`.
    pub fn with_bundle_path(bundle_path: impl Into<PathBuf>) -> Self {
        Self {
            bundle_path: bundle_path.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn callback_timeout(&self) -> Option<Duration> {
        self.callback_timeout_ms.map(Duration::from_millis)
    }

    /// The datastore directory as a `file://` URL.
    ///
    /// Fails with [`DataStoreError::Unknown`] when the bundle path cannot
    /// be expressed as a file URL (for instance when it is relative).
    pub fn base_url(&self) -> Result<Url> {
        Url::from_directory_path(self.bundle_path.join(&self.datastore_dir))
            .map_err(|()| DataStoreError::Unknown)
    }

    /// The datastore page, `index.html` inside [`base_url`](Self::base_url).
    pub fn page_url(&self) -> Result<Url> {
        self.base_url()?
            .join("index.html")
            .map_err(|_| DataStoreError::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.data_store_name, "ds");
        assert_eq!(config.datastore_dir, "lockbox-datastore");
        assert_eq!(config.callback_timeout(), None);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn json_overrides() {
        let config = BridgeConfig::from_json(
            r#"{"data_store_name": "vault", "callback_timeout_ms": 2500}"#,
        )
        .unwrap();
        assert_eq!(config.data_store_name, "vault");
        assert_eq!(config.callback_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.datastore_dir, "lockbox-datastore");
    }

    #[test]
    fn json_rejects_bad_types() {
        assert!(BridgeConfig::from_json(r#"{"event_capacity": "lots"}"#).is_err());
    }

    #[test]
    fn page_url_inside_bundle() {
        let bundle = tempfile::tempdir().unwrap();
        let config = BridgeConfig::with_bundle_path(bundle.path());

        let base = config.base_url().unwrap();
        let page = config.page_url().unwrap();
        assert_eq!(base.scheme(), "file");
        assert!(base.path().ends_with("/lockbox-datastore/"));
        assert!(page.path().ends_with("/lockbox-datastore/index.html"));
        assert!(page.as_str().starts_with(base.as_str()));
    }

    #[test]
    fn relative_bundle_is_unknown_error() {
        let config = BridgeConfig::with_bundle_path("relative/bundle");
        assert_eq!(config.base_url(), Err(DataStoreError::Unknown));
        assert_eq!(config.page_url(), Err(DataStoreError::Unknown));
    }
}
