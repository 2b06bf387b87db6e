//! The seam between the bridge and the host's script engine.
//!
//! The engine is a black box: the host gives the bridge a way to evaluate
//! expressions, and separately feeds it whatever the engine posts back as
//! [`EngineNotification`]s.

use std::sync::Arc;

use async_trait::async_trait;
use lockbox_wire::CallbackFunction;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Errors reported by the host engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The expression threw or could not be evaluated.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The datastore page could not be loaded.
    #[error("page load failed: {0}")]
    Load(String),

    /// The engine has been torn down.
    #[error("engine unavailable")]
    Unavailable,
}

/// Something the engine posted back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotification {
    /// The datastore page finished loading.
    Loaded,
    /// A message on a named callback channel.
    Message { name: String, body: Value },
}

impl EngineNotification {
    pub fn message(name: impl Into<String>, body: Value) -> Self {
        EngineNotification::Message {
            name: name.into(),
            body,
        }
    }
}

/// Evaluate-and-callback access to the embedded engine.
///
/// Implementations must not block: `evaluate` resolves with the
/// expression's immediate value, while the real outcome of a datastore
/// call arrives later as a notification.
#[async_trait]
pub trait EngineChannel: Send + Sync {
    /// Start loading the datastore page, granting it read access to
    /// `read_access` and registering the given callback channels.
    async fn load(
        &self,
        page: &Url,
        read_access: &Url,
        callbacks: &[CallbackFunction],
    ) -> Result<(), EngineError>;

    /// Evaluate an expression and return its immediate value.
    async fn evaluate(&self, script: &str) -> Result<Value, EngineError>;
}

#[async_trait]
impl<T: EngineChannel + ?Sized> EngineChannel for Arc<T> {
    async fn load(
        &self,
        page: &Url,
        read_access: &Url,
        callbacks: &[CallbackFunction],
    ) -> Result<(), EngineError> {
        (**self).load(page, read_access, callbacks).await
    }

    async fn evaluate(&self, script: &str) -> Result<Value, EngineError> {
        (**self).evaluate(script).await
    }
}

#[async_trait]
impl<T: EngineChannel + ?Sized> EngineChannel for Box<T> {
    async fn load(
        &self,
        page: &Url,
        read_access: &Url,
        callbacks: &[CallbackFunction],
    ) -> Result<(), EngineError> {
        self.as_ref().load(page, read_access, callbacks).await
    }

    async fn evaluate(&self, script: &str) -> Result<Value, EngineError> {
        self.as_ref().evaluate(script).await
    }
}
