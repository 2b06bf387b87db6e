//! Operation kinds and the callback channels that complete them.

use std::str::FromStr;

use crate::error::WireError;

/// The datastore operations that complete through a named callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Open,
    Initialize,
    Unlock,
    Lock,
    List,
    Touch,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Open,
        OperationKind::Initialize,
        OperationKind::Unlock,
        OperationKind::Lock,
        OperationKind::List,
        OperationKind::Touch,
    ];

    /// The callback channel the engine uses to report completion.
    pub fn callback(self) -> CallbackFunction {
        match self {
            OperationKind::Open => CallbackFunction::OpenComplete,
            OperationKind::Initialize => CallbackFunction::InitializeComplete,
            OperationKind::Unlock => CallbackFunction::UnlockComplete,
            OperationKind::Lock => CallbackFunction::LockComplete,
            OperationKind::List => CallbackFunction::ListComplete,
            OperationKind::Touch => CallbackFunction::UpdateComplete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Open => "open",
            OperationKind::Initialize => "initialize",
            OperationKind::Unlock => "unlock",
            OperationKind::Lock => "lock",
            OperationKind::List => "list",
            OperationKind::Touch => "touch",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named message channels the engine posts to.
///
/// The host registers every one of these with the engine before loading
/// the datastore page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackFunction {
    OpenComplete,
    InitializeComplete,
    UnlockComplete,
    LockComplete,
    ListComplete,
    UpdateComplete,
}

impl CallbackFunction {
    pub const ALL: [CallbackFunction; 6] = [
        CallbackFunction::OpenComplete,
        CallbackFunction::InitializeComplete,
        CallbackFunction::UnlockComplete,
        CallbackFunction::LockComplete,
        CallbackFunction::ListComplete,
        CallbackFunction::UpdateComplete,
    ];

    /// The channel name as registered with the engine.
    pub fn name(self) -> &'static str {
        match self {
            CallbackFunction::OpenComplete => "OpenComplete",
            CallbackFunction::InitializeComplete => "InitializeComplete",
            CallbackFunction::UnlockComplete => "UnlockComplete",
            CallbackFunction::LockComplete => "LockComplete",
            CallbackFunction::ListComplete => "ListComplete",
            CallbackFunction::UpdateComplete => "UpdateComplete",
        }
    }

    /// The operation this channel completes.
    pub fn operation(self) -> OperationKind {
        match self {
            CallbackFunction::OpenComplete => OperationKind::Open,
            CallbackFunction::InitializeComplete => OperationKind::Initialize,
            CallbackFunction::UnlockComplete => OperationKind::Unlock,
            CallbackFunction::LockComplete => OperationKind::Lock,
            CallbackFunction::ListComplete => OperationKind::List,
            CallbackFunction::UpdateComplete => OperationKind::Touch,
        }
    }
}

impl FromStr for CallbackFunction {
    type Err = WireError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        CallbackFunction::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| WireError::UnknownCallback {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Display for CallbackFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
