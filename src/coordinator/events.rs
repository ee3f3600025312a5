use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "resultId")]
pub enum ChangeReason {
    ResultAppended(Uuid),
    ResultDeleted(Uuid),
    /// Storage was written directly by a screen; dependents should re-read it.
    Refreshed,
    Reloaded,
    Cleared,
}

/// Delivered to every subscriber after each version bump.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub version: u64,
    pub reason: ChangeReason,
}
