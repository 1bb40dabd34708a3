//! Remote calendar descriptors

use serde::{Deserialize, Serialize};

/// A calendar (partition) as listed by the remote provider.
///
/// Partitions are never stored on their own; this type only travels between
/// the remote collaborator and the sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCalendar {
    pub id: String,
    pub name: String,
    pub color_hex: Option<String>,
}

impl RemoteCalendar {
    /// Create a calendar descriptor without a display colour
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), color_hex: None }
    }
}
