//! File event entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Audited file action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_event_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// A file was uploaded.
    Upload,
    /// A file was soft-deleted.
    Delete,
    /// A file changed folders.
    Move,
}

impl FileAction {
    /// Return the action as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Delete => "delete",
            Self::Move => "move",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only audit record of a file action.
///
/// Rows are written once, inside the transaction that performs the
/// action, and are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// The affected file, if still known.
    pub file_id: Option<Uuid>,
    /// What happened.
    pub action: FileAction,
    /// When it happened.
    pub event_date: DateTime<Utc>,
    /// Size of the file at the time of the event.
    pub file_size: Option<i64>,
    /// Free-form metadata (JSON).
    pub meta: Option<serde_json::Value>,
}

/// Data required to append a new file event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileEvent {
    /// The acting user.
    pub user_id: Uuid,
    /// The affected file.
    pub file_id: Option<Uuid>,
    /// What happened.
    pub action: FileAction,
    /// Size of the file at the time of the event.
    pub file_size: Option<i64>,
    /// Free-form metadata.
    pub meta: Option<serde_json::Value>,
}
