//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::visibility::FileVisibility;

/// A file record owned by a user.
///
/// The record references an already-stored object via `storage_path`;
/// byte transfer to the storage medium happens outside this system.
/// Deletion is terminal: a soft-deleted file never becomes active again
/// and is excluded from every listing and quota computation, but the row
/// is retained for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// Containing folder (None = unfiled).
    pub folder_id: Option<Uuid>,
    /// The file name (including extension).
    pub file_name: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Location of the object on the storage medium.
    pub storage_path: String,
    /// MIME type of the file.
    pub mime_type: Option<String>,
    /// Who may see the file.
    pub visibility: FileVisibility,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the file was uploaded.
    pub upload_date: DateTime<Utc>,
    /// When the file was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.file_name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// The owning user.
    pub user_id: Uuid,
    /// Containing folder (None = unfiled).
    pub folder_id: Option<Uuid>,
    /// The file name.
    pub file_name: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Location on the storage medium.
    pub storage_path: String,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Who may see the file.
    pub visibility: FileVisibility,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> File {
        let now = Utc::now();
        File {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            folder_id: None,
            file_name: name.to_string(),
            file_size: 10,
            storage_path: "objects/x".to_string(),
            mime_type: None,
            visibility: FileVisibility::Private,
            is_deleted: false,
            upload_date: now,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(file("report.PDF").extension(), Some("pdf".to_string()));
        assert_eq!(file("archive.tar.gz").extension(), Some("gz".to_string()));
        assert_eq!(file("README").extension(), None);
    }
}
