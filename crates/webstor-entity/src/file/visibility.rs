//! File visibility enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who may see a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileVisibility {
    /// Visible only to the owner.
    Private,
    /// Visible to users the owner shared it with.
    Shared,
    /// Visible to anyone with the link.
    Public,
}

impl FileVisibility {
    /// Return the visibility as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }
}

impl Default for FileVisibility {
    fn default() -> Self {
        Self::Private
    }
}

impl fmt::Display for FileVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileVisibility {
    type Err = webstor_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            "public" => Ok(Self::Public),
            _ => Err(webstor_core::AppError::validation(format!(
                "Invalid file visibility: '{s}'. Expected one of: private, shared, public"
            ))),
        }
    }
}
