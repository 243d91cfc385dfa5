//! Common document metadata
//!
//! Every collection embeds these timestamps. Deletion is soft: reads
//! filter on `is_deleted` instead of removing rows, except for the
//! replace-all child collections (activities, milestones) which are
//! hard-deleted on rewrite.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Creation, update, and soft-deletion timestamps
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// Whether this document has been soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was soft-deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata stamped with the current instant
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            created_at: Some(now),
            updated_at: Some(now),
            is_deleted: false,
            deleted_at: None,
        }
    }
}
