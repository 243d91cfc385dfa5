//! University document schema
//!
//! Catalog rows created by seed/import, or lazily by the entity resolver
//! when a referenced name has no match (placeholder rows).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for universities
pub const UNIVERSITY_COLLECTION: &str = "universities";

/// University system type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UniversityType {
    /// University of California campus
    #[default]
    Uc,
    /// California State University campus
    Csu,
    /// Private institution
    Private,
}

impl fmt::Display for UniversityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniversityType::Uc => write!(f, "UC"),
            UniversityType::Csu => write!(f, "CSU"),
            UniversityType::Private => write!(f, "PRIVATE"),
        }
    }
}

/// University catalog row
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UniversityDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    /// Unique short code (e.g. "UCLA"); derived from the name for
    /// resolver-created placeholder rows
    pub code: String,

    #[serde(default)]
    pub university_type: UniversityType,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub state: String,
}

impl UniversityDoc {
    pub fn new(name: String, code: String, university_type: UniversityType) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            code,
            university_type,
            city: String::new(),
            state: String::new(),
        }
    }

    /// Hex string id, empty when unsaved
    pub fn id_hex(&self) -> String {
        self._id.map(|o| o.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for UniversityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("university_code_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .name("university_name_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UniversityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
