//! Community college document schema
//!
//! Immutable reference data after seeding/admin import.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for community colleges
pub const COLLEGE_COLLECTION: &str = "colleges";

/// Community college catalog row
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CommunityCollegeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    /// Short unique code (e.g. "DAC" for De Anza College)
    pub code: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub state: String,
}

impl CommunityCollegeDoc {
    pub fn new(name: String, code: String, city: String, state: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            code,
            city,
            state,
        }
    }
}

impl IntoIndexes for CommunityCollegeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("college_code_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .name("college_name_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CommunityCollegeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
