//! Major document schema
//!
//! Majors are owned by a university. Created lazily when a user names a
//! major not yet in the catalog for their target university. The
//! `requirements` list holds the university course codes the major expects
//! transfer students to have articulated.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for majors
pub const MAJOR_COLLECTION: &str = "majors";

/// Major catalog row
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MajorDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    pub code: String,

    /// Owning university
    pub university_id: ObjectId,

    /// University course codes required for this major
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl MajorDoc {
    pub fn new(name: String, code: String, university_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            code,
            university_id,
            requirements: Vec::new(),
        }
    }
}

impl IntoIndexes for MajorDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "university_id": 1, "name": 1 },
            Some(
                IndexOptions::builder()
                    .name("major_university_name_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MajorDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
