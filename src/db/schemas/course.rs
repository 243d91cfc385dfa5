//! Course document schema
//!
//! Community-college courses, upserted by admin import keyed on
//! (community_college_id, code). Prerequisites are an informal ordered list
//! of course codes, not foreign keys.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for courses
pub const COURSE_COLLECTION: &str = "courses";

/// Community-college course row
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CourseDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Course code at the community college (e.g. "MATH 1A")
    pub code: String,

    pub name: String,

    #[serde(default)]
    pub units: f64,

    pub community_college_id: ObjectId,

    /// Ordered list of prerequisite course codes (informal)
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl CourseDoc {
    pub fn new(code: String, name: String, units: f64, community_college_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            code,
            name,
            units,
            community_college_id,
            prerequisites: Vec::new(),
        }
    }
}

impl IntoIndexes for CourseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "community_college_id": 1, "code": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("course_college_code_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CourseDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
