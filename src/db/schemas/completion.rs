//! Course completion document schema
//!
//! Unique per (user_id, course_id); re-submission updates grade/term in
//! place rather than duplicating.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for course completions
pub const COMPLETION_COLLECTION: &str = "completions";

/// A course a student has completed
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CourseCompletionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,

    pub course_id: ObjectId,

    #[serde(default)]
    pub grade: String,

    /// Term the course was taken (e.g. "Spring 2025")
    #[serde(default)]
    pub term: String,
}

impl IntoIndexes for CourseCompletionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "course_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("completion_user_course_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CourseCompletionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
