//! Course equivalency document schema
//!
//! An equivalency states that a community-college course satisfies a
//! specific university course requirement (an articulation). At most one
//! equivalency exists per (course_id, university_id), enforced here by a
//! unique compound index on top of the resolver's find-before-create.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for course equivalencies
pub const EQUIVALENCY_COLLECTION: &str = "equivalencies";

/// Where an articulation record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EquivalencySource {
    /// assist.org articulation data
    Assist,
    /// Manually entered by an admin
    #[default]
    Manual,
}

/// Course equivalency row
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CourseEquivalencyDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// The community-college course
    pub course_id: ObjectId,

    /// The university whose requirement this course satisfies
    pub university_id: ObjectId,

    pub community_college_id: ObjectId,

    /// Course code on the university side (e.g. "MATH 31A")
    pub equivalent_course_code: String,

    #[serde(default)]
    pub equivalent_course_name: String,

    #[serde(default)]
    pub source: EquivalencySource,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<bson::DateTime>,
}

impl IntoIndexes for CourseEquivalencyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "course_id": 1, "university_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("equivalency_course_university_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "university_id": 1, "community_college_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("equivalency_university_college_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CourseEquivalencyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
