//! Mentor profile document schema
//!
//! One profile per user. New applications are created unapproved
//! (is_available=false, is_verified=false) and become visible in the
//! directory only after an out-of-band approval step.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for mentor profiles
pub const MENTOR_PROFILE_COLLECTION: &str = "mentor_profiles";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MentorProfileDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// The mentoring user; unique, one profile per user
    pub user_id: ObjectId,

    /// University the mentor transferred to
    pub university_id: ObjectId,

    #[serde(default)]
    pub major: String,

    #[serde(default)]
    pub graduation_year: Option<i32>,

    #[serde(default)]
    pub bio: String,

    /// Topics the mentor can help with (at least two required to apply)
    #[serde(default)]
    pub specialties: Vec<String>,

    #[serde(default)]
    pub is_available: bool,

    #[serde(default)]
    pub is_verified: bool,

    /// University email used for the verification step
    #[serde(default)]
    pub verification_email: String,

    #[serde(default)]
    pub rating: f64,

    #[serde(default)]
    pub total_sessions: u32,
}

impl IntoIndexes for MentorProfileDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("mentor_user_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "is_available": 1, "is_verified": 1 },
                Some(
                    IndexOptions::builder()
                        .name("mentor_visibility_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for MentorProfileDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
