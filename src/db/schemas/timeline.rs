//! Timeline and milestone document schemas
//!
//! One timeline per user. Milestones are regenerated wholesale (replace
//! all) whenever the timeline is generated; manual edits do not survive
//! regeneration.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for timelines
pub const TIMELINE_COLLECTION: &str = "timelines";

/// Collection name for timeline milestones
pub const MILESTONE_COLLECTION: &str = "milestones";

/// Milestone category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneCategory {
    #[default]
    Academic,
    Application,
    FinancialAid,
    Housing,
}

/// Timeline shell row (one per user)
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TimelineDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,

    /// Free-text target term, e.g. "Fall 2026"
    pub target_transfer_term: String,
}

impl IntoIndexes for TimelineDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("timeline_user_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for TimelineDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Milestone row
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MilestoneDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub timeline_id: ObjectId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub due_date: DateTime,

    #[serde(default)]
    pub category: MilestoneCategory,

    #[serde(default)]
    pub is_completed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
}

impl IntoIndexes for MilestoneDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "timeline_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("milestone_timeline_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MilestoneDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
