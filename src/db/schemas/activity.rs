//! Application activity document schema
//!
//! Extracurricular activities attached to an application. The whole list
//! is replaced on every save; there is no incremental activity CRUD.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for application activities
pub const ACTIVITY_COLLECTION: &str = "activities";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ActivityDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub application_id: ObjectId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub start_date: Option<bson::DateTime>,

    #[serde(default)]
    pub end_date: Option<bson::DateTime>,

    #[serde(default)]
    pub hours_per_week: f64,
}

impl IntoIndexes for ActivityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "application_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("activity_application_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ActivityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
