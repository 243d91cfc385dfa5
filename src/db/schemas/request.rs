//! Mentorship request and message document schemas
//!
//! A request connects a student to a mentor and owns its message log.
//! Message delivery is polling-based; there is no server push.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for mentorship requests
pub const MENTORSHIP_REQUEST_COLLECTION: &str = "mentorship_requests";

/// Collection name for messages
pub const MESSAGE_COLLECTION: &str = "messages";

/// Mentorship request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Completed,
}

impl FromStr for RequestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "ACCEPTED" => Ok(RequestStatus::Accepted),
            "DECLINED" => Ok(RequestStatus::Declined),
            "COMPLETED" => Ok(RequestStatus::Completed),
            _ => Err(()),
        }
    }
}

/// Mentorship request row
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MentorshipRequestDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub student_id: ObjectId,

    pub mentor_id: ObjectId,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub topic: String,

    #[serde(default)]
    pub status: RequestStatus,
}

impl MentorshipRequestDoc {
    /// Whether a user participates in this request
    pub fn is_participant(&self, user_id: &ObjectId) -> bool {
        self.student_id == *user_id || self.mentor_id == *user_id
    }
}

impl IntoIndexes for MentorshipRequestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "student_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("request_student_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "mentor_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("request_mentor_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for MentorshipRequestDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Message row within a mentorship request
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub request_id: ObjectId,

    pub sender_id: ObjectId,

    pub content: String,

    pub created_at: DateTime,

    #[serde(default)]
    pub is_read: bool,
}

impl IntoIndexes for MessageDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "request_id": 1, "created_at": 1 },
            Some(
                IndexOptions::builder()
                    .name("message_request_created_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MessageDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_check() {
        let student = ObjectId::new();
        let mentor = ObjectId::new();
        let outsider = ObjectId::new();

        let request = MentorshipRequestDoc {
            student_id: student,
            mentor_id: mentor,
            ..Default::default()
        };

        assert!(request.is_participant(&student));
        assert!(request.is_participant(&mentor));
        assert!(!request.is_participant(&outsider));
    }
}
