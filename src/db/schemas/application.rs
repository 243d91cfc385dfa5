//! Application document schema
//!
//! A user's transfer application to one university. The deadline is
//! required and must be a real calendar date; status falls back to DRAFT
//! when the client sends something unrecognized.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for applications
pub const APPLICATION_COLLECTION: &str = "applications";

/// Application lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Draft,
    InProgress,
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    Waitlisted,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApplicationStatus::Draft => "DRAFT",
            ApplicationStatus::InProgress => "IN_PROGRESS",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Waitlisted => "WAITLISTED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ApplicationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(ApplicationStatus::Draft),
            "IN_PROGRESS" => Ok(ApplicationStatus::InProgress),
            "SUBMITTED" => Ok(ApplicationStatus::Submitted),
            "UNDER_REVIEW" => Ok(ApplicationStatus::UnderReview),
            "ACCEPTED" => Ok(ApplicationStatus::Accepted),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "WAITLISTED" => Ok(ApplicationStatus::Waitlisted),
            _ => Err(()),
        }
    }
}

impl ApplicationStatus {
    /// Parse leniently: anything unrecognized becomes DRAFT
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Application row
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApplicationDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,

    pub university_id: ObjectId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_id: Option<ObjectId>,

    /// Required; always a valid calendar date by the time it is stored
    pub deadline: DateTime,

    #[serde(default)]
    pub status: ApplicationStatus,
}

impl IntoIndexes for ApplicationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("application_user_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1, "university_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("application_user_university_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ApplicationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            "DRAFT",
            "IN_PROGRESS",
            "SUBMITTED",
            "UNDER_REVIEW",
            "ACCEPTED",
            "REJECTED",
            "WAITLISTED",
        ] {
            let parsed = ApplicationStatus::parse_or_default(s);
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn test_status_case_insensitive() {
        assert_eq!(
            ApplicationStatus::parse_or_default("submitted"),
            ApplicationStatus::Submitted
        );
    }

    #[test]
    fn test_unknown_status_defaults_to_draft() {
        assert_eq!(
            ApplicationStatus::parse_or_default("PONDERING"),
            ApplicationStatus::Draft
        );
        assert_eq!(
            ApplicationStatus::parse_or_default(""),
            ApplicationStatus::Draft
        );
    }
}
