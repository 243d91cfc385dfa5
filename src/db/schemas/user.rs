//! User document schema
//!
//! Profile data for an authenticated student. The identity provider owns
//! credentials; we key on its stable `clerk_id` reference.
//!
//! `community_college`, `current_major`, and `target_universities` are kept
//! as loosely-typed strings (id, code, or free-text name) for compatibility
//! with existing client data; the catalog resolver interprets them at read
//! time via the id → code → name fallback chain.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Paid subscription level gating AI-assisted features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionTier::Free => write!(f, "FREE"),
            SubscriptionTier::Premium => write!(f, "PREMIUM"),
        }
    }
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Stable reference into the external identity provider (unique)
    pub clerk_id: String,

    pub email: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub profile_image: Option<String>,

    /// Community college reference: may be an id, a code, or a name
    #[serde(default)]
    pub community_college: String,

    /// Free-text major name, not a foreign key
    #[serde(default)]
    pub current_major: String,

    /// Target university references: ids, codes, or names, possibly stale
    #[serde(default)]
    pub target_universities: Vec<String>,

    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
}

impl UserDoc {
    /// Create a new user from identity-provider claims
    pub fn new(clerk_id: String, email: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            clerk_id,
            email,
            first_name: String::new(),
            last_name: String::new(),
            profile_image: None,
            community_college: String::new(),
            current_major: String::new(),
            target_universities: Vec::new(),
            subscription_tier: SubscriptionTier::Free,
        }
    }

    pub fn is_premium(&self) -> bool {
        self.subscription_tier == SubscriptionTier::Premium
    }

    /// Hex string id, empty when unsaved
    pub fn id_hex(&self) -> String {
        self._id.map(|o| o.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "clerk_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_clerk_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_email_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
