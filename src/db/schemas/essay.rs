//! Application essay document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for application essays
pub const ESSAY_COLLECTION: &str = "essays";

/// Essay attached to an application (e.g. a PIQ response)
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EssayDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub application_id: ObjectId,

    pub prompt: String,

    #[serde(default)]
    pub content: String,

    /// Derived from content when the client does not supply it
    #[serde(default)]
    pub word_count: u32,

    #[serde(default)]
    pub is_complete: bool,

    #[serde(default)]
    pub feedback: Option<String>,
}

impl EssayDoc {
    /// Whitespace-delimited token count of essay content
    pub fn count_words(content: &str) -> u32 {
        content.split_whitespace().count() as u32
    }
}

impl IntoIndexes for EssayDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "application_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("essay_application_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for EssayDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(EssayDoc::count_words("one two three"), 3);
        assert_eq!(EssayDoc::count_words(""), 0);
        assert_eq!(EssayDoc::count_words("   spaced    out   words  "), 3);
        assert_eq!(EssayDoc::count_words("line\nbreaks\tand tabs"), 4);
    }
}
