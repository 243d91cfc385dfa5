//! MongoDB client and collection wrapper
//!
//! Typed collections declare their own indexes (`IntoIndexes`) which are
//! applied when the collection is first opened, and carry common metadata
//! timestamps (`MutMetadata`). Reads filter soft-deleted documents.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{FindOptions, IndexOptions, UpdateModifications},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::TransferableError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client and verify the connection
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, TransferableError> {
        info!("Connecting to MongoDB at {}", uri);

        // serverSelectionTimeoutMS avoids hanging on an unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            TransferableError::Database(format!("Failed to connect to MongoDB: {}", e))
        })?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TransferableError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, applying its declared indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, TransferableError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Check the connection is still alive
    pub async fn ping(&self) -> bool {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .is_ok()
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Open a collection and apply schema-declared indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, TransferableError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), TransferableError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| TransferableError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, TransferableError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| TransferableError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TransferableError::Database("Failed to get inserted ID".into()))
    }

    /// Insert many documents, stamping metadata timestamps on each
    pub async fn insert_many(&self, items: Vec<T>) -> Result<usize, TransferableError> {
        if items.is_empty() {
            return Ok(0);
        }

        let stamped: Vec<T> = items
            .into_iter()
            .map(|mut item| {
                let metadata = item.mut_metadata();
                metadata.is_deleted = false;
                metadata.created_at = Some(DateTime::now());
                metadata.updated_at = Some(DateTime::now());
                item
            })
            .collect();

        let result = self
            .inner
            .insert_many(stamped)
            .await
            .map_err(|e| TransferableError::Database(format!("Insert failed: {}", e)))?;

        Ok(result.inserted_ids.len())
    }

    /// Find one document by filter, skipping soft-deleted rows
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, TransferableError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| TransferableError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter, skipping soft-deleted rows
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, TransferableError> {
        self.find_many_with(filter, None, None).await
    }

    /// Find many documents with optional sort and limit
    pub async fn find_many_with(
        &self,
        filter: Document,
        sort: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<T>, TransferableError> {
        use futures_util::StreamExt;

        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let options = FindOptions::builder().sort(sort).limit(limit).build();

        let cursor = self
            .inner
            .find(full_filter)
            .with_options(options)
            .await
            .map_err(|e| TransferableError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Count documents matching a filter, skipping soft-deleted rows
    pub async fn count(&self, filter: Document) -> Result<u64, TransferableError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .count_documents(full_filter)
            .await
            .map_err(|e| TransferableError::Database(format!("Count failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, TransferableError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| TransferableError::Database(format!("Update failed: {}", e)))
    }

    /// Update many documents
    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, TransferableError> {
        self.inner
            .update_many(filter, update)
            .await
            .map_err(|e| TransferableError::Database(format!("Update failed: {}", e)))
    }

    /// Hard-delete all documents matching a filter
    pub async fn delete_many(&self, filter: Document) -> Result<DeleteResult, TransferableError> {
        self.inner
            .delete_many(filter)
            .await
            .map_err(|e| TransferableError::Database(format!("Delete failed: {}", e)))
    }

    /// Replace the whole child collection under a parent: delete every row
    /// matching `parent_filter`, then insert `items` fresh.
    ///
    /// This is the explicit replace-all lifecycle used by activities and
    /// milestones. The two steps are sequential, not transactional; a
    /// concurrent replace from another request is last-writer-wins.
    pub async fn replace_all(
        &self,
        parent_filter: Document,
        items: Vec<T>,
    ) -> Result<usize, TransferableError> {
        self.delete_many(parent_filter).await?;
        self.insert_many(items).await
    }

    /// Soft delete documents matching a filter
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, TransferableError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}
