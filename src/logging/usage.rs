//! Usage-event logging for billing and analytics
//!
//! Billable and tier-relevant events are appended in JSONL format so the
//! billing pipeline can consume them without touching the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Usage event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A completion-service call on behalf of a premium user
    AiCompletion,
    /// A checkout session was created
    CheckoutCreated,
    /// A webhook changed a user's subscription tier
    TierChanged,
    /// An admin catalog import ran
    CatalogImport,
}

/// Usage event for billing/analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Node that handled the request
    pub node_id: String,
    /// Identity-provider user reference, when authenticated
    pub user_id: Option<String>,
    /// Endpoint or operation name
    pub operation: Option<String>,
    /// Additional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl UsageEvent {
    pub fn new(event_type: EventType, node_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            node_id,
            user_id: None,
            operation: None,
            metadata: None,
        }
    }

    pub fn with_user(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_operation(mut self, operation: String) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Convert to a JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Usage logger that appends events to a JSONL file
#[derive(Clone)]
pub struct UsageLogger {
    inner: Arc<Mutex<UsageLoggerInner>>,
    node_id: String,
}

struct UsageLoggerInner {
    writer: Option<BufWriter<File>>,
}

impl UsageLogger {
    /// Create a logger with no sink; events are dropped until `init_file`
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(UsageLoggerInner { writer: None })),
            node_id,
        }
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));

        info!("Usage logging initialized to {}", path.display());
        Ok(())
    }

    /// Log a usage event
    pub async fn log(&self, event: UsageEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize usage event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write usage event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush usage log: {}", e);
            }
        }
    }

    /// Log a completion-service call
    pub async fn log_ai_completion(&self, user_id: &str, endpoint: &str) {
        let event = UsageEvent::new(EventType::AiCompletion, self.node_id.clone())
            .with_user(user_id.to_string())
            .with_operation(endpoint.to_string());
        self.log(event).await;
    }

    /// Log a checkout session creation
    pub async fn log_checkout_created(&self, user_id: &str, plan_id: &str) {
        let event = UsageEvent::new(EventType::CheckoutCreated, self.node_id.clone())
            .with_user(user_id.to_string())
            .with_metadata(serde_json::json!({ "planId": plan_id }));
        self.log(event).await;
    }

    /// Log a subscription-tier change from a webhook
    pub async fn log_tier_changed(&self, user_id: &str, tier: &str) {
        let event = UsageEvent::new(EventType::TierChanged, self.node_id.clone())
            .with_user(user_id.to_string())
            .with_metadata(serde_json::json!({ "tier": tier }));
        self.log(event).await;
    }

    /// Log an admin catalog import
    pub async fn log_catalog_import(&self, user_id: &str, imported: usize, errors: usize) {
        let event = UsageEvent::new(EventType::CatalogImport, self.node_id.clone())
            .with_user(user_id.to_string())
            .with_metadata(serde_json::json!({ "imported": imported, "errors": errors }));
        self.log(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_to_single_line() {
        let event = UsageEvent::new(EventType::AiCompletion, "node-1".into())
            .with_user("user_abc".into())
            .with_operation("/api/ai-counselor".into());

        let line = event.to_jsonl().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("ai_completion"));
        assert!(line.contains("user_abc"));
    }
}
