//! Logging infrastructure for transferable
//!
//! Structured JSONL usage events for billing and analytics.

pub mod usage;

pub use usage::{EventType, UsageEvent, UsageLogger};
