//! Outbound collaborator services
//!
//! The identity provider, billing processor, and text-completion service
//! are external collaborators. Failures surface immediately as upstream
//! errors; no retry or custom timeout logic beyond client defaults.

pub mod billing;
pub mod completion;

pub use billing::{
    verify_webhook_signature, BillingClient, CheckoutSession, WebhookEvent,
    WEBHOOK_SIGNATURE_HEADER,
};
pub use completion::{CompletionService, HttpCompletionClient, DEGRADED_MESSAGE};
