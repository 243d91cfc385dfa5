//! Billing collaborator client and webhook verification
//!
//! Checkout sessions are created by the external billing processor; we
//! only hold the resulting redirect URL. Webhook authenticity uses a
//! shared-secret digest over the raw payload; provider-grade signature
//! schemes (timestamped HMAC, key rotation) are the processor's concern.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::{Result, TransferableError};

/// Header carrying the webhook payload digest
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-billing-signature";

/// A created checkout session
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Redirect URL for the client to complete payment
    pub url: String,
    pub session_id: String,
}

#[derive(Serialize)]
struct CheckoutRequest<'a> {
    customer_ref: &'a str,
    plan_id: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
}

/// HTTP client for the billing collaborator
pub struct BillingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BillingClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Ask the processor for a checkout session for one customer and plan
    pub async fn create_checkout(
        &self,
        customer_ref: &str,
        plan_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);
        debug!(url = %url, customer = %customer_ref, "Creating checkout session");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CheckoutRequest {
                customer_ref,
                plan_id,
                success_url,
                cancel_url,
            })
            .send()
            .await
            .map_err(|e| TransferableError::Upstream(format!("checkout request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(TransferableError::Upstream(format!(
                "billing service returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TransferableError::Upstream(format!("checkout response invalid: {e}")))
    }
}

/// Verify the shared-secret digest over a raw webhook payload.
///
/// The expected signature is `hex(sha256("{secret}." payload))`.
/// Comparison walks the full length regardless of where a mismatch occurs.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b".");
    hasher.update(payload);
    let expected = hex::encode(hasher.finalize());

    let provided = signature_hex.trim().to_lowercase();
    if provided.len() != expected.len() {
        return false;
    }

    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Webhook event envelope from the billing processor
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Event type, e.g. "checkout.completed" or "subscription.canceled"
    #[serde(rename = "type")]
    pub event_type: String,
    /// Our customer reference (the identity-provider user id)
    pub customer_ref: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.update(b".");
        hasher.update(payload);
        hex::encode(hasher.finalize())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"type":"checkout.completed","customerRef":"user_1"}"#;
        let sig = sign("whsec_test", payload);
        assert!(verify_webhook_signature("whsec_test", payload, &sig));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let sig = sign("whsec_other", payload);
        assert!(!verify_webhook_signature("whsec_test", payload, &sig));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let sig = sign("whsec_test", b"{\"amount\":100}");
        assert!(!verify_webhook_signature("whsec_test", b"{\"amount\":999}", &sig));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        assert!(!verify_webhook_signature("whsec_test", b"{}", ""));
        assert!(!verify_webhook_signature("whsec_test", b"{}", "zz"));
    }

    #[test]
    fn test_signature_case_insensitive() {
        let payload = b"{}";
        let sig = sign("whsec_test", payload).to_uppercase();
        assert!(verify_webhook_signature("whsec_test", payload, &sig));
    }

    #[test]
    fn test_event_parse() {
        let event: WebhookEvent = serde_json::from_slice(
            br#"{"type":"checkout.completed","customerRef":"user_9"}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "checkout.completed");
        assert_eq!(event.customer_ref, "user_9");
    }
}
