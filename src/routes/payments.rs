//! Billing endpoints
//!
//! ## Endpoints
//!
//! - `POST /api/payments/create-checkout` - Ask the billing collaborator
//!   for a premium checkout session
//! - `POST /api/payments/webhook` - Signature-checked tier updates
//!
//! The webhook is unauthenticated but must carry a valid shared-secret
//! digest over the raw payload. Unknown event types are acknowledged and
//! ignored so the processor does not retry them forever.

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{SubscriptionTier, UserDoc, USER_COLLECTION};
use crate::routes::{
    error_response, error_to_response, json_response, read_raw_body, require_user, FullBody,
};
use crate::server::AppState;
use crate::services::{verify_webhook_signature, WebhookEvent, WEBHOOK_SIGNATURE_HEADER};
use crate::types::{Result, TransferableError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Main handler for /api/payments/* routes
pub async fn handle_payments_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/payments").unwrap_or("");

    match (method, subpath) {
        (Method::POST, "/create-checkout") => handle_create_checkout(req, state).await,
        (Method::POST, "/webhook") => handle_webhook(req, state).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

/// POST /api/payments/create-checkout
async fn handle_create_checkout(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let (claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    if user.is_premium() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "You already have a premium subscription",
            Some("VALIDATION"),
        );
    }

    match create_checkout(&state, &claims.sub).await {
        Ok(url) => {
            state
                .usage
                .log_checkout_created(&claims.sub, &state.args.premium_plan_id)
                .await;
            json_response(StatusCode::OK, &CheckoutResponse { url })
        }
        Err(e) => error_to_response(&e),
    }
}

async fn create_checkout(state: &AppState, customer_ref: &str) -> Result<String> {
    match &state.billing {
        Some(billing) => {
            let session = billing
                .create_checkout(
                    customer_ref,
                    &state.args.premium_plan_id,
                    &state.args.checkout_success_url,
                    &state.args.checkout_cancel_url,
                )
                .await?;
            Ok(session.url)
        }
        None if state.args.dev_mode => {
            // Dev mode without a billing collaborator short-circuits to the
            // success URL so the flow stays walkable locally.
            Ok(state.args.checkout_success_url.clone())
        }
        None => Err(TransferableError::Upstream(
            "billing service not configured".into(),
        )),
    }
}

/// POST /api/payments/webhook - signature-checked tier change
async fn handle_webhook(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let secret = match &state.args.billing_webhook_secret {
        Some(s) => s.clone(),
        None => {
            warn!("Webhook received but BILLING_WEBHOOK_SECRET is not configured");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook secret not configured",
                Some("CONFIG_ERROR"),
            );
        }
    };

    let signature = req
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let payload = match read_raw_body(req).await {
        Ok(p) => p,
        Err(e) => return error_to_response(&e),
    };

    let signature = match signature {
        Some(s) => s,
        None => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "Missing webhook signature",
                Some("UNAUTHENTICATED"),
            )
        }
    };

    if !verify_webhook_signature(&secret, &payload, &signature) {
        warn!("Webhook signature verification failed");
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid webhook signature",
            Some("UNAUTHENTICATED"),
        );
    }

    let event: WebhookEvent = match serde_json::from_slice(&payload) {
        Ok(e) => e,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid webhook payload: {e}"),
                Some("VALIDATION"),
            )
        }
    };

    match apply_webhook_event(&state, &event).await {
        Ok(()) => json_response(StatusCode::OK, &WebhookAck { received: true }),
        Err(e) => error_to_response(&e),
    }
}

async fn apply_webhook_event(state: &AppState, event: &WebhookEvent) -> Result<()> {
    let tier = match event.event_type.as_str() {
        "checkout.completed" => SubscriptionTier::Premium,
        "subscription.canceled" => SubscriptionTier::Free,
        other => {
            // Acknowledge unknown events without acting on them.
            info!(event_type = %other, "Ignoring unhandled webhook event");
            return Ok(());
        }
    };

    let users = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;
    let result = users
        .update_one(
            doc! { "clerk_id": &event.customer_ref },
            doc! { "$set": {
                "subscription_tier": tier.to_string(),
                "metadata.updated_at": bson::DateTime::now(),
            }},
        )
        .await?;

    if result.matched_count == 0 {
        return Err(TransferableError::NotFound(format!(
            "No user for customer reference \"{}\"",
            event.customer_ref
        )));
    }

    info!(customer = %event.customer_ref, tier = %tier, "Subscription tier updated");
    state
        .usage
        .log_tier_changed(&event.customer_ref, &tier.to_string())
        .await;

    Ok(())
}
