//! Advisory AI endpoints
//!
//! ## Endpoints
//!
//! - `POST /api/ai-counselor` - Transfer counseling chat (premium)
//! - `POST /api/homework-help` - Course help (premium)
//! - `POST /api/applications/ai-feedback` - Essay feedback (premium)
//! - `POST /api/transfer-prediction` - Admission likelihood text (any tier)
//!
//! The premium gate runs before anything touches the completion service;
//! a FREE-tier caller gets 403 and no outbound call is attempted. When no
//! completion API key is configured the endpoints degrade to a fixed
//! explanatory message instead of erroring.

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{EssayDoc, UserDoc, ESSAY_COLLECTION};
use crate::routes::applications;
use crate::routes::{
    error_response, error_to_response, json_response, parse_json_body, parse_object_id,
    require_premium, require_user, FullBody,
};
use crate::server::AppState;
use crate::services::{CompletionService, DEGRADED_MESSAGE};
use crate::types::{Result, TransferableError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounselorRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkRequest {
    #[serde(default)]
    pub subject: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayFeedbackRequest {
    pub application_id: String,
    pub essay_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorResponse {
    pub message: String,
    pub degraded: bool,
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for the advisory endpoints (dispatched by full path)
pub async fn handle_advisor_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    match (req.method().clone(), path) {
        (Method::POST, "/api/ai-counselor") => handle_counselor(req, state).await,
        (Method::POST, "/api/homework-help") => handle_homework(req, state).await,
        (Method::POST, "/api/applications/ai-feedback") => handle_essay_feedback(req, state).await,
        (Method::POST, "/api/transfer-prediction") => handle_prediction(req, state).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

/// Run one completion, or degrade when the service is unconfigured
async fn complete_or_degrade(
    service: Option<&Arc<dyn CompletionService>>,
    system: &str,
    prompt: &str,
) -> Result<AdvisorResponse> {
    match service {
        Some(completion) => {
            let message = completion.complete(system, prompt).await?;
            Ok(AdvisorResponse {
                message,
                degraded: false,
            })
        }
        None => Ok(AdvisorResponse {
            message: DEGRADED_MESSAGE.to_string(),
            degraded: true,
        }),
    }
}

/// POST /api/ai-counselor (premium)
async fn handle_counselor(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };
    // Gate before anything reaches the completion service.
    if let Err(e) = require_premium(&user) {
        return error_to_response(&e);
    }

    let body: CounselorRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };
    if body.question.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "question is required",
            Some("VALIDATION"),
        );
    }

    let system = "You are a community-college transfer counselor. Give specific, \
                  actionable advice about transferring to four-year universities.";
    let prompt = format!(
        "Student profile: college={}, major={}, targets={}.\n\nQuestion: {}",
        user.community_college,
        user.current_major,
        user.target_universities.join(", "),
        body.question.trim()
    );

    match complete_or_degrade(state.completion.as_ref(), system, &prompt).await {
        Ok(response) => {
            if !response.degraded {
                state
                    .usage
                    .log_ai_completion(&claims.sub, "/api/ai-counselor")
                    .await;
            }
            json_response(StatusCode::OK, &response)
        }
        Err(e) => error_to_response(&e),
    }
}

/// POST /api/homework-help (premium)
async fn handle_homework(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };
    if let Err(e) = require_premium(&user) {
        return error_to_response(&e);
    }

    let body: HomeworkRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };
    if body.question.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "question is required",
            Some("VALIDATION"),
        );
    }

    let system = "You are a patient tutor for community-college coursework. Explain \
                  step by step; do not just give the final answer.";
    let prompt = if body.subject.trim().is_empty() {
        body.question.trim().to_string()
    } else {
        format!("Subject: {}\n\n{}", body.subject.trim(), body.question.trim())
    };

    match complete_or_degrade(state.completion.as_ref(), system, &prompt).await {
        Ok(response) => {
            if !response.degraded {
                state
                    .usage
                    .log_ai_completion(&claims.sub, "/api/homework-help")
                    .await;
            }
            json_response(StatusCode::OK, &response)
        }
        Err(e) => error_to_response(&e),
    }
}

/// POST /api/applications/ai-feedback (premium, owner-checked)
async fn handle_essay_feedback(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let (claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };
    if let Err(e) = require_premium(&user) {
        return error_to_response(&e);
    }

    let body: EssayFeedbackRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match essay_feedback(&state, &user, &body).await {
        Ok(response) => {
            if !response.degraded {
                state
                    .usage
                    .log_ai_completion(&claims.sub, "/api/applications/ai-feedback")
                    .await;
            }
            json_response(StatusCode::OK, &response)
        }
        Err(e) => error_to_response(&e),
    }
}

async fn essay_feedback(
    state: &AppState,
    user: &UserDoc,
    body: &EssayFeedbackRequest,
) -> Result<AdvisorResponse> {
    let application = applications::owned_application(state, user, &body.application_id).await?;
    let essay_id = parse_object_id(&body.essay_id, "essay")?;

    let essays = state.mongo.collection::<EssayDoc>(ESSAY_COLLECTION).await?;
    let essay = essays
        .find_one(doc! { "_id": essay_id, "application_id": application._id })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Essay not found".into()))?;

    if essay.content.trim().is_empty() {
        return Err(TransferableError::Validation(
            "Essay has no content to review".into(),
        ));
    }

    let system = "You review UC transfer application essays. Comment on how well the \
                  response answers the prompt, its structure, and its specificity.";
    let prompt = format!("Prompt: {}\n\nEssay:\n{}", essay.prompt, essay.content);

    let response = complete_or_degrade(state.completion.as_ref(), system, &prompt).await?;

    // Persist real feedback on the essay; the degraded message is not
    // feedback and is not stored.
    if !response.degraded {
        essays
            .update_one(
                doc! { "_id": essay_id },
                doc! { "$set": {
                    "feedback": &response.message,
                    "metadata.updated_at": bson::DateTime::now(),
                }},
            )
            .await?;
    }

    Ok(response)
}

/// POST /api/transfer-prediction (any authenticated tier)
async fn handle_prediction(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let system = "You estimate, in plain language, how prepared a community-college \
                  student is to transfer, based on their profile. Be encouraging but \
                  concrete about gaps.";
    let prompt = format!(
        "College: {}\nMajor: {}\nTarget universities: {}",
        user.community_college,
        user.current_major,
        user.target_universities.join(", ")
    );

    match complete_or_degrade(state.completion.as_ref(), system, &prompt).await {
        Ok(response) => {
            if !response.degraded {
                state
                    .usage
                    .log_ai_completion(&claims.sub, "/api/transfer-prediction")
                    .await;
            }
            json_response(StatusCode::OK, &response)
        }
        Err(e) => error_to_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::SubscriptionTier;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCompletion {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionService for CountingCompletion {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("advice".to_string())
        }
    }

    #[test]
    fn test_free_tier_is_gated_before_any_completion() {
        let mut user = UserDoc::new("user_free".into(), "free@example.edu".into());
        user.subscription_tier = SubscriptionTier::Free;

        // The gate is the first check; a Forbidden here means the handler
        // returns before complete_or_degrade ever runs.
        let gate = require_premium(&user);
        assert!(matches!(gate, Err(TransferableError::Forbidden(_))));

        let mut premium = UserDoc::new("user_premium".into(), "paid@example.edu".into());
        premium.subscription_tier = SubscriptionTier::Premium;
        assert!(require_premium(&premium).is_ok());
    }

    #[test]
    fn test_degraded_without_service() {
        let response =
            tokio_test::block_on(complete_or_degrade(None, "system", "prompt")).unwrap();
        assert!(response.degraded);
        assert_eq!(response.message, DEGRADED_MESSAGE);
    }

    #[test]
    fn test_completion_used_when_configured() {
        let concrete = Arc::new(CountingCompletion {
            calls: AtomicUsize::new(0),
        });
        let service: Arc<dyn CompletionService> = concrete.clone();

        let response =
            tokio_test::block_on(complete_or_degrade(Some(&service), "system", "prompt")).unwrap();
        assert!(!response.degraded);
        assert_eq!(response.message, "advice");
        assert_eq!(concrete.calls.load(Ordering::SeqCst), 1);
    }
}
