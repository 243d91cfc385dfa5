//! Mentor directory, mentorship requests, and chat endpoints
//!
//! ## Endpoints
//!
//! - `GET  /api/mentors` - Directory of available, verified mentors
//! - `POST /api/mentors/apply` - Submit a mentor application
//! - `POST /api/mentors/request` - Request mentorship from a mentor
//! - `GET  /api/mentors/requests` - Requests involving the caller
//! - `PATCH /api/mentors/requests/{id}` - Mentor accepts/declines
//! - `POST /api/mentors/chat` - Send a message on a request
//! - `GET  /api/mentors/chat?requestId=&since=` - Poll messages
//!
//! Applications require at least two specialties and a valid-looking
//! email, and are limited to one profile per user. New profiles start
//! unapproved and only appear in the directory after out-of-band review.
//! Chat is polling-based; fetching marks messages to the caller read.

use bson::{doc, oid::ObjectId};
use chrono::Utc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{
    MentorProfileDoc, MentorshipRequestDoc, MessageDoc, RequestStatus, UniversityDoc, UserDoc,
    MENTORSHIP_REQUEST_COLLECTION, MENTOR_PROFILE_COLLECTION, MESSAGE_COLLECTION,
    UNIVERSITY_COLLECTION, USER_COLLECTION,
};
use crate::routes::{
    error_response, error_to_response, json_response, parse_json_body, parse_object_id,
    query_param, require_user, FullBody, SuccessResponse,
};
use crate::server::AppState;
use crate::types::{Result, TransferableError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorApplicationRequest {
    #[serde(default)]
    pub university_id: String,
    #[serde(default)]
    pub university_code: String,
    #[serde(default)]
    pub university_name: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub verification_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorshipRequestInput {
    pub mentor_profile_id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestStatusInput {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub request_id: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorSummary {
    pub id: String,
    pub name: String,
    pub university_name: String,
    pub major: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    pub bio: String,
    pub specialties: Vec<String>,
    pub rating: f64,
    pub total_sessions: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: String,
    pub topic: String,
    pub message: String,
    pub status: RequestStatus,
    /// "student" or "mentor", from the caller's point of view
    pub role: String,
    pub counterpart_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub request_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
    pub is_read: bool,
    pub mine: bool,
}

// =============================================================================
// Validation
// =============================================================================

/// Minimal shape check for a verification email: one `@`, a non-empty
/// local part, and a dotted domain with no whitespace.
pub fn looks_like_email(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /api/mentors/* routes
pub async fn handle_mentors_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/mentors").unwrap_or("");

    match (method, subpath) {
        (Method::GET, "") | (Method::GET, "/") => handle_directory(req, state).await,
        (Method::POST, "/apply") => handle_apply(req, state).await,
        (Method::POST, "/request") => handle_create_request(req, state).await,
        (Method::GET, "/requests") => handle_list_requests(req, state).await,
        (Method::PATCH, p) if p.starts_with("/requests/") => {
            let id = p.strip_prefix("/requests/").unwrap_or("");
            handle_update_request(req, state, &id.to_string()).await
        }
        (Method::POST, "/chat") => handle_send_message(req, state).await,
        (Method::GET, "/chat") => handle_poll_messages(req, state).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

// =============================================================================
// Directory & Application
// =============================================================================

/// GET /api/mentors - available, verified mentors only
async fn handle_directory(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, _user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    match load_directory(&state).await {
        Ok(list) => json_response(StatusCode::OK, &list),
        Err(e) => error_to_response(&e),
    }
}

async fn load_directory(state: &AppState) -> Result<Vec<MentorSummary>> {
    let profiles = state
        .mongo
        .collection::<MentorProfileDoc>(MENTOR_PROFILE_COLLECTION)
        .await?
        .find_many_with(
            doc! { "is_available": true, "is_verified": true },
            Some(doc! { "rating": -1 }),
            None,
        )
        .await?;

    if profiles.is_empty() {
        return Ok(Vec::new());
    }

    let university_ids: Vec<ObjectId> = profiles.iter().map(|p| p.university_id).collect();
    let university_names: HashMap<ObjectId, String> = state
        .mongo
        .collection::<UniversityDoc>(UNIVERSITY_COLLECTION)
        .await?
        .find_many(doc! { "_id": { "$in": university_ids } })
        .await?
        .into_iter()
        .filter_map(|u| u._id.map(|id| (id, u.name)))
        .collect();

    let user_ids: Vec<ObjectId> = profiles.iter().map(|p| p.user_id).collect();
    let users = state
        .mongo
        .collection::<UserDoc>(USER_COLLECTION)
        .await?
        .find_many(doc! { "_id": { "$in": user_ids } })
        .await?;
    let display_names: HashMap<ObjectId, String> = users
        .into_iter()
        .filter_map(|u| {
            u._id
                .map(|id| (id, format!("{} {}", u.first_name, u.last_name).trim().to_string()))
        })
        .collect();

    Ok(profiles
        .iter()
        .map(|p| MentorSummary {
            id: p._id.map(|o| o.to_hex()).unwrap_or_default(),
            name: display_names.get(&p.user_id).cloned().unwrap_or_default(),
            university_name: university_names
                .get(&p.university_id)
                .cloned()
                .unwrap_or_default(),
            major: p.major.clone(),
            graduation_year: p.graduation_year,
            bio: p.bio.clone(),
            specialties: p.specialties.clone(),
            rating: p.rating,
            total_sessions: p.total_sessions,
        })
        .collect())
}

/// POST /api/mentors/apply - one profile per user, unapproved at creation
async fn handle_apply(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: MentorApplicationRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match apply_as_mentor(&state, &user, &body).await {
        Ok(()) => json_response(
            StatusCode::CREATED,
            &SuccessResponse {
                success: true,
                message: "Mentor application submitted for review".into(),
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn apply_as_mentor(
    state: &AppState,
    user: &UserDoc,
    body: &MentorApplicationRequest,
) -> Result<()> {
    let specialties: Vec<String> = body
        .specialties
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if specialties.len() < 2 {
        return Err(TransferableError::Validation(
            "At least two specialties are required".into(),
        ));
    }

    if !looks_like_email(&body.verification_email) {
        return Err(TransferableError::Validation(
            "A valid verification email is required".into(),
        ));
    }

    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    let profiles = state
        .mongo
        .collection::<MentorProfileDoc>(MENTOR_PROFILE_COLLECTION)
        .await?;

    // One profile per user.
    if profiles
        .find_one(doc! { "user_id": user_id })
        .await?
        .is_some()
    {
        return Err(TransferableError::Validation(
            "You have already applied as a mentor".into(),
        ));
    }

    let university = state
        .resolver
        .resolve_university(&[
            body.university_id.as_str(),
            body.university_code.as_str(),
            body.university_name.as_str(),
        ])
        .await?;
    let university_id = university
        ._id
        .ok_or_else(|| TransferableError::Database("University row missing id".into()))?;

    profiles
        .insert_one(MentorProfileDoc {
            _id: None,
            metadata: Default::default(),
            user_id,
            university_id,
            major: body.major.trim().to_string(),
            graduation_year: body.graduation_year,
            bio: body.bio.trim().to_string(),
            specialties,
            is_available: false,
            is_verified: false,
            verification_email: body.verification_email.trim().to_string(),
            rating: 0.0,
            total_sessions: 0,
        })
        .await?;

    info!(user = %user.clerk_id, "Mentor application submitted");
    Ok(())
}

// =============================================================================
// Mentorship Requests
// =============================================================================

/// POST /api/mentors/request
async fn handle_create_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: MentorshipRequestInput = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match create_request(&state, &user, &body).await {
        Ok(id) => json_response(
            StatusCode::CREATED,
            &serde_json::json!({ "success": true, "requestId": id }),
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn create_request(
    state: &AppState,
    user: &UserDoc,
    body: &MentorshipRequestInput,
) -> Result<String> {
    let profile_id = parse_object_id(&body.mentor_profile_id, "mentor")?;
    let student_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    let profile = state
        .mongo
        .collection::<MentorProfileDoc>(MENTOR_PROFILE_COLLECTION)
        .await?
        .find_one(doc! { "_id": profile_id, "is_available": true, "is_verified": true })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Mentor not found".into()))?;

    if profile.user_id == student_id {
        return Err(TransferableError::Validation(
            "You cannot request mentorship from yourself".into(),
        ));
    }

    let requests = state
        .mongo
        .collection::<MentorshipRequestDoc>(MENTORSHIP_REQUEST_COLLECTION)
        .await?;

    let id = requests
        .insert_one(MentorshipRequestDoc {
            _id: None,
            metadata: Default::default(),
            student_id,
            mentor_id: profile.user_id,
            message: body.message.trim().to_string(),
            topic: body.topic.trim().to_string(),
            status: RequestStatus::Pending,
        })
        .await?;

    Ok(id.to_hex())
}

/// GET /api/mentors/requests - both directions for the caller
async fn handle_list_requests(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    match list_requests(&state, &user).await {
        Ok(list) => json_response(StatusCode::OK, &list),
        Err(e) => error_to_response(&e),
    }
}

async fn list_requests(state: &AppState, user: &UserDoc) -> Result<Vec<RequestSummary>> {
    let user_id = match user._id {
        Some(id) => id,
        None => return Ok(Vec::new()),
    };

    let requests = state
        .mongo
        .collection::<MentorshipRequestDoc>(MENTORSHIP_REQUEST_COLLECTION)
        .await?
        .find_many(doc! {
            "$or": [ { "student_id": user_id }, { "mentor_id": user_id } ]
        })
        .await?;

    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let counterpart_ids: Vec<ObjectId> = requests
        .iter()
        .map(|r| if r.student_id == user_id { r.mentor_id } else { r.student_id })
        .collect();
    let counterparts: HashMap<ObjectId, String> = state
        .mongo
        .collection::<UserDoc>(USER_COLLECTION)
        .await?
        .find_many(doc! { "_id": { "$in": counterpart_ids } })
        .await?
        .into_iter()
        .filter_map(|u| {
            u._id
                .map(|id| (id, format!("{} {}", u.first_name, u.last_name).trim().to_string()))
        })
        .collect();

    Ok(requests
        .iter()
        .map(|r| {
            let (role, counterpart) = if r.student_id == user_id {
                ("student", r.mentor_id)
            } else {
                ("mentor", r.student_id)
            };
            RequestSummary {
                id: r._id.map(|o| o.to_hex()).unwrap_or_default(),
                topic: r.topic.clone(),
                message: r.message.clone(),
                status: r.status,
                role: role.to_string(),
                counterpart_name: counterparts.get(&counterpart).cloned().unwrap_or_default(),
            }
        })
        .collect())
}

/// PATCH /api/mentors/requests/{id} - mentor accepts or declines
async fn handle_update_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    request_id: &str,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: UpdateRequestStatusInput = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match update_request_status(&state, &user, request_id, &body.status).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Request updated".into(),
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn update_request_status(
    state: &AppState,
    user: &UserDoc,
    request_id: &str,
    raw_status: &str,
) -> Result<()> {
    let status: RequestStatus = raw_status.parse().map_err(|_| {
        TransferableError::Validation(format!("Unknown request status \"{raw_status}\""))
    })?;

    let oid = parse_object_id(request_id, "request")?;
    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    let requests = state
        .mongo
        .collection::<MentorshipRequestDoc>(MENTORSHIP_REQUEST_COLLECTION)
        .await?;
    let request = requests
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Request not found".into()))?;

    // Only the mentor moves a request through its lifecycle.
    if request.mentor_id != user_id {
        return Err(TransferableError::Forbidden(
            "Only the mentor can update this request".into(),
        ));
    }

    requests
        .update_one(
            doc! { "_id": oid },
            doc! { "$set": {
                "status": bson::to_bson(&status)
                    .map_err(|e| TransferableError::Database(e.to_string()))?,
                "metadata.updated_at": bson::DateTime::now(),
            }},
        )
        .await?;

    Ok(())
}

// =============================================================================
// Chat (polling)
// =============================================================================

/// POST /api/mentors/chat - sender must be a participant
async fn handle_send_message(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: SendMessageRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match send_message(&state, &user, &body).await {
        Ok(message) => json_response(StatusCode::CREATED, &message),
        Err(e) => error_to_response(&e),
    }
}

async fn send_message(
    state: &AppState,
    user: &UserDoc,
    body: &SendMessageRequest,
) -> Result<MessageResponse> {
    if body.content.trim().is_empty() {
        return Err(TransferableError::Validation(
            "Message content is required".into(),
        ));
    }

    let request_id = parse_object_id(&body.request_id, "request")?;
    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    let request = state
        .mongo
        .collection::<MentorshipRequestDoc>(MENTORSHIP_REQUEST_COLLECTION)
        .await?
        .find_one(doc! { "_id": request_id })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Request not found".into()))?;

    if !request.is_participant(&user_id) {
        return Err(TransferableError::Forbidden(
            "You are not a participant in this conversation".into(),
        ));
    }

    let mut message = MessageDoc {
        _id: None,
        metadata: Default::default(),
        request_id,
        sender_id: user_id,
        content: body.content.trim().to_string(),
        created_at: bson::DateTime::now(),
        is_read: false,
    };

    let id = state
        .mongo
        .collection::<MessageDoc>(MESSAGE_COLLECTION)
        .await?
        .insert_one(message.clone())
        .await?;
    message._id = Some(id);

    Ok(message_body(&message, user_id))
}

/// GET /api/mentors/chat?requestId=&since= - poll; marks inbound read
async fn handle_poll_messages(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let query = req.uri().query();
    let request_id = match query_param(query, "requestId") {
        Some(id) => id,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "requestId query parameter is required",
                Some("VALIDATION"),
            )
        }
    };
    let since = query_param(query, "since");

    match poll_messages(&state, &user, &request_id, since.as_deref()).await {
        Ok(messages) => json_response(StatusCode::OK, &messages),
        Err(e) => error_to_response(&e),
    }
}

async fn poll_messages(
    state: &AppState,
    user: &UserDoc,
    request_id: &str,
    since: Option<&str>,
) -> Result<Vec<MessageResponse>> {
    let oid = parse_object_id(request_id, "request")?;
    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    let request = state
        .mongo
        .collection::<MentorshipRequestDoc>(MENTORSHIP_REQUEST_COLLECTION)
        .await?
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Request not found".into()))?;

    if !request.is_participant(&user_id) {
        return Err(TransferableError::Forbidden(
            "You are not a participant in this conversation".into(),
        ));
    }

    let mut filter = doc! { "request_id": oid };
    if let Some(raw) = since {
        let instant = chrono::DateTime::parse_from_rfc3339(raw).map_err(|_| {
            TransferableError::Validation("since must be an RFC3339 timestamp".into())
        })?;
        filter.insert(
            "created_at",
            doc! { "$gt": bson::DateTime::from_chrono(instant.with_timezone(&Utc)) },
        );
    }

    let messages = state
        .mongo
        .collection::<MessageDoc>(MESSAGE_COLLECTION)
        .await?;
    let list = messages
        .find_many_with(filter, Some(doc! { "created_at": 1 }), None)
        .await?;

    // Fetching marks messages addressed to the caller as read.
    messages
        .update_many(
            doc! {
                "request_id": oid,
                "sender_id": { "$ne": user_id },
                "is_read": false,
            },
            doc! { "$set": { "is_read": true } },
        )
        .await?;

    Ok(list.iter().map(|m| message_body(m, user_id)).collect())
}

fn message_body(message: &MessageDoc, viewer: ObjectId) -> MessageResponse {
    MessageResponse {
        id: message._id.map(|o| o.to_hex()).unwrap_or_default(),
        request_id: message.request_id.to_hex(),
        sender_id: message.sender_id.to_hex(),
        content: message.content.clone(),
        created_at: message.created_at.to_chrono().to_rfc3339(),
        is_read: message.is_read,
        mine: message.sender_id == viewer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("mentor@ucla.edu"));
        assert!(looks_like_email("first.last@mail.berkeley.edu"));
        assert!(!looks_like_email("not-an-email"));
        assert!(!looks_like_email("missing@domain"));
        assert!(!looks_like_email("@ucla.edu"));
        assert!(!looks_like_email("two@@ucla.edu"));
        assert!(!looks_like_email("spaced out@ucla.edu"));
        assert!(!looks_like_email("dot@.edu"));
        assert!(!looks_like_email(""));
    }

    #[test]
    fn test_specialties_minimum() {
        let raw = vec!["essays".to_string(), "  ".to_string()];
        let cleaned: Vec<String> = raw
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        assert!(cleaned.len() < 2, "blank specialties must not count");
    }
}
