//! Application, essay, and activity endpoints
//!
//! ## Endpoints
//!
//! - `GET  /api/applications` - List the caller's applications
//! - `POST /api/applications` - Create an application (deadline required)
//! - `PATCH /api/applications/{id}` - Update status/deadline
//! - `POST /api/applications/{id}/activities` - Replace the activity list
//! - `GET  /api/applications/{id}/essays` - List essays
//! - `POST /api/applications/{id}/essays` - Create an essay
//! - `PATCH /api/applications/{id}/essays/{essay_id}` - Update an essay
//!
//! The university behind a new application is resolved over
//! [universityId, universityCode, universityName]; a placeholder row is
//! created when only a name was given. Activities follow replace-all
//! semantics: every save deletes the previous list and inserts the
//! submitted one.

use bson::{doc, oid::ObjectId};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{
    ActivityDoc, ApplicationDoc, ApplicationStatus, EssayDoc, MajorDoc, UniversityDoc, UserDoc,
    ACTIVITY_COLLECTION, APPLICATION_COLLECTION, ESSAY_COLLECTION, MAJOR_COLLECTION,
    UNIVERSITY_COLLECTION,
};
use crate::routes::{
    error_response, error_to_response, json_response, parse_deadline, parse_json_body,
    parse_object_id, require_user, FullBody, SuccessResponse,
};
use crate::server::AppState;
use crate::types::{Result, TransferableError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub university_id: String,
    #[serde(default)]
    pub university_code: String,
    #[serde(default)]
    pub university_name: String,
    /// Free-text major name or id; empty skips major resolution
    #[serde(default)]
    pub major: String,
    pub deadline: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub hours_per_week: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceActivitiesRequest {
    pub activities: Vec<ActivityInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEssayRequest {
    pub prompt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub is_complete: Option<bool>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEssayRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub is_complete: Option<bool>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: String,
    pub university_id: String,
    pub university_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_name: Option<String>,
    pub deadline: String,
    pub status: ApplicationStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayResponse {
    pub id: String,
    pub application_id: String,
    pub prompt: String,
    pub content: String,
    pub word_count: u32,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /api/applications/* routes
pub async fn handle_applications_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/applications").unwrap_or("");

    match (method, subpath) {
        (Method::GET, "") | (Method::GET, "/") => handle_list(req, state).await,
        (Method::POST, "") | (Method::POST, "/") => handle_create(req, state).await,

        (Method::POST, p) if p.ends_with("/activities") => {
            let id = p
                .strip_prefix('/')
                .and_then(|s| s.strip_suffix("/activities"))
                .unwrap_or("");
            handle_replace_activities(req, state, &id.to_string()).await
        }

        (Method::GET, p) if p.ends_with("/essays") => {
            let id = p
                .strip_prefix('/')
                .and_then(|s| s.strip_suffix("/essays"))
                .unwrap_or("");
            handle_list_essays(req, state, &id.to_string()).await
        }

        (Method::POST, p) if p.ends_with("/essays") => {
            let id = p
                .strip_prefix('/')
                .and_then(|s| s.strip_suffix("/essays"))
                .unwrap_or("");
            handle_create_essay(req, state, &id.to_string()).await
        }

        (Method::PATCH, p) if p.contains("/essays/") => {
            let remainder = p.strip_prefix('/').unwrap_or("");
            let (app_id, essay_id) = match remainder.split_once("/essays/") {
                Some(pair) => pair,
                None => return error_response(StatusCode::NOT_FOUND, "Not found", None),
            };
            handle_update_essay(req, state, &app_id.to_string(), &essay_id.to_string()).await
        }

        (Method::PATCH, p) if p.starts_with('/') && !p[1..].contains('/') => {
            let id = p.trim_start_matches('/');
            handle_update(req, state, &id.to_string()).await
        }

        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// Load an application and verify the caller owns it
pub(crate) async fn owned_application(
    state: &AppState,
    user: &UserDoc,
    application_id: &str,
) -> Result<ApplicationDoc> {
    let oid = parse_object_id(application_id, "application")?;
    let applications = state
        .mongo
        .collection::<ApplicationDoc>(APPLICATION_COLLECTION)
        .await?;

    let application = applications
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Application not found".into()))?;

    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;
    if application.user_id != user_id {
        return Err(TransferableError::Forbidden(
            "You do not own this application".into(),
        ));
    }

    Ok(application)
}

// =============================================================================
// Applications
// =============================================================================

/// GET /api/applications - list with university/major names joined in
async fn handle_list(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    match list_applications(&state, &user).await {
        Ok(list) => json_response(StatusCode::OK, &list),
        Err(e) => error_to_response(&e),
    }
}

async fn list_applications(
    state: &AppState,
    user: &UserDoc,
) -> Result<Vec<ApplicationResponse>> {
    let user_id = match user._id {
        Some(id) => id,
        None => return Ok(Vec::new()),
    };

    let applications = state
        .mongo
        .collection::<ApplicationDoc>(APPLICATION_COLLECTION)
        .await?
        .find_many_with(doc! { "user_id": user_id }, Some(doc! { "deadline": 1 }), None)
        .await?;

    if applications.is_empty() {
        return Ok(Vec::new());
    }

    let university_ids: Vec<ObjectId> = applications.iter().map(|a| a.university_id).collect();
    let universities = state
        .mongo
        .collection::<UniversityDoc>(UNIVERSITY_COLLECTION)
        .await?
        .find_many(doc! { "_id": { "$in": university_ids } })
        .await?;
    let university_names: HashMap<ObjectId, String> = universities
        .into_iter()
        .filter_map(|u| u._id.map(|id| (id, u.name)))
        .collect();

    let major_ids: Vec<ObjectId> = applications.iter().filter_map(|a| a.major_id).collect();
    let major_names: HashMap<ObjectId, String> = if major_ids.is_empty() {
        HashMap::new()
    } else {
        state
            .mongo
            .collection::<MajorDoc>(MAJOR_COLLECTION)
            .await?
            .find_many(doc! { "_id": { "$in": major_ids } })
            .await?
            .into_iter()
            .filter_map(|m| m._id.map(|id| (id, m.name)))
            .collect()
    };

    Ok(applications
        .iter()
        .map(|a| application_body(a, &university_names, &major_names))
        .collect())
}

/// POST /api/applications - create after resolving the university reference
async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: CreateApplicationRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match create_application(&state, &user, &body).await {
        Ok(response) => json_response(StatusCode::CREATED, &response),
        Err(e) => error_to_response(&e),
    }
}

async fn create_application(
    state: &AppState,
    user: &UserDoc,
    body: &CreateApplicationRequest,
) -> Result<ApplicationResponse> {
    // Deadline is validated before any row is touched.
    let deadline = parse_deadline(&body.deadline)?;

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

    let major = state
        .resolver
        .resolve_major(&body.major, university_id)
        .await?;

    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    let application = ApplicationDoc {
        _id: None,
        metadata: Default::default(),
        user_id,
        university_id,
        major_id: major.as_ref().and_then(|m| m._id),
        deadline,
        status: ApplicationStatus::parse_or_default(&body.status),
    };

    let applications = state
        .mongo
        .collection::<ApplicationDoc>(APPLICATION_COLLECTION)
        .await?;
    let id = applications.insert_one(application.clone()).await?;

    info!(
        application = %id.to_hex(),
        university = %university.name,
        "Application created"
    );

    let mut university_names = HashMap::new();
    university_names.insert(university_id, university.name);
    let mut major_names = HashMap::new();
    if let Some(m) = major {
        if let Some(mid) = m._id {
            major_names.insert(mid, m.name);
        }
    }

    let mut saved = application;
    saved._id = Some(id);
    Ok(application_body(&saved, &university_names, &major_names))
}

/// PATCH /api/applications/{id} - owner-checked status/deadline update
async fn handle_update(
    req: Request<Incoming>,
    state: Arc<AppState>,
    application_id: &str,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: UpdateApplicationRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match update_application(&state, &user, application_id, &body).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Application updated".into(),
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn update_application(
    state: &AppState,
    user: &UserDoc,
    application_id: &str,
    body: &UpdateApplicationRequest,
) -> Result<()> {
    let application = owned_application(state, user, application_id).await?;

    let mut update = doc! { "metadata.updated_at": bson::DateTime::now() };
    if let Some(ref status) = body.status {
        let parsed = ApplicationStatus::parse_or_default(status);
        update.insert("status", parsed.to_string());
    }
    if let Some(ref deadline) = body.deadline {
        update.insert("deadline", parse_deadline(deadline)?);
    }

    state
        .mongo
        .collection::<ApplicationDoc>(APPLICATION_COLLECTION)
        .await?
        .update_one(doc! { "_id": application._id }, doc! { "$set": update })
        .await?;

    Ok(())
}

// =============================================================================
// Activities (replace-all)
// =============================================================================

/// POST /api/applications/{id}/activities - full replacement of the list
async fn handle_replace_activities(
    req: Request<Incoming>,
    state: Arc<AppState>,
    application_id: &str,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: ReplaceActivitiesRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match replace_activities(&state, &user, application_id, body.activities).await {
        Ok(count) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: format!("{count} activities saved"),
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn replace_activities(
    state: &AppState,
    user: &UserDoc,
    application_id: &str,
    inputs: Vec<ActivityInput>,
) -> Result<usize> {
    let application = owned_application(state, user, application_id).await?;
    let app_id = application
        ._id
        .ok_or_else(|| TransferableError::Database("Application row missing id".into()))?;

    let mut docs = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.title.trim().is_empty() {
            return Err(TransferableError::Validation(
                "Activity title is required".into(),
            ));
        }
        docs.push(ActivityDoc {
            _id: None,
            metadata: Default::default(),
            application_id: app_id,
            title: input.title.trim().to_string(),
            description: input.description,
            category: input.category,
            start_date: match input.start_date.as_deref() {
                Some(raw) if !raw.trim().is_empty() => Some(parse_deadline(raw)?),
                _ => None,
            },
            end_date: match input.end_date.as_deref() {
                Some(raw) if !raw.trim().is_empty() => Some(parse_deadline(raw)?),
                _ => None,
            },
            hours_per_week: input.hours_per_week,
        });
    }

    state
        .mongo
        .collection::<ActivityDoc>(ACTIVITY_COLLECTION)
        .await?
        .replace_all(doc! { "application_id": app_id }, docs)
        .await
}

// =============================================================================
// Essays
// =============================================================================

/// GET /api/applications/{id}/essays
async fn handle_list_essays(
    req: Request<Incoming>,
    state: Arc<AppState>,
    application_id: &str,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let application = match owned_application(&state, &user, application_id).await {
        Ok(a) => a,
        Err(e) => return error_to_response(&e),
    };

    let essays = match state.mongo.collection::<EssayDoc>(ESSAY_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    match essays
        .find_many(doc! { "application_id": application._id })
        .await
    {
        Ok(list) => {
            let body: Vec<EssayResponse> = list.iter().map(essay_body).collect();
            json_response(StatusCode::OK, &body)
        }
        Err(e) => error_to_response(&e),
    }
}

/// POST /api/applications/{id}/essays - word count derived when absent
async fn handle_create_essay(
    req: Request<Incoming>,
    state: Arc<AppState>,
    application_id: &str,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: CreateEssayRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match create_essay(&state, &user, application_id, body).await {
        Ok(response) => json_response(StatusCode::CREATED, &response),
        Err(e) => error_to_response(&e),
    }
}

async fn create_essay(
    state: &AppState,
    user: &UserDoc,
    application_id: &str,
    body: CreateEssayRequest,
) -> Result<EssayResponse> {
    let application = owned_application(state, user, application_id).await?;
    let app_id = application
        ._id
        .ok_or_else(|| TransferableError::Database("Application row missing id".into()))?;

    if body.prompt.trim().is_empty() {
        return Err(TransferableError::Validation(
            "Essay prompt is required".into(),
        ));
    }

    let word_count = body
        .word_count
        .unwrap_or_else(|| EssayDoc::count_words(&body.content));

    let mut essay = EssayDoc {
        _id: None,
        metadata: Default::default(),
        application_id: app_id,
        prompt: body.prompt.trim().to_string(),
        content: body.content,
        word_count,
        is_complete: body.is_complete.unwrap_or(false),
        feedback: body.feedback,
    };

    let essays = state.mongo.collection::<EssayDoc>(ESSAY_COLLECTION).await?;
    let id = essays.insert_one(essay.clone()).await?;
    essay._id = Some(id);

    Ok(essay_body(&essay))
}

/// PATCH /api/applications/{id}/essays/{essay_id}
async fn handle_update_essay(
    req: Request<Incoming>,
    state: Arc<AppState>,
    application_id: &str,
    essay_id: &str,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: UpdateEssayRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match update_essay(&state, &user, application_id, essay_id, body).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_to_response(&e),
    }
}

async fn update_essay(
    state: &AppState,
    user: &UserDoc,
    application_id: &str,
    essay_id: &str,
    body: UpdateEssayRequest,
) -> Result<EssayResponse> {
    let application = owned_application(state, user, application_id).await?;
    let essay_oid = parse_object_id(essay_id, "essay")?;

    let essays = state.mongo.collection::<EssayDoc>(ESSAY_COLLECTION).await?;
    let mut essay = essays
        .find_one(doc! { "_id": essay_oid, "application_id": application._id })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Essay not found".into()))?;

    if let Some(prompt) = body.prompt {
        essay.prompt = prompt.trim().to_string();
    }
    if let Some(content) = body.content {
        essay.content = content;
        // Recompute unless the client supplied an explicit count below.
        essay.word_count = EssayDoc::count_words(&essay.content);
    }
    if let Some(count) = body.word_count {
        essay.word_count = count;
    }
    // On PATCH an unspecified completion flag follows the word count.
    essay.is_complete = body.is_complete.unwrap_or(essay.word_count > 0);
    if let Some(feedback) = body.feedback {
        essay.feedback = Some(feedback);
    }

    essays
        .update_one(
            doc! { "_id": essay_oid },
            doc! { "$set": {
                "prompt": &essay.prompt,
                "content": &essay.content,
                "word_count": essay.word_count,
                "is_complete": essay.is_complete,
                "feedback": essay.feedback.as_deref().unwrap_or_default(),
                "metadata.updated_at": bson::DateTime::now(),
            }},
        )
        .await?;

    Ok(essay_body(&essay))
}

// =============================================================================
// Conversion Helpers
// =============================================================================

fn application_body(
    application: &ApplicationDoc,
    university_names: &HashMap<ObjectId, String>,
    major_names: &HashMap<ObjectId, String>,
) -> ApplicationResponse {
    ApplicationResponse {
        id: application._id.map(|o| o.to_hex()).unwrap_or_default(),
        university_id: application.university_id.to_hex(),
        university_name: university_names
            .get(&application.university_id)
            .cloned()
            .unwrap_or_default(),
        major_id: application.major_id.map(|o| o.to_hex()),
        major_name: application
            .major_id
            .and_then(|id| major_names.get(&id).cloned()),
        deadline: application.deadline.to_chrono().to_rfc3339(),
        status: application.status,
    }
}

fn essay_body(essay: &EssayDoc) -> EssayResponse {
    EssayResponse {
        id: essay._id.map(|o| o.to_hex()).unwrap_or_default(),
        application_id: essay.application_id.to_hex(),
        prompt: essay.prompt.clone(),
        content: essay.content.clone(),
        word_count: essay.word_count,
        is_complete: essay.is_complete,
        feedback: essay.feedback.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_essay_word_count_derivation() {
        // Explicit count wins; otherwise derived from content.
        let derived = None.unwrap_or_else(|| EssayDoc::count_words("one two three"));
        assert_eq!(derived, 3);

        let explicit = Some(7u32).unwrap_or_else(|| EssayDoc::count_words("one two three"));
        assert_eq!(explicit, 7);
    }

    #[test]
    fn test_create_request_defaults() {
        let body: CreateApplicationRequest = serde_json::from_str(
            r#"{"universityName":"UC Davis","deadline":"2025-11-30"}"#,
        )
        .unwrap();
        assert_eq!(body.university_id, "");
        assert_eq!(body.university_code, "");
        assert_eq!(body.university_name, "UC Davis");
        assert_eq!(body.major, "");
        assert_eq!(body.status, "");
    }

    #[test]
    fn test_activity_input_parse() {
        let body: ReplaceActivitiesRequest = serde_json::from_str(
            r#"{"activities":[{"title":"Robotics Club","hoursPerWeek":5.0}]}"#,
        )
        .unwrap();
        assert_eq!(body.activities.len(), 1);
        assert_eq!(body.activities[0].title, "Robotics Club");
        assert!(body.activities[0].start_date.is_none());
    }
}
