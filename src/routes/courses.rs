//! Course requirement and completion endpoints
//!
//! ## Endpoints
//!
//! - `GET  /api/courses` - Course requirement view for the caller
//! - `GET  /api/courses/notifications` - Advisory notifications only
//! - `GET  /api/courses/completions` - The caller's completed courses
//! - `POST /api/courses/completions` - Record/update a completion
//!
//! A completion is unique per (user, course); re-submission updates grade
//! and term in place.

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{
    CourseCompletionDoc, CourseDoc, UserDoc, COMPLETION_COLLECTION, COURSE_COLLECTION,
};
use crate::requirements::RequirementView;
use crate::routes::{
    error_response, error_to_response, json_response, parse_json_body, parse_object_id,
    require_user, FullBody, SuccessResponse,
};
use crate::server::AppState;
use crate::types::{Result, TransferableError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCompletionRequest {
    pub course_id: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub id: String,
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub grade: String,
    pub term: String,
}

/// Main handler for /api/courses/* routes
pub async fn handle_courses_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/courses").unwrap_or("");

    match (method, subpath) {
        (Method::GET, "") | (Method::GET, "/") => handle_requirement_view(req, state).await,
        (Method::GET, "/notifications") => handle_notifications(req, state).await,
        (Method::GET, "/completions") => handle_list_completions(req, state).await,
        (Method::POST, "/completions") => handle_record_completion(req, state).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

/// GET /api/courses - the full requirement view
async fn handle_requirement_view(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    match RequirementView::build(&state.mongo, &state.resolver, &user).await {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_to_response(&e),
    }
}

/// GET /api/courses/notifications - advisory notifications only
async fn handle_notifications(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    match RequirementView::build(&state.mongo, &state.resolver, &user).await {
        Ok(view) => json_response(StatusCode::OK, &view.notifications),
        Err(e) => error_to_response(&e),
    }
}

/// GET /api/courses/completions
async fn handle_list_completions(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    match list_completions(&state, &user).await {
        Ok(list) => json_response(StatusCode::OK, &list),
        Err(e) => error_to_response(&e),
    }
}

async fn list_completions(state: &AppState, user: &UserDoc) -> Result<Vec<CompletionResponse>> {
    let user_id = match user._id {
        Some(id) => id,
        None => return Ok(Vec::new()),
    };

    let completions = state
        .mongo
        .collection::<CourseCompletionDoc>(COMPLETION_COLLECTION)
        .await?
        .find_many(doc! { "user_id": user_id })
        .await?;

    if completions.is_empty() {
        return Ok(Vec::new());
    }

    let course_ids: Vec<bson::oid::ObjectId> = completions.iter().map(|c| c.course_id).collect();
    let courses = state
        .mongo
        .collection::<CourseDoc>(COURSE_COLLECTION)
        .await?
        .find_many(doc! { "_id": { "$in": course_ids } })
        .await?;

    Ok(completions
        .iter()
        .map(|completion| {
            let course = courses
                .iter()
                .find(|c| c._id == Some(completion.course_id));
            CompletionResponse {
                id: completion._id.map(|o| o.to_hex()).unwrap_or_default(),
                course_id: completion.course_id.to_hex(),
                course_code: course.map(|c| c.code.clone()).unwrap_or_default(),
                course_name: course.map(|c| c.name.clone()).unwrap_or_default(),
                grade: completion.grade.clone(),
                term: completion.term.clone(),
            }
        })
        .collect())
}

/// POST /api/courses/completions - upsert on (user, course)
async fn handle_record_completion(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: RecordCompletionRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match record_completion(&state, &user, &body).await {
        Ok(updated) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: if updated {
                    "Completion updated".into()
                } else {
                    "Completion recorded".into()
                },
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn record_completion(
    state: &AppState,
    user: &UserDoc,
    body: &RecordCompletionRequest,
) -> Result<bool> {
    let course_id = parse_object_id(&body.course_id, "course")?;
    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    // The course must exist in the catalog.
    state
        .mongo
        .collection::<CourseDoc>(COURSE_COLLECTION)
        .await?
        .find_one(doc! { "_id": course_id })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Course not found".into()))?;

    let completions = state
        .mongo
        .collection::<CourseCompletionDoc>(COMPLETION_COLLECTION)
        .await?;

    if let Some(existing) = completions
        .find_one(doc! { "user_id": user_id, "course_id": course_id })
        .await?
    {
        completions
            .update_one(
                doc! { "_id": existing._id },
                doc! { "$set": {
                    "grade": &body.grade,
                    "term": &body.term,
                    "metadata.updated_at": bson::DateTime::now(),
                }},
            )
            .await?;
        return Ok(true);
    }

    completions
        .insert_one(CourseCompletionDoc {
            _id: None,
            metadata: Default::default(),
            user_id,
            course_id,
            grade: body.grade.clone(),
            term: body.term.clone(),
        })
        .await?;

    Ok(false)
}
