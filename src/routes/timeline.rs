//! Timeline endpoints
//!
//! ## Endpoints
//!
//! - `GET  /api/timeline` - Timeline shell + milestones
//! - `POST /api/timeline` - Create/update the timeline shell
//! - `POST /api/timeline/generate` - Regenerate the milestone schedule
//! - `PATCH /api/timeline/milestones` - Toggle milestone completion
//!
//! Generation fully replaces the milestone set; manual edits are lost on
//! regeneration by design.

use bson::{doc, oid::ObjectId};
use chrono::{NaiveTime, TimeZone, Utc};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{
    ApplicationDoc, MilestoneCategory, MilestoneDoc, TimelineDoc, UniversityDoc, UserDoc,
    APPLICATION_COLLECTION, MILESTONE_COLLECTION, TIMELINE_COLLECTION, UNIVERSITY_COLLECTION,
};
use crate::planner::{build_milestones, ApplicationDue, TransferTerm};
use crate::routes::{
    error_response, error_to_response, json_response, parse_json_body, parse_object_id,
    require_user, FullBody, SuccessResponse,
};
use crate::server::AppState;
use crate::types::{Result, TransferableError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTimelineRequest {
    pub target_transfer_term: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleMilestoneRequest {
    pub milestone_id: String,
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub category: MilestoneCategory,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub id: String,
    pub target_transfer_term: String,
    pub milestones: Vec<MilestoneResponse>,
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /api/timeline/* routes
pub async fn handle_timeline_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/timeline").unwrap_or("");

    match (method, subpath) {
        (Method::GET, "") | (Method::GET, "/") => handle_get(req, state).await,
        (Method::POST, "") | (Method::POST, "/") => handle_upsert_shell(req, state).await,
        (Method::POST, "/generate") => handle_generate(req, state).await,
        (Method::PATCH, "/milestones") => handle_toggle_milestone(req, state).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

/// GET /api/timeline
async fn handle_get(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    match load_timeline(&state, &user).await {
        Ok(Some(timeline)) => json_response(StatusCode::OK, &timeline),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "No timeline yet; generate one first",
            Some("NOT_FOUND"),
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn load_timeline(state: &AppState, user: &UserDoc) -> Result<Option<TimelineResponse>> {
    let user_id = match user._id {
        Some(id) => id,
        None => return Ok(None),
    };

    let timelines = state
        .mongo
        .collection::<TimelineDoc>(TIMELINE_COLLECTION)
        .await?;
    let timeline = match timelines.find_one(doc! { "user_id": user_id }).await? {
        Some(t) => t,
        None => return Ok(None),
    };

    let milestones = state
        .mongo
        .collection::<MilestoneDoc>(MILESTONE_COLLECTION)
        .await?
        .find_many_with(
            doc! { "timeline_id": timeline._id },
            Some(doc! { "due_date": 1 }),
            None,
        )
        .await?;

    Ok(Some(TimelineResponse {
        id: timeline._id.map(|o| o.to_hex()).unwrap_or_default(),
        target_transfer_term: timeline.target_transfer_term,
        milestones: milestones.iter().map(milestone_body).collect(),
    }))
}

/// POST /api/timeline - create or update the shell without touching
/// milestones
async fn handle_upsert_shell(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: UpsertTimelineRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match upsert_shell(&state, &user, &body.target_transfer_term).await {
        Ok(_) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Timeline saved".into(),
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

/// Find-or-create the user's single timeline row, normalizing the term
async fn upsert_shell(state: &AppState, user: &UserDoc, raw_term: &str) -> Result<TimelineDoc> {
    // Reject malformed terms before they become undated milestones.
    let term = TransferTerm::parse(raw_term)?;

    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    let timelines = state
        .mongo
        .collection::<TimelineDoc>(TIMELINE_COLLECTION)
        .await?;

    if let Some(mut existing) = timelines.find_one(doc! { "user_id": user_id }).await? {
        existing.target_transfer_term = term.to_string();
        timelines
            .update_one(
                doc! { "_id": existing._id },
                doc! { "$set": {
                    "target_transfer_term": &existing.target_transfer_term,
                    "metadata.updated_at": bson::DateTime::now(),
                }},
            )
            .await?;
        return Ok(existing);
    }

    let mut timeline = TimelineDoc {
        _id: None,
        metadata: Default::default(),
        user_id,
        target_transfer_term: term.to_string(),
    };
    let id = timelines.insert_one(timeline.clone()).await?;
    timeline._id = Some(id);
    Ok(timeline)
}

/// POST /api/timeline/generate - replace the milestone set
async fn handle_generate(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: UpsertTimelineRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match generate_timeline(&state, &user, &body.target_transfer_term).await {
        Ok(timeline) => json_response(StatusCode::OK, &timeline),
        Err(e) => error_to_response(&e),
    }
}

async fn generate_timeline(
    state: &AppState,
    user: &UserDoc,
    raw_term: &str,
) -> Result<TimelineResponse> {
    let term = TransferTerm::parse(raw_term)?;
    let timeline = upsert_shell(state, user, raw_term).await?;
    let timeline_id = timeline
        ._id
        .ok_or_else(|| TransferableError::Database("Timeline row missing id".into()))?;

    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    // One extra milestone per existing application, titled by university.
    let applications = state
        .mongo
        .collection::<ApplicationDoc>(APPLICATION_COLLECTION)
        .await?
        .find_many(doc! { "user_id": user_id })
        .await?;

    let university_ids: Vec<ObjectId> = applications.iter().map(|a| a.university_id).collect();
    let university_names: HashMap<ObjectId, String> = if university_ids.is_empty() {
        HashMap::new()
    } else {
        state
            .mongo
            .collection::<UniversityDoc>(UNIVERSITY_COLLECTION)
            .await?
            .find_many(doc! { "_id": { "$in": university_ids } })
            .await?
            .into_iter()
            .filter_map(|u| u._id.map(|id| (id, u.name)))
            .collect()
    };

    let dues: Vec<ApplicationDue> = applications
        .iter()
        .map(|a| ApplicationDue {
            university_name: university_names
                .get(&a.university_id)
                .cloned()
                .unwrap_or_else(|| "University".to_string()),
            deadline: a.deadline.to_chrono().date_naive(),
        })
        .collect();

    let plans = build_milestones(&term, &dues)?;

    let docs: Vec<MilestoneDoc> = plans
        .into_iter()
        .map(|plan| {
            let midnight = plan.due_date.and_time(NaiveTime::MIN);
            MilestoneDoc {
                _id: None,
                metadata: Default::default(),
                timeline_id,
                title: plan.title,
                description: plan.description,
                due_date: bson::DateTime::from_chrono(Utc.from_utc_datetime(&midnight)),
                category: plan.category,
                is_completed: false,
                completed_at: None,
            }
        })
        .collect();

    let milestones = state
        .mongo
        .collection::<MilestoneDoc>(MILESTONE_COLLECTION)
        .await?;
    let count = milestones
        .replace_all(doc! { "timeline_id": timeline_id }, docs)
        .await?;

    info!(
        term = %term,
        milestones = count,
        "Timeline regenerated"
    );

    load_timeline(state, user)
        .await?
        .ok_or_else(|| TransferableError::Database("Timeline disappeared after generate".into()))
}

/// PATCH /api/timeline/milestones - toggle one milestone's completion
async fn handle_toggle_milestone(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: ToggleMilestoneRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match toggle_milestone(&state, &user, &body).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: if body.is_completed {
                    "Milestone completed".into()
                } else {
                    "Milestone reopened".into()
                },
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn toggle_milestone(
    state: &AppState,
    user: &UserDoc,
    body: &ToggleMilestoneRequest,
) -> Result<()> {
    let milestone_id = parse_object_id(&body.milestone_id, "milestone")?;
    let user_id = user
        ._id
        .ok_or_else(|| TransferableError::NotFound("User record not found".into()))?;

    // Scope the update to the caller's own timeline.
    let timeline = state
        .mongo
        .collection::<TimelineDoc>(TIMELINE_COLLECTION)
        .await?
        .find_one(doc! { "user_id": user_id })
        .await?
        .ok_or_else(|| TransferableError::NotFound("Timeline not found".into()))?;

    let update = if body.is_completed {
        doc! { "$set": {
            "is_completed": true,
            "completed_at": bson::DateTime::now(),
            "metadata.updated_at": bson::DateTime::now(),
        }}
    } else {
        doc! {
            "$set": {
                "is_completed": false,
                "metadata.updated_at": bson::DateTime::now(),
            },
            "$unset": { "completed_at": "" },
        }
    };

    let result = state
        .mongo
        .collection::<MilestoneDoc>(MILESTONE_COLLECTION)
        .await?
        .update_one(
            doc! { "_id": milestone_id, "timeline_id": timeline._id },
            update,
        )
        .await?;

    if result.matched_count == 0 {
        return Err(TransferableError::NotFound("Milestone not found".into()));
    }

    Ok(())
}

fn milestone_body(milestone: &MilestoneDoc) -> MilestoneResponse {
    MilestoneResponse {
        id: milestone._id.map(|o| o.to_hex()).unwrap_or_default(),
        title: milestone.title.clone(),
        description: milestone.description.clone(),
        due_date: milestone.due_date.to_chrono().to_rfc3339(),
        category: milestone.category,
        is_completed: milestone.is_completed,
        completed_at: milestone.completed_at.map(|d| d.to_chrono().to_rfc3339()),
    }
}
