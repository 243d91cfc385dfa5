//! User profile endpoints
//!
//! ## Endpoints
//!
//! - `POST /api/users/sync` - Find-or-create the user behind the verified
//!   identity claims, refreshing identity fields
//! - `GET /api/users/profile` - Profile with resolved catalog references
//! - `PUT /api/users/profile` - Update the transfer profile
//!
//! Profile references (college, major, target universities) are stored as
//! the raw strings the client sent; resolution happens on read.

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{SubscriptionTier, UserDoc, USER_COLLECTION};
use crate::routes::{
    authenticate, error_response, error_to_response, json_response, parse_json_body, require_user,
    FullBody,
};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub community_college: Option<String>,
    #[serde(default)]
    pub current_major: Option<String>,
    #[serde(default)]
    pub target_universities: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedUniversity {
    pub id: String,
    pub name: String,
    pub code: String,
    pub university_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub clerk_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub community_college: String,
    pub current_major: String,
    pub target_universities: Vec<String>,
    pub subscription_tier: SubscriptionTier,
    /// Target universities that resolved against the catalog
    pub resolved_targets: Vec<ResolvedUniversity>,
    /// Resolved community college name, when the reference matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_college: Option<String>,
}

/// Main handler for /api/users/* routes
pub async fn handle_users_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/users").unwrap_or("");

    match (method, subpath) {
        (Method::POST, "/sync") => handle_sync(req, state).await,
        (Method::GET, "/profile") => handle_get_profile(req, state).await,
        (Method::PUT, "/profile") => handle_update_profile(req, state).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

/// POST /api/users/sync - find-or-create the user record
async fn handle_sync(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match authenticate(req.headers(), &state) {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    let body: SyncRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match sync_user(&state, &claims.sub, &claims.email, &body).await {
        Ok(user) => json_response(StatusCode::OK, &profile_body(&user, Vec::new(), None)),
        Err(e) => error_to_response(&e),
    }
}

async fn sync_user(
    state: &AppState,
    clerk_id: &str,
    token_email: &str,
    body: &SyncRequest,
) -> Result<UserDoc> {
    let users = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;

    let email = body
        .email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| token_email.to_string());

    if let Some(mut existing) = users.find_one(doc! { "clerk_id": clerk_id }).await? {
        let mut update = doc! {
            "email": &email,
            "metadata.updated_at": bson::DateTime::now(),
        };
        if let Some(ref first) = body.first_name {
            update.insert("first_name", first);
            existing.first_name = first.clone();
        }
        if let Some(ref last) = body.last_name {
            update.insert("last_name", last);
            existing.last_name = last.clone();
        }
        if let Some(ref image) = body.profile_image {
            update.insert("profile_image", image);
            existing.profile_image = Some(image.clone());
        }
        existing.email = email;

        users
            .update_one(doc! { "clerk_id": clerk_id }, doc! { "$set": update })
            .await?;

        return Ok(existing);
    }

    let mut user = UserDoc::new(clerk_id.to_string(), email);
    user.first_name = body.first_name.clone().unwrap_or_default();
    user.last_name = body.last_name.clone().unwrap_or_default();
    user.profile_image = body.profile_image.clone();

    info!(clerk_id = %clerk_id, "Creating user record");
    let id = users.insert_one(user.clone()).await?;
    user._id = Some(id);
    Ok(user)
}

/// GET /api/users/profile - profile with resolved catalog references
async fn handle_get_profile(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let (_claims, user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let resolved_targets = match state.resolver.resolve_target_universities(&user).await {
        Ok(targets) => targets
            .into_iter()
            .map(|u| ResolvedUniversity {
                id: u.id_hex(),
                name: u.name.clone(),
                code: u.code.clone(),
                university_type: u.university_type.to_string(),
            })
            .collect(),
        Err(e) => return error_to_response(&e),
    };

    let resolved_college = if user.community_college.trim().is_empty() {
        None
    } else {
        match state.resolver.resolve_college(&user.community_college).await {
            Ok(college) => college.map(|c| c.name),
            Err(e) => return error_to_response(&e),
        }
    };

    json_response(
        StatusCode::OK,
        &profile_body(&user, resolved_targets, resolved_college),
    )
}

/// PUT /api/users/profile - update transfer profile fields
async fn handle_update_profile(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let (claims, mut user) = match require_user(req.headers(), &state).await {
        Ok(pair) => pair,
        Err(e) => return error_to_response(&e),
    };

    let body: UpdateProfileRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    let mut update = doc! { "metadata.updated_at": bson::DateTime::now() };
    if let Some(college) = body.community_college {
        user.community_college = college.trim().to_string();
        update.insert("community_college", &user.community_college);
    }
    if let Some(major) = body.current_major {
        user.current_major = major.trim().to_string();
        update.insert("current_major", &user.current_major);
    }
    if let Some(targets) = body.target_universities {
        user.target_universities = targets
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        update.insert("target_universities", user.target_universities.clone());
    }

    let users = match state.mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    if let Err(e) = users
        .update_one(doc! { "clerk_id": &claims.sub }, doc! { "$set": update })
        .await
    {
        return error_to_response(&e);
    }

    json_response(StatusCode::OK, &profile_body(&user, Vec::new(), None))
}

fn profile_body(
    user: &UserDoc,
    resolved_targets: Vec<ResolvedUniversity>,
    resolved_college: Option<String>,
) -> ProfileResponse {
    ProfileResponse {
        id: user.id_hex(),
        clerk_id: user.clerk_id.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        profile_image: user.profile_image.clone(),
        community_college: user.community_college.clone(),
        current_major: user.current_major.clone(),
        target_universities: user.target_universities.clone(),
        subscription_tier: user.subscription_tier,
        resolved_targets,
        resolved_college,
    }
}
