//! HTTP routes for transferable
//!
//! One module per API area. Handlers return `Response<Full<Bytes>>`; the
//! dispatch layer in `server::http` boxes bodies at its boundary. Shared
//! helpers here own the error contract (`{ "error": ..., "code": ... }`),
//! JSON body parsing, and the auth/ownership checks every area repeats.

pub mod admin;
pub mod advisor;
pub mod applications;
pub mod courses;
pub mod health;
pub mod mentors;
pub mod payments;
pub mod timeline;
pub mod users;

pub use admin::handle_admin_request;
pub use advisor::handle_advisor_request;
pub use applications::handle_applications_request;
pub use courses::handle_courses_request;
pub use health::{health_check, readiness_check, version_info};
pub use mentors::handle_mentors_request;
pub use payments::handle_payments_request;
pub use timeline::handle_timeline_request;
pub use users::handle_users_request;

use bson::{doc, oid::ObjectId};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token_from_header, Claims, PermissionLevel};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::server::AppState;
use crate::types::{Result, TransferableError};

/// Response body type shared by all handlers
pub type FullBody = Full<Bytes>;

/// Maximum accepted request body size
const MAX_BODY_BYTES: usize = 65536;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Generic success acknowledgement
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// Serialize a payload as a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Build an error response with a short message and machine code
pub fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
        },
    )
}

/// Map a taxonomy error to its HTTP response
pub fn error_to_response(err: &TransferableError) -> Response<FullBody> {
    error_response(err.http_status(), &err.to_string(), Some(err.code()))
}

/// Read and deserialize a JSON request body (size-capped)
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| TransferableError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(TransferableError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| TransferableError::Http(format!("Invalid JSON body: {}", e)))
}

/// Read a raw request body without deserializing (webhooks verify the
/// exact bytes)
pub async fn read_raw_body(req: Request<hyper::body::Incoming>) -> Result<Bytes> {
    let body = req
        .collect()
        .await
        .map_err(|e| TransferableError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(TransferableError::Http("Request body too large".into()));
    }
    Ok(bytes)
}

/// Verify the bearer token and return its claims
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Claims> {
    let auth_header = headers
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| TransferableError::Unauthenticated("No token provided".into()))?;

    let result = state.jwt.verify_token(token);
    if !result.valid {
        return Err(TransferableError::Unauthenticated(
            result.error.unwrap_or_else(|| "Invalid token".into()),
        ));
    }

    result
        .claims
        .ok_or_else(|| TransferableError::Unauthenticated("Invalid token".into()))
}

/// Load the user record behind verified claims
pub async fn current_user(state: &AppState, claims: &Claims) -> Result<UserDoc> {
    let users = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;

    users
        .find_one(doc! { "clerk_id": &claims.sub })
        .await?
        .ok_or_else(|| {
            TransferableError::NotFound(
                "User record not found; sync your profile first".into(),
            )
        })
}

/// Authenticate and load the user in one step
pub async fn require_user(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<(Claims, UserDoc)> {
    let claims = authenticate(headers, state)?;
    let user = current_user(state, &claims).await?;
    Ok((claims, user))
}

/// Admin role check over verified claims
pub fn require_admin(claims: &Claims) -> Result<()> {
    if claims.permission_level < PermissionLevel::Admin {
        return Err(TransferableError::Forbidden(
            "Admin permission required".into(),
        ));
    }
    Ok(())
}

/// Premium tier check over a loaded user
pub fn require_premium(user: &UserDoc) -> Result<()> {
    if !user.is_premium() {
        return Err(TransferableError::Forbidden(
            "Premium subscription required".into(),
        ));
    }
    Ok(())
}

/// Extract a single query-string parameter
pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let q = query?;
    for pair in q.split('&') {
        if let Some((k, value)) = pair.split_once('=') {
            if k == key {
                return urlencoding::decode(value).ok().map(|v| v.into_owned());
            }
        }
    }
    None
}

/// Parse a path segment as an ObjectId, naming the entity on failure
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| TransferableError::Validation(format!("Invalid {what} id")))
}

/// Parse a client-supplied deadline: `YYYY-MM-DD` or RFC3339.
///
/// Anything else is a validation error; an application is never stored
/// with an unparseable deadline.
pub fn parse_deadline(raw: &str) -> Result<bson::DateTime> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_time(NaiveTime::MIN);
        let utc = Utc.from_utc_datetime(&midnight);
        return Ok(bson::DateTime::from_chrono(utc));
    }

    if let Ok(instant) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(bson::DateTime::from_chrono(instant.with_timezone(&Utc)));
    }

    Err(TransferableError::Validation(format!(
        "deadline must be a valid date, got \"{raw}\""
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let q = Some("requestId=abc123&since=2026-01-01T00%3A00%3A00Z");
        assert_eq!(query_param(q, "requestId"), Some("abc123".into()));
        assert_eq!(
            query_param(q, "since"),
            Some("2026-01-01T00:00:00Z".into())
        );
        assert_eq!(query_param(q, "missing"), None);
        assert_eq!(query_param(None, "requestId"), None);
    }

    #[test]
    fn test_parse_deadline_date_only() {
        let dt = parse_deadline("2025-11-30").unwrap();
        let chrono = dt.to_chrono();
        assert_eq!(chrono.format("%Y-%m-%d").to_string(), "2025-11-30");
    }

    #[test]
    fn test_parse_deadline_rfc3339() {
        assert!(parse_deadline("2025-11-30T23:59:00Z").is_ok());
        assert!(parse_deadline("2025-11-30T23:59:00-08:00").is_ok());
    }

    #[test]
    fn test_parse_deadline_rejects_garbage() {
        for bad in ["not-a-date", "", "2025-13-45", "November 30th", "30/11/2025"] {
            assert!(parse_deadline(bad).is_err(), "expected rejection of {bad:?}");
        }
    }

    #[test]
    fn test_parse_object_id() {
        let oid = ObjectId::new();
        assert_eq!(parse_object_id(&oid.to_hex(), "application").unwrap(), oid);
        assert!(parse_object_id("nope", "application").is_err());
    }
}
