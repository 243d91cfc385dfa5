//! Admin catalog endpoints
//!
//! ## Endpoints
//!
//! - `POST /api/admin/articulations/import` - Bulk import courses and
//!   equivalencies. Per-row best-effort: one bad row is reported in the
//!   response counts, not a batch failure.
//! - `POST /api/admin/catalog/seed` - Insert-if-absent reference colleges
//!   and universities.
//!
//! Both require Admin permission via JWT claims.

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::derive_code;
use crate::db::schemas::{
    CommunityCollegeDoc, CourseDoc, CourseEquivalencyDoc, EquivalencySource, UniversityDoc,
    UniversityType, COLLEGE_COLLECTION, COURSE_COLLECTION, EQUIVALENCY_COLLECTION,
    UNIVERSITY_COLLECTION,
};
use crate::routes::{
    authenticate, error_response, error_to_response, json_response, parse_json_body,
    require_admin, FullBody,
};
use crate::server::AppState;
use crate::types::{Result, TransferableError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticulationRow {
    pub college_code: String,
    pub course_code: String,
    pub course_name: String,
    #[serde(default)]
    pub units: f64,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub university_id: String,
    #[serde(default)]
    pub university_code: String,
    #[serde(default)]
    pub university_name: String,
    /// Absent/empty means "catalog the course, but create no equivalency"
    #[serde(default)]
    pub equivalent_course_code: String,
    #[serde(default)]
    pub equivalent_course_name: String,
    #[serde(default)]
    pub source: Option<EquivalencySource>,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub rows: Vec<ArticulationRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// New course rows created
    pub imported: usize,
    /// Existing course rows refreshed
    pub updated: usize,
    /// Rows with no equivalency to create
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCollege {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUniversity {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub university_type: Option<UniversityType>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeedRequest {
    #[serde(default)]
    pub colleges: Vec<SeedCollege>,
    #[serde(default)]
    pub universities: Vec<SeedUniversity>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub colleges_created: usize,
    pub universities_created: usize,
    pub already_present: usize,
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /api/admin/* routes
pub async fn handle_admin_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/admin").unwrap_or("");

    match (method, subpath) {
        (Method::POST, "/articulations/import") => handle_import(req, state).await,
        (Method::POST, "/catalog/seed") => handle_seed(req, state).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

/// POST /api/admin/articulations/import
async fn handle_import(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match authenticate(req.headers(), &state) {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };
    if let Err(e) = require_admin(&claims) {
        return error_to_response(&e);
    }

    let body: ImportRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    let mut summary = ImportSummary::default();
    for (index, row) in body.rows.iter().enumerate() {
        match import_row(&state, row).await {
            Ok(outcome) => {
                match outcome.course {
                    CourseOutcome::Created => summary.imported += 1,
                    CourseOutcome::Updated => summary.updated += 1,
                }
                if !outcome.equivalency_created {
                    summary.skipped += 1;
                }
            }
            Err(e) => {
                warn!(row = index, error = %e, "Articulation row failed");
                summary.errors.push(RowError {
                    row: index,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        imported = summary.imported,
        updated = summary.updated,
        skipped = summary.skipped,
        errors = summary.errors.len(),
        "Articulation import finished"
    );
    state
        .usage
        .log_catalog_import(&claims.sub, summary.imported, summary.errors.len())
        .await;

    json_response(StatusCode::OK, &summary)
}

enum CourseOutcome {
    Created,
    Updated,
}

struct RowOutcome {
    course: CourseOutcome,
    equivalency_created: bool,
}

async fn import_row(state: &AppState, row: &ArticulationRow) -> Result<RowOutcome> {
    if row.college_code.trim().is_empty() {
        return Err(TransferableError::Validation("collegeCode is required".into()));
    }
    if row.course_code.trim().is_empty() {
        return Err(TransferableError::Validation("courseCode is required".into()));
    }

    // Colleges are seeded reference data; an unknown code is a row error,
    // not a placeholder-creation case.
    let college = state
        .resolver
        .resolve_college(&row.college_code)
        .await?
        .ok_or_else(|| {
            TransferableError::NotFound(format!("Unknown college \"{}\"", row.college_code))
        })?;
    let college_id = college
        ._id
        .ok_or_else(|| TransferableError::Database("College row missing id".into()))?;

    // Upsert course on (college, code).
    let courses = state.mongo.collection::<CourseDoc>(COURSE_COLLECTION).await?;
    let code = row.course_code.trim().to_uppercase();

    let (course_id, course_outcome) = match courses
        .find_one(doc! { "community_college_id": college_id, "code": &code })
        .await?
    {
        Some(existing) => {
            courses
                .update_one(
                    doc! { "_id": existing._id },
                    doc! { "$set": {
                        "name": row.course_name.trim(),
                        "units": row.units,
                        "prerequisites": row.prerequisites.clone(),
                        "metadata.updated_at": bson::DateTime::now(),
                    }},
                )
                .await?;
            (
                existing
                    ._id
                    .ok_or_else(|| TransferableError::Database("Course row missing id".into()))?,
                CourseOutcome::Updated,
            )
        }
        None => {
            let mut course = CourseDoc::new(
                code.clone(),
                row.course_name.trim().to_string(),
                row.units,
                college_id,
            );
            course.prerequisites = row.prerequisites.clone();
            (courses.insert_one(course).await?, CourseOutcome::Created)
        }
    };

    // No equivalent course code means no equivalency row; the course can
    // live in the catalog with zero equivalencies.
    if row.equivalent_course_code.trim().is_empty() {
        return Ok(RowOutcome {
            course: course_outcome,
            equivalency_created: false,
        });
    }

    let university = state
        .resolver
        .resolve_university(&[
            row.university_id.as_str(),
            row.university_code.as_str(),
            row.university_name.as_str(),
        ])
        .await?;
    let university_id = university
        ._id
        .ok_or_else(|| TransferableError::Database("University row missing id".into()))?;

    let equivalencies = state
        .mongo
        .collection::<CourseEquivalencyDoc>(EQUIVALENCY_COLLECTION)
        .await?;

    // Find-before-create; the unique (course, university) index backstops
    // a lost race.
    if let Some(existing) = equivalencies
        .find_one(doc! { "course_id": course_id, "university_id": university_id })
        .await?
    {
        equivalencies
            .update_one(
                doc! { "_id": existing._id },
                doc! { "$set": {
                    "equivalent_course_code": row.equivalent_course_code.trim(),
                    "equivalent_course_name": row.equivalent_course_name.trim(),
                    "is_verified": row.is_verified,
                    "metadata.updated_at": bson::DateTime::now(),
                }},
            )
            .await?;
        return Ok(RowOutcome {
            course: course_outcome,
            equivalency_created: false,
        });
    }

    let equivalency = CourseEquivalencyDoc {
        _id: None,
        metadata: Default::default(),
        course_id,
        university_id,
        community_college_id: college_id,
        equivalent_course_code: row.equivalent_course_code.trim().to_string(),
        equivalent_course_name: row.equivalent_course_name.trim().to_string(),
        source: row.source.unwrap_or(EquivalencySource::Assist),
        is_verified: row.is_verified,
        verified_at: row.is_verified.then(bson::DateTime::now),
    };

    match equivalencies.insert_one(equivalency).await {
        Ok(_) => Ok(RowOutcome {
            course: course_outcome,
            equivalency_created: true,
        }),
        Err(insert_err) => {
            // Unique-index race: the row appeared between find and insert.
            if equivalencies
                .find_one(doc! { "course_id": course_id, "university_id": university_id })
                .await?
                .is_some()
            {
                Ok(RowOutcome {
                    course: course_outcome,
                    equivalency_created: false,
                })
            } else {
                Err(insert_err)
            }
        }
    }
}

/// POST /api/admin/catalog/seed - insert-if-absent reference data
async fn handle_seed(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match authenticate(req.headers(), &state) {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };
    if let Err(e) = require_admin(&claims) {
        return error_to_response(&e);
    }

    let body: SeedRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    match seed_catalog(&state, body).await {
        Ok(summary) => json_response(StatusCode::OK, &summary),
        Err(e) => error_to_response(&e),
    }
}

async fn seed_catalog(state: &AppState, body: SeedRequest) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    let colleges = state
        .mongo
        .collection::<CommunityCollegeDoc>(COLLEGE_COLLECTION)
        .await?;
    for seed in body.colleges {
        let code = seed.code.trim().to_uppercase();
        if code.is_empty() || seed.name.trim().is_empty() {
            continue;
        }
        if colleges.find_one(doc! { "code": &code }).await?.is_some() {
            summary.already_present += 1;
            continue;
        }
        colleges
            .insert_one(CommunityCollegeDoc::new(
                seed.name.trim().to_string(),
                code,
                seed.city,
                seed.state,
            ))
            .await?;
        summary.colleges_created += 1;
    }

    let universities = state
        .mongo
        .collection::<UniversityDoc>(UNIVERSITY_COLLECTION)
        .await?;
    for seed in body.universities {
        let name = seed.name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        let code = if seed.code.trim().is_empty() {
            derive_code(&name)
        } else {
            seed.code.trim().to_uppercase()
        };
        if universities.find_one(doc! { "code": &code }).await?.is_some() {
            summary.already_present += 1;
            continue;
        }
        let mut university =
            UniversityDoc::new(name, code, seed.university_type.unwrap_or_default());
        university.city = seed.city;
        university.state = seed.state;
        universities.insert_one(university).await?;
        summary.universities_created += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_row_parse_minimal() {
        let row: ArticulationRow = serde_json::from_str(
            r#"{"collegeCode":"DAC","courseCode":"MATH 1A","courseName":"Calculus I"}"#,
        )
        .unwrap();
        assert_eq!(row.college_code, "DAC");
        assert!(row.equivalent_course_code.is_empty());
        assert!(!row.is_verified);
        assert!(row.source.is_none());
    }

    #[test]
    fn test_import_row_parse_full() {
        let row: ArticulationRow = serde_json::from_str(
            r#"{
                "collegeCode": "DAC",
                "courseCode": "MATH 1A",
                "courseName": "Calculus I",
                "units": 5.0,
                "prerequisites": ["MATH 43"],
                "universityCode": "UCLA",
                "equivalentCourseCode": "MATH 31A",
                "equivalentCourseName": "Differential Calculus",
                "source": "ASSIST",
                "isVerified": true
            }"#,
        )
        .unwrap();
        assert_eq!(row.source, Some(EquivalencySource::Assist));
        assert!(row.is_verified);
        assert_eq!(row.prerequisites, vec!["MATH 43"]);
    }
}
