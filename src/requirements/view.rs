//! Requirement classification and advisory notifications
//!
//! The view is read-mostly derived state computed on demand. Equivalency
//! rows for the user's target universities are classified as completed,
//! required, or optional (first match wins, in that order), then advisory
//! notifications are derived.
//!
//! College filtering is intentionally best-effort: when the user's
//! community-college string resolves to no catalog row, equivalencies are
//! returned unfiltered by college rather than empty.

use bson::{doc, oid::ObjectId, Document};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::catalog::CatalogResolver;
use crate::db::schemas::{
    CourseCompletionDoc, CourseDoc, CourseEquivalencyDoc, MajorDoc, UserDoc, COMPLETION_COLLECTION,
    COURSE_COLLECTION, EQUIVALENCY_COLLECTION, MAJOR_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::Result;

/// Classification of one equivalency row for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementStatus {
    Completed,
    Required,
    Optional,
}

/// Notification priority, ordered most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    High,
    Medium,
    Low,
}

/// One row of the course requirement view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequirementRow {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub units: f64,
    pub university_id: String,
    pub university_name: String,
    pub equivalent_course_code: String,
    pub equivalent_course_name: String,
    pub is_verified: bool,
    pub is_completed: bool,
    pub is_required: bool,
    pub status: RequirementStatus,
}

/// An advisory, non-blocking notification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryNotification {
    /// Notification kind: "prerequisite" or "competitiveness"
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: NotificationPriority,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
}

/// The computed requirement view for one user
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequirementView {
    pub courses: Vec<CourseRequirementRow>,
    pub notifications: Vec<AdvisoryNotification>,
}

impl RequirementView {
    /// Compute the full view for a user.
    ///
    /// A user with no target universities yields an empty view, not an
    /// error.
    pub async fn build(
        mongo: &MongoClient,
        resolver: &CatalogResolver,
        user: &UserDoc,
    ) -> Result<RequirementView> {
        let targets = resolver.resolve_target_universities(user).await?;
        if targets.is_empty() {
            return Ok(RequirementView::default());
        }

        let target_ids: Vec<ObjectId> = targets.iter().filter_map(|u| u._id).collect();
        let university_names: HashMap<ObjectId, String> = targets
            .iter()
            .filter_map(|u| u._id.map(|id| (id, u.name.clone())))
            .collect();

        // If the college lookup fails, equivalencies are NOT filtered by
        // community college (contract, not an accident).
        let college = if user.community_college.trim().is_empty() {
            None
        } else {
            resolver.resolve_college(&user.community_college).await?
        };
        let college_id = college.and_then(|c| c._id);
        if college_id.is_none() && !user.community_college.trim().is_empty() {
            debug!(
                reference = %user.community_college,
                "Community college unresolvable; returning unfiltered equivalencies"
            );
        }

        let equivalencies = mongo
            .collection::<CourseEquivalencyDoc>(EQUIVALENCY_COLLECTION)
            .await?
            .find_many(equivalency_filter(&target_ids, college_id.as_ref()))
            .await?;

        if equivalencies.is_empty() {
            return Ok(RequirementView::default());
        }

        // Required university course codes from majors matching the user's
        // free-text major at the target universities.
        let required_codes = if user.current_major.trim().is_empty() {
            HashSet::new()
        } else {
            let majors = mongo
                .collection::<MajorDoc>(MAJOR_COLLECTION)
                .await?
                .find_many(doc! {
                    "university_id": { "$in": target_ids.clone() },
                    "name": {
                        "$regex": regex_escape(user.current_major.trim()),
                        "$options": "i",
                    },
                })
                .await?;
            flatten_requirements(&majors)
        };

        // Courses behind the equivalencies, for names/units/prerequisites.
        let course_collection = mongo.collection::<CourseDoc>(COURSE_COLLECTION).await?;
        let course_ids: Vec<ObjectId> = equivalencies.iter().map(|e| e.course_id).collect();
        let courses = course_collection
            .find_many(doc! { "_id": { "$in": course_ids } })
            .await?;
        let courses_by_id: HashMap<ObjectId, &CourseDoc> = courses
            .iter()
            .filter_map(|c| c._id.map(|id| (id, c)))
            .collect();

        // The user's completions.
        let user_id = match user._id {
            Some(id) => id,
            None => return Ok(RequirementView::default()),
        };
        let completions = mongo
            .collection::<CourseCompletionDoc>(COMPLETION_COLLECTION)
            .await?
            .find_many(doc! { "user_id": user_id })
            .await?;
        let completed_ids: HashSet<ObjectId> = completions.iter().map(|c| c.course_id).collect();

        // Completed-code set covers every completion, including courses
        // outside the equivalency list, so prerequisite checks do not
        // report courses the student already took elsewhere.
        let extra_ids: Vec<ObjectId> = completed_ids
            .iter()
            .filter(|id| !courses_by_id.contains_key(*id))
            .copied()
            .collect();
        let extra_courses = if extra_ids.is_empty() {
            Vec::new()
        } else {
            course_collection
                .find_many(doc! { "_id": { "$in": extra_ids } })
                .await?
        };
        let mut completed_codes: HashSet<String> = completions
            .iter()
            .filter_map(|c| courses_by_id.get(&c.course_id))
            .map(|c| c.code.to_uppercase())
            .collect();
        for course in &extra_courses {
            completed_codes.insert(course.code.to_uppercase());
        }

        let rows = classify_rows(
            &equivalencies,
            &courses_by_id,
            &university_names,
            &completed_ids,
            &required_codes,
        );

        let mut notifications =
            prerequisite_notifications(&equivalencies, &courses_by_id, &completed_codes);
        if let Some(n) = competitiveness_notification(&rows) {
            notifications.push(n);
        }
        notifications.sort_by_key(|n| n.priority);

        Ok(RequirementView {
            courses: rows,
            notifications,
        })
    }
}

/// Equivalency query filter: always by target universities, by community
/// college only when one was resolved.
pub fn equivalency_filter(target_ids: &[ObjectId], college_id: Option<&ObjectId>) -> Document {
    let mut filter = doc! { "university_id": { "$in": target_ids.to_vec() } };
    if let Some(cc) = college_id {
        filter.insert("community_college_id", *cc);
    }
    filter
}

/// Uppercased requirement codes across all matched majors
fn flatten_requirements(majors: &[MajorDoc]) -> HashSet<String> {
    majors
        .iter()
        .flat_map(|m| m.requirements.iter())
        .map(|code| code.trim().to_uppercase())
        .collect()
}

/// Classify every equivalency row: completed > required > optional, first
/// match wins.
fn classify_rows(
    equivalencies: &[CourseEquivalencyDoc],
    courses_by_id: &HashMap<ObjectId, &CourseDoc>,
    university_names: &HashMap<ObjectId, String>,
    completed_ids: &HashSet<ObjectId>,
    required_codes: &HashSet<String>,
) -> Vec<CourseRequirementRow> {
    equivalencies
        .iter()
        .map(|eq| {
            let course = courses_by_id.get(&eq.course_id);
            let is_completed = completed_ids.contains(&eq.course_id);
            let is_required =
                required_codes.contains(&eq.equivalent_course_code.trim().to_uppercase());

            let status = if is_completed {
                RequirementStatus::Completed
            } else if is_required {
                RequirementStatus::Required
            } else {
                RequirementStatus::Optional
            };

            CourseRequirementRow {
                course_id: eq.course_id.to_hex(),
                course_code: course.map(|c| c.code.clone()).unwrap_or_default(),
                course_name: course.map(|c| c.name.clone()).unwrap_or_default(),
                units: course.map(|c| c.units).unwrap_or_default(),
                university_id: eq.university_id.to_hex(),
                university_name: university_names
                    .get(&eq.university_id)
                    .cloned()
                    .unwrap_or_default(),
                equivalent_course_code: eq.equivalent_course_code.clone(),
                equivalent_course_name: eq.equivalent_course_name.clone(),
                is_verified: eq.is_verified,
                is_completed,
                is_required,
                status,
            }
        })
        .collect()
}

/// One high-priority notification per course with missing prerequisites
fn prerequisite_notifications(
    equivalencies: &[CourseEquivalencyDoc],
    courses_by_id: &HashMap<ObjectId, &CourseDoc>,
    completed_codes: &HashSet<String>,
) -> Vec<AdvisoryNotification> {
    let mut seen_courses: HashSet<ObjectId> = HashSet::new();
    let mut notifications = Vec::new();

    for eq in equivalencies {
        if !seen_courses.insert(eq.course_id) {
            continue;
        }
        let course = match courses_by_id.get(&eq.course_id) {
            Some(c) => c,
            None => continue,
        };
        if course.prerequisites.is_empty() {
            continue;
        }

        let missing: Vec<&str> = course
            .prerequisites
            .iter()
            .filter(|p| !completed_codes.contains(&p.trim().to_uppercase()))
            .map(|p| p.as_str())
            .collect();

        if !missing.is_empty() {
            notifications.push(AdvisoryNotification {
                kind: "prerequisite".into(),
                priority: NotificationPriority::High,
                message: format!(
                    "{} requires prerequisites you have not completed: {}",
                    course.code,
                    missing.join(", ")
                ),
                course_code: Some(course.code.clone()),
            });
        }
    }

    notifications
}

/// Medium-priority competitiveness notification when the verified-required
/// completion rate is under 50%
fn competitiveness_notification(rows: &[CourseRequirementRow]) -> Option<AdvisoryNotification> {
    let verified_required: Vec<&CourseRequirementRow> = rows
        .iter()
        .filter(|r| r.is_verified && r.is_required)
        .collect();

    let total = verified_required.len();
    if total == 0 {
        return None;
    }

    let completed = verified_required.iter().filter(|r| r.is_completed).count();
    let rate = completed as f64 / total as f64 * 100.0;

    if rate < 50.0 {
        Some(AdvisoryNotification {
            kind: "competitiveness".into(),
            priority: NotificationPriority::Medium,
            message: format!(
                "You have completed {completed} of {total} verified required courses ({rate:.0}%). \
                 Transfer applicants are more competitive above 50%."
            ),
            course_code: None,
        })
    } else {
        None
    }
}

fn regex_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Metadata;

    fn course(id: ObjectId, code: &str, prereqs: &[&str]) -> CourseDoc {
        CourseDoc {
            _id: Some(id),
            metadata: Metadata::default(),
            code: code.into(),
            name: format!("{code} name"),
            units: 4.0,
            community_college_id: ObjectId::new(),
            prerequisites: prereqs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn equivalency(
        course_id: ObjectId,
        university_id: ObjectId,
        equivalent_code: &str,
        verified: bool,
    ) -> CourseEquivalencyDoc {
        CourseEquivalencyDoc {
            _id: Some(ObjectId::new()),
            course_id,
            university_id,
            community_college_id: ObjectId::new(),
            equivalent_course_code: equivalent_code.into(),
            equivalent_course_name: String::new(),
            is_verified: verified,
            ..Default::default()
        }
    }

    #[test]
    fn test_college_filter_omitted_when_unresolved() {
        let targets = vec![ObjectId::new()];
        let filter = equivalency_filter(&targets, None);
        assert!(!filter.contains_key("community_college_id"));

        let cc = ObjectId::new();
        let filter = equivalency_filter(&targets, Some(&cc));
        assert!(filter.contains_key("community_college_id"));
    }

    #[test]
    fn test_classification_priority() {
        let uni = ObjectId::new();
        let completed_course = ObjectId::new();
        let required_course = ObjectId::new();
        let optional_course = ObjectId::new();

        let courses = [
            course(completed_course, "MATH 1A", &[]),
            course(required_course, "PHYS 4A", &[]),
            course(optional_course, "ART 10", &[]),
        ];
        let courses_by_id: HashMap<ObjectId, &CourseDoc> =
            courses.iter().map(|c| (c._id.unwrap(), c)).collect();

        let equivalencies = vec![
            // Completed AND required: completed wins
            equivalency(completed_course, uni, "MATH 31A", true),
            equivalency(required_course, uni, "PHYSICS 1A", true),
            equivalency(optional_course, uni, "ART 1", true),
        ];

        let completed_ids: HashSet<ObjectId> = [completed_course].into_iter().collect();
        let required_codes: HashSet<String> =
            ["MATH 31A".to_string(), "PHYSICS 1A".to_string()].into();
        let names: HashMap<ObjectId, String> = [(uni, "UCLA".to_string())].into();

        let rows = classify_rows(
            &equivalencies,
            &courses_by_id,
            &names,
            &completed_ids,
            &required_codes,
        );

        assert_eq!(rows[0].status, RequirementStatus::Completed);
        assert!(rows[0].is_required, "completed row keeps its required flag");
        assert_eq!(rows[1].status, RequirementStatus::Required);
        assert_eq!(rows[2].status, RequirementStatus::Optional);
        assert_eq!(rows[0].university_name, "UCLA");
    }

    #[test]
    fn test_prerequisite_notification_names_missing_codes() {
        let uni = ObjectId::new();
        let advanced = ObjectId::new();

        let courses = [course(advanced, "MATH 1C", &["MATH 1A", "MATH 1B"])];
        let courses_by_id: HashMap<ObjectId, &CourseDoc> =
            courses.iter().map(|c| (c._id.unwrap(), c)).collect();
        let equivalencies = vec![equivalency(advanced, uni, "MATH 32A", true)];

        let completed: HashSet<String> = ["MATH 1A".to_string()].into();
        let notifications =
            prerequisite_notifications(&equivalencies, &courses_by_id, &completed);

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "prerequisite");
        assert_eq!(notifications[0].priority, NotificationPriority::High);
        assert!(notifications[0].message.contains("MATH 1B"));
        assert!(!notifications[0].message.contains("MATH 1A,"));
    }

    #[test]
    fn test_no_prerequisite_notification_when_all_met() {
        let uni = ObjectId::new();
        let advanced = ObjectId::new();

        let courses = [course(advanced, "MATH 1C", &["MATH 1A"])];
        let courses_by_id: HashMap<ObjectId, &CourseDoc> =
            courses.iter().map(|c| (c._id.unwrap(), c)).collect();
        let equivalencies = vec![equivalency(advanced, uni, "MATH 32A", true)];

        let completed: HashSet<String> = ["MATH 1A".to_string()].into();
        assert!(prerequisite_notifications(&equivalencies, &courses_by_id, &completed).is_empty());
    }

    #[test]
    fn test_competitiveness_below_half() {
        let row = |required, verified, completed| CourseRequirementRow {
            course_id: String::new(),
            course_code: String::new(),
            course_name: String::new(),
            units: 0.0,
            university_id: String::new(),
            university_name: String::new(),
            equivalent_course_code: String::new(),
            equivalent_course_name: String::new(),
            is_verified: verified,
            is_completed: completed,
            is_required: required,
            status: RequirementStatus::Optional,
        };

        // 1 of 3 verified required completed => 33%, notify
        let rows = vec![
            row(true, true, true),
            row(true, true, false),
            row(true, true, false),
        ];
        let n = competitiveness_notification(&rows).unwrap();
        assert_eq!(n.priority, NotificationPriority::Medium);

        // 2 of 3 => 67%, quiet
        let rows = vec![
            row(true, true, true),
            row(true, true, true),
            row(true, true, false),
        ];
        assert!(competitiveness_notification(&rows).is_none());

        // Unverified rows are ignored entirely
        let rows = vec![row(true, false, false), row(true, false, false)];
        assert!(competitiveness_notification(&rows).is_none());
    }

    #[test]
    fn test_notification_priority_sorts_high_first() {
        let mut notifications = vec![
            AdvisoryNotification {
                kind: "competitiveness".into(),
                priority: NotificationPriority::Medium,
                message: String::new(),
                course_code: None,
            },
            AdvisoryNotification {
                kind: "prerequisite".into(),
                priority: NotificationPriority::High,
                message: String::new(),
                course_code: None,
            },
        ];
        notifications.sort_by_key(|n| n.priority);
        assert_eq!(notifications[0].priority, NotificationPriority::High);
        assert_eq!(notifications[1].priority, NotificationPriority::Medium);
    }
}
