//! Entity resolution over the catalog store
//!
//! Caller-supplied references are ambiguous: a stored string may be a stale
//! ObjectId, an uppercase code, or a raw name typed by a student. Every
//! read path interprets a reference as id, then code, then name (exact,
//! then substring with `-`/`_` treated as spaces) before giving up.
//!
//! Universities and majors may be created as placeholder rows when a name
//! is supplied but nothing matches; colleges are seeded reference data and
//! are never fabricated. Creation is find-before-create: at most one
//! insert per call, and a lost duplicate-key race is treated as "already
//! exists" rather than an error.

use bson::{doc, oid::ObjectId, Document};
use tracing::{debug, info};

use crate::db::schemas::{
    CommunityCollegeDoc, MajorDoc, UniversityDoc, UniversityType, UserDoc, COLLEGE_COLLECTION,
    MAJOR_COLLECTION, UNIVERSITY_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::{Result, TransferableError};

/// A typed interpretation of one raw reference string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRef {
    ById(ObjectId),
    ByCode(String),
    ByName(String),
}

impl CatalogRef {
    /// All plausible interpretations of a raw string, in resolution order.
    ///
    /// A 24-char hex string is tried as an id first; everything is tried as
    /// an uppercased code and as a name. Empty/whitespace input yields no
    /// interpretations.
    pub fn interpretations(raw: &str) -> Vec<CatalogRef> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let mut refs = Vec::new();
        if let Ok(oid) = ObjectId::parse_str(trimmed) {
            refs.push(CatalogRef::ById(oid));
        }
        refs.push(CatalogRef::ByCode(trimmed.to_uppercase()));
        refs.push(CatalogRef::ByName(trimmed.to_string()));
        refs
    }

    /// Whether a raw string could name a new catalog row (not an id, long
    /// enough to be a real name)
    pub fn is_name_like(raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.len() >= 2 && ObjectId::parse_str(trimmed).is_err()
    }
}

/// Derive a deterministic catalog code from a name: uppercased,
/// alphanumerics only, truncated to 10 chars.
pub fn derive_code(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_uppercase()
}

/// Escape a user-supplied fragment for use inside a Mongo `$regex`
fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Normalize separators for fuzzy name matching: `-` and `_` become spaces
fn normalize_separators(input: &str) -> String {
    input.replace(['-', '_'], " ")
}

/// Resolves ambiguous catalog references against MongoDB
#[derive(Clone)]
pub struct CatalogResolver {
    mongo: MongoClient,
}

impl CatalogResolver {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// Resolve a university from an ordered list of candidate strings
    /// (typically `[id, code, name]`, each optional).
    ///
    /// Each candidate is tried as id, code (case-insensitive via
    /// uppercasing), exact name, then substring name. The first hit wins.
    /// When nothing matches and a name-like candidate exists, a placeholder
    /// university is created from the first such candidate. With no usable
    /// candidate at all this is a `MissingReference` ("University is
    /// required").
    pub async fn resolve_university(&self, candidates: &[&str]) -> Result<UniversityDoc> {
        let universities = self
            .mongo
            .collection::<UniversityDoc>(UNIVERSITY_COLLECTION)
            .await?;

        for candidate in candidates {
            for reference in CatalogRef::interpretations(candidate) {
                let filter = match &reference {
                    CatalogRef::ById(oid) => doc! { "_id": *oid },
                    CatalogRef::ByCode(code) => doc! { "code": code },
                    CatalogRef::ByName(name) => Self::name_exact_filter(name),
                };

                if let Some(found) = universities.find_one(filter).await? {
                    return Ok(found);
                }

                // Substring fallback only makes sense for the name reading
                if let CatalogRef::ByName(name) = &reference {
                    if let Some(found) = universities
                        .find_one(Self::name_substring_filter(name))
                        .await?
                    {
                        return Ok(found);
                    }
                }
            }
        }

        // Nothing matched; create a placeholder from the first name-like
        // candidate, if any.
        let name_candidate = candidates
            .iter()
            .map(|c| c.trim())
            .find(|c| CatalogRef::is_name_like(c));

        let name = match name_candidate {
            Some(n) => n.to_string(),
            None => {
                return Err(TransferableError::MissingReference(
                    "University is required".into(),
                ))
            }
        };

        let code = derive_code(&name);
        info!(name = %name, code = %code, "Creating placeholder university");

        let mut placeholder = UniversityDoc::new(name, code, UniversityType::Uc);
        match universities.insert_one(placeholder.clone()).await {
            Ok(id) => {
                placeholder._id = Some(id);
                Ok(placeholder)
            }
            Err(insert_err) => {
                // Lost a create race on the unique code index: re-read.
                if let Some(found) = universities
                    .find_one(doc! { "code": &placeholder.code })
                    .await?
                {
                    debug!(code = %placeholder.code, "Placeholder create lost race, using existing row");
                    Ok(found)
                } else {
                    Err(insert_err)
                }
            }
        }
    }

    /// Resolve a major by id or case-insensitive substring name, scoped to
    /// a university; creates the major when the name is new. Empty input
    /// resolves to `None` rather than an error.
    pub async fn resolve_major(
        &self,
        name_or_id: &str,
        university_id: ObjectId,
    ) -> Result<Option<MajorDoc>> {
        let trimmed = name_or_id.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let majors = self.mongo.collection::<MajorDoc>(MAJOR_COLLECTION).await?;

        if let Ok(oid) = ObjectId::parse_str(trimmed) {
            if let Some(found) = majors.find_one(doc! { "_id": oid }).await? {
                return Ok(Some(found));
            }
        }

        let filter = doc! {
            "university_id": university_id,
            "name": { "$regex": escape_regex(trimmed), "$options": "i" },
        };
        if let Some(found) = majors.find_one(filter).await? {
            return Ok(Some(found));
        }

        let mut major = MajorDoc::new(trimmed.to_string(), derive_code(trimmed), university_id);
        info!(name = %major.name, university = %university_id.to_hex(), "Creating major");
        let id = majors.insert_one(major.clone()).await?;
        major._id = Some(id);
        Ok(Some(major))
    }

    /// Resolve a community college by id, code, exact name, or substring
    /// name. Colleges are never created here; an unresolvable reference
    /// yields `None`.
    pub async fn resolve_college(&self, reference: &str) -> Result<Option<CommunityCollegeDoc>> {
        let colleges = self
            .mongo
            .collection::<CommunityCollegeDoc>(COLLEGE_COLLECTION)
            .await?;

        for catalog_ref in CatalogRef::interpretations(reference) {
            let filter = match &catalog_ref {
                CatalogRef::ById(oid) => doc! { "_id": *oid },
                CatalogRef::ByCode(code) => doc! { "code": code },
                CatalogRef::ByName(name) => Self::name_exact_filter(name),
            };

            if let Some(found) = colleges.find_one(filter).await? {
                return Ok(Some(found));
            }

            if let CatalogRef::ByName(name) = &catalog_ref {
                if let Some(found) = colleges
                    .find_one(Self::name_substring_filter(name))
                    .await?
                {
                    return Ok(Some(found));
                }
            }
        }

        Ok(None)
    }

    /// Resolve a user's raw `target_universities` entries in two batched
    /// queries: first by id/code, then (only if that returned nothing) by
    /// exact name. Unresolvable entries are silently dropped.
    pub async fn resolve_target_universities(&self, user: &UserDoc) -> Result<Vec<UniversityDoc>> {
        if user.target_universities.is_empty() {
            return Ok(Vec::new());
        }

        let universities = self
            .mongo
            .collection::<UniversityDoc>(UNIVERSITY_COLLECTION)
            .await?;

        let ids: Vec<ObjectId> = user
            .target_universities
            .iter()
            .filter_map(|s| ObjectId::parse_str(s.trim()).ok())
            .collect();
        let codes: Vec<String> = user
            .target_universities
            .iter()
            .map(|s| s.trim().to_uppercase())
            .collect();

        let matched = universities
            .find_many(doc! {
                "$or": [
                    { "_id": { "$in": ids } },
                    { "code": { "$in": codes } },
                ]
            })
            .await?;

        if !matched.is_empty() {
            return Ok(matched);
        }

        let names: Vec<String> = user
            .target_universities
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if names.is_empty() {
            return Ok(Vec::new());
        }

        universities
            .find_many(doc! { "name": { "$in": names } })
            .await
    }

    fn name_exact_filter(name: &str) -> Document {
        doc! {
            "name": {
                "$regex": format!("^{}$", escape_regex(name)),
                "$options": "i",
            }
        }
    }

    fn name_substring_filter(name: &str) -> Document {
        doc! {
            "name": {
                "$regex": escape_regex(&normalize_separators(name)),
                "$options": "i",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_code_deterministic() {
        assert_eq!(derive_code("UC Berkeley"), "UCBERKELEY");
        assert_eq!(derive_code("UC Berkeley"), derive_code("UC Berkeley"));
        assert_eq!(derive_code("San José State University"), "SANJOSSTAT");
        assert_eq!(derive_code("cal-poly_slo"), "CALPOLYSLO");
    }

    #[test]
    fn test_derive_code_truncates_to_ten() {
        let code = derive_code("University of California, Los Angeles");
        assert_eq!(code.len(), 10);
        assert_eq!(code, "UNIVERSITY");
    }

    #[test]
    fn test_interpretations_ordering() {
        let oid = ObjectId::new();
        let refs = CatalogRef::interpretations(&oid.to_hex());
        assert_eq!(refs.len(), 3);
        assert!(matches!(refs[0], CatalogRef::ById(parsed) if parsed == oid));

        let refs = CatalogRef::interpretations("ucla");
        assert_eq!(
            refs,
            vec![
                CatalogRef::ByCode("UCLA".into()),
                CatalogRef::ByName("ucla".into()),
            ]
        );
    }

    #[test]
    fn test_interpretations_empty_input() {
        assert!(CatalogRef::interpretations("").is_empty());
        assert!(CatalogRef::interpretations("   ").is_empty());
    }

    #[test]
    fn test_name_like() {
        assert!(CatalogRef::is_name_like("UC Davis"));
        assert!(!CatalogRef::is_name_like("x"));
        assert!(!CatalogRef::is_name_like(&ObjectId::new().to_hex()));
        assert!(!CatalogRef::is_name_like("  "));
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("C++ (intro)"), "C\\+\\+ \\(intro\\)");
        assert_eq!(escape_regex("plain words"), "plain words");
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("de-anza_college"), "de anza college");
    }
}
