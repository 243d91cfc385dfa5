//! Milestone schedule generation
//!
//! A target term like "Fall 2026" expands into a fixed eight-milestone
//! UC/CSU transfer schedule anchored on the application year (the year
//! before a fall term, the term's own year otherwise), plus one milestone
//! per existing application due at that application's stored deadline.
//!
//! Regeneration fully replaces the prior milestone set, so the output is a
//! pure function of (term, applications) and re-running is idempotent.
//! Malformed term strings are rejected up front instead of flowing into
//! nonsense dates.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::db::schemas::MilestoneCategory;
use crate::types::{Result, TransferableError};

/// Academic season of a transfer term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Fall,
    Spring,
    Summer,
    Winter,
}

impl FromStr for Season {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fall" => Ok(Season::Fall),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "winter" => Ok(Season::Winter),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Fall => write!(f, "Fall"),
            Season::Spring => write!(f, "Spring"),
            Season::Summer => write!(f, "Summer"),
            Season::Winter => write!(f, "Winter"),
        }
    }
}

/// A parsed target transfer term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTerm {
    pub season: Season,
    pub year: i32,
}

impl TransferTerm {
    /// Parse `"<Season> <Year>"` (case-insensitive season, 4-digit year).
    ///
    /// Anything else (missing space, unknown season, non-numeric or
    /// non-4-digit year) is a validation error.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.split_whitespace();
        let (season_str, year_str) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(y), None) => (s, y),
            _ => return Err(Self::format_error(input)),
        };

        let season: Season = season_str
            .parse()
            .map_err(|_| Self::format_error(input))?;

        if year_str.len() != 4 || !year_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(Self::format_error(input));
        }
        let year: i32 = year_str.parse().map_err(|_| Self::format_error(input))?;

        Ok(Self { season, year })
    }

    /// The year applications are filed: the year before a fall term, the
    /// term's own year otherwise.
    pub fn application_year(&self) -> i32 {
        match self.season {
            Season::Fall => self.year - 1,
            _ => self.year,
        }
    }

    fn format_error(input: &str) -> TransferableError {
        TransferableError::Validation(format!(
            "targetTransferTerm must look like \"Fall 2026\", got \"{}\"",
            input
        ))
    }
}

impl fmt::Display for TransferTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.year)
    }
}

/// An existing application feeding one extra milestone
#[derive(Debug, Clone)]
pub struct ApplicationDue {
    pub university_name: String,
    pub deadline: NaiveDate,
}

/// One planned milestone (pre-persistence)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestonePlan {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub category: MilestoneCategory,
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        TransferableError::Validation(format!("invalid milestone date {year}-{month}-{day}"))
    })
}

/// Build the full milestone set for a term: 8 fixed milestones plus one
/// per existing application.
pub fn build_milestones(
    term: &TransferTerm,
    applications: &[ApplicationDue],
) -> Result<Vec<MilestonePlan>> {
    let app_year = term.application_year();
    let entry_year = term.year;

    let mut milestones = vec![
        MilestonePlan {
            title: "Complete GE Requirements".into(),
            description: "Finish IGETC or university GE pattern coursework".into(),
            due_date: date(app_year, 6, 1)?,
            category: MilestoneCategory::Academic,
        },
        MilestonePlan {
            title: "Complete Major Prerequisites".into(),
            description: "Finish articulated prerequisite courses for your major".into(),
            due_date: date(app_year, 6, 1)?,
            category: MilestoneCategory::Academic,
        },
        MilestonePlan {
            title: "UC Application Opens".into(),
            description: "The UC application becomes available".into(),
            due_date: date(app_year, 8, 1)?,
            category: MilestoneCategory::Application,
        },
        MilestonePlan {
            title: "Start Application Essays".into(),
            description: "Begin drafting personal insight question responses".into(),
            due_date: date(app_year, 9, 1)?,
            category: MilestoneCategory::Application,
        },
        MilestonePlan {
            title: "UC Application Deadline".into(),
            description: "Submit all UC applications".into(),
            due_date: date(app_year, 11, 30)?,
            category: MilestoneCategory::Application,
        },
        MilestonePlan {
            title: "Transcript Deadline".into(),
            description: "Order official transcripts for submitted applications".into(),
            due_date: date(app_year, 12, 31)?,
            category: MilestoneCategory::Application,
        },
        MilestonePlan {
            title: "FAFSA Deadline".into(),
            description: "Submit FAFSA for state aid priority consideration".into(),
            due_date: date(entry_year, 3, 2)?,
            category: MilestoneCategory::FinancialAid,
        },
        MilestonePlan {
            title: "Housing Application".into(),
            description: "Apply for on-campus housing at your target schools".into(),
            due_date: date(entry_year, 3, 1)?,
            category: MilestoneCategory::Housing,
        },
    ];

    for app in applications {
        milestones.push(MilestonePlan {
            title: format!("{} Application", app.university_name),
            description: format!("Application deadline for {}", app.university_name),
            due_date: app.deadline,
            category: MilestoneCategory::Application,
        });
    }

    Ok(milestones)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_terms() {
        let term = TransferTerm::parse("Fall 2026").unwrap();
        assert_eq!(term.season, Season::Fall);
        assert_eq!(term.year, 2026);

        let term = TransferTerm::parse("spring 2027").unwrap();
        assert_eq!(term.season, Season::Spring);

        let term = TransferTerm::parse("  WINTER   2025  ").unwrap();
        assert_eq!(term.season, Season::Winter);
        assert_eq!(term.year, 2025);
    }

    #[test]
    fn test_parse_rejects_malformed_terms() {
        for bad in [
            "",
            "Fall",
            "2026",
            "Fall2026",
            "Autumn 2026",
            "Fall 26",
            "Fall 20266",
            "Fall twenty26",
            "Fall 2026 extra",
        ] {
            assert!(
                TransferTerm::parse(bad).is_err(),
                "expected rejection of {bad:?}"
            );
        }
    }

    #[test]
    fn test_application_year() {
        assert_eq!(TransferTerm::parse("Fall 2026").unwrap().application_year(), 2025);
        assert_eq!(TransferTerm::parse("Spring 2026").unwrap().application_year(), 2026);
        assert_eq!(TransferTerm::parse("Summer 2026").unwrap().application_year(), 2026);
        assert_eq!(TransferTerm::parse("Winter 2026").unwrap().application_year(), 2026);
    }

    #[test]
    fn test_fall_2026_fixed_milestones() {
        let term = TransferTerm::parse("Fall 2026").unwrap();
        let milestones = build_milestones(&term, &[]).unwrap();

        assert_eq!(milestones.len(), 8);

        let by_title = |t: &str| {
            milestones
                .iter()
                .find(|m| m.title == t)
                .unwrap_or_else(|| panic!("missing milestone {t}"))
        };

        assert_eq!(
            by_title("UC Application Deadline").due_date,
            NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()
        );
        assert_eq!(
            by_title("FAFSA Deadline").due_date,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert_eq!(
            by_title("Complete GE Requirements").due_date,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert_eq!(
            by_title("Housing Application").due_date,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert_eq!(
            by_title("UC Application Opens").due_date,
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
        );
    }

    #[test]
    fn test_one_extra_milestone_per_application() {
        let term = TransferTerm::parse("Fall 2026").unwrap();
        let apps = vec![
            ApplicationDue {
                university_name: "UCLA".into(),
                deadline: NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
            },
            ApplicationDue {
                university_name: "San Jose State University".into(),
                deadline: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
            },
        ];

        let milestones = build_milestones(&term, &apps).unwrap();
        assert_eq!(milestones.len(), 10);

        let ucla = milestones
            .iter()
            .find(|m| m.title == "UCLA Application")
            .unwrap();
        assert_eq!(ucla.due_date, NaiveDate::from_ymd_opt(2025, 11, 30).unwrap());
        assert_eq!(ucla.category, MilestoneCategory::Application);
    }

    #[test]
    fn test_spring_term_anchors_on_same_year() {
        let term = TransferTerm::parse("Spring 2027").unwrap();
        let milestones = build_milestones(&term, &[]).unwrap();

        let deadline = milestones
            .iter()
            .find(|m| m.title == "UC Application Deadline")
            .unwrap();
        assert_eq!(
            deadline.due_date,
            NaiveDate::from_ymd_opt(2027, 11, 30).unwrap()
        );
    }

    #[test]
    fn test_determinism() {
        let term = TransferTerm::parse("Fall 2026").unwrap();
        assert_eq!(
            build_milestones(&term, &[]).unwrap(),
            build_milestones(&term, &[]).unwrap()
        );
    }
}
