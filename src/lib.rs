//! TransferAble - transfer planning API
//!
//! Helps community-college students plan coursework, track application
//! deadlines, and connect with mentors for transferring to four-year
//! universities.
//!
//! ## Services
//!
//! - **Catalog**: canonical colleges, universities, majors, courses, and
//!   course equivalencies, with fuzzy entity resolution over loosely-typed
//!   references
//! - **Applications**: per-user application records with essays and
//!   activities
//! - **Planner**: deterministic transfer-timeline milestone generation
//! - **Requirements**: completion status and advisory notifications
//!   derived from articulation data
//! - **Mentorship**: mentor directory, request lifecycle, polling chat
//! - **Billing**: premium-tier checkout and webhook-driven tier changes

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod planner;
pub mod requirements;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TransferableError};
