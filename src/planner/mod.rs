//! Transfer timeline planning
//!
//! Derives a fixed milestone schedule from a target transfer term and the
//! user's existing applications. Pure calendar arithmetic; persistence is
//! the routes layer's job.

pub mod generator;

pub use generator::{build_milestones, ApplicationDue, MilestonePlan, Season, TransferTerm};
