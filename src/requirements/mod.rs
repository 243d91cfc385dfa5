//! Course requirement view
//!
//! Joins a user's completed courses against articulation data for their
//! target universities to classify each transferable course and derive
//! advisory notifications (prerequisite gaps, low completion rate).

pub mod view;

pub use view::{
    AdvisoryNotification, CourseRequirementRow, NotificationPriority, RequirementStatus,
    RequirementView,
};
