//! Catalog store access and entity resolution
//!
//! The catalog holds the canonical community colleges, universities,
//! majors, courses, and equivalencies. The resolver maps loosely-typed
//! external references (an id, a code, or a free-text name) onto canonical
//! rows, creating placeholder rows where the contract allows.

pub mod resolver;

pub use resolver::{derive_code, CatalogRef, CatalogResolver};
