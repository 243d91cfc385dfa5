//! Authentication and authorization for transferable
//!
//! Provides:
//! - JWT bearer-token validation (tokens minted by the external identity
//!   provider; we only verify)
//! - Permission levels for role authorization
//! - Subscription-tier gating for premium features

pub mod jwt;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use permissions::PermissionLevel;
