//! Configuration for transferable
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// TransferAble - transfer planning API server
#[derive(Parser, Debug, Clone)]
#[command(name = "transferable")]
#[command(about = "Transfer planning API for community-college students")]
pub struct Args {
    /// Unique node identifier for this server instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (relaxed auth, collaborators optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "transferable")]
    pub mongodb_db: String,

    /// JWT secret for verifying identity-provider tokens (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (dev-mode token minting only)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Base URL of the text-completion collaborator
    #[arg(long, env = "COMPLETION_API_URL")]
    pub completion_api_url: Option<String>,

    /// API key for the text-completion collaborator
    ///
    /// When absent, advisory endpoints degrade to an explanatory message
    /// instead of calling out.
    #[arg(long, env = "COMPLETION_API_KEY")]
    pub completion_api_key: Option<String>,

    /// Base URL of the billing collaborator
    #[arg(long, env = "BILLING_API_URL")]
    pub billing_api_url: Option<String>,

    /// API key for the billing collaborator
    #[arg(long, env = "BILLING_API_KEY")]
    pub billing_api_key: Option<String>,

    /// Shared secret for billing webhook signatures
    #[arg(long, env = "BILLING_WEBHOOK_SECRET")]
    pub billing_webhook_secret: Option<String>,

    /// Redirect URL after a successful checkout
    #[arg(long, env = "CHECKOUT_SUCCESS_URL", default_value = "http://localhost:3000/billing/success")]
    pub checkout_success_url: String,

    /// Redirect URL after an abandoned checkout
    #[arg(long, env = "CHECKOUT_CANCEL_URL", default_value = "http://localhost:3000/billing/cancel")]
    pub checkout_cancel_url: String,

    /// Billing plan identifier for the premium tier
    #[arg(long, env = "PREMIUM_PLAN_ID", default_value = "plan_premium_monthly")]
    pub premium_plan_id: String,

    /// Path for JSONL usage-event logging (disabled when unset)
    #[arg(long, env = "USAGE_LOG_PATH")]
    pub usage_log_path: Option<PathBuf>,
}

impl Args {
    /// Get effective JWT secret (uses an insecure default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.is_none() {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            if self.billing_api_url.is_some() && self.billing_webhook_secret.is_none() {
                return Err(
                    "BILLING_WEBHOOK_SECRET is required when BILLING_API_URL is set".to_string(),
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["transferable"])
    }

    #[test]
    fn test_dev_mode_defaults() {
        let mut args = base_args();
        args.dev_mode = true;
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "dev-only-insecure-secret");
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let args = base_args();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_production_requires_webhook_secret_with_billing() {
        let mut args = base_args();
        args.jwt_secret = Some("secret".into());
        args.billing_api_url = Some("https://billing.example".into());
        assert!(args.validate().is_err());

        args.billing_webhook_secret = Some("whsec".into());
        assert!(args.validate().is_ok());
    }
}
