//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each connection is
//! served on its own task; requests are routed by a `(method, path)`
//! match and handed to the route modules.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::catalog::CatalogResolver;
use crate::config::Args;
use crate::db::MongoClient;
use crate::logging::UsageLogger;
use crate::routes;
use crate::services::{BillingClient, CompletionService, HttpCompletionClient};
use crate::types::Result;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    /// Catalog entity resolver (id → code → name fallback chains)
    pub resolver: CatalogResolver,
    /// Validator for identity-provider bearer tokens
    pub jwt: JwtValidator,
    /// Completion collaborator; None when no API key is configured and
    /// advisory endpoints degrade to an explanatory message
    pub completion: Option<Arc<dyn CompletionService>>,
    /// Billing collaborator; None in dev setups without a processor
    pub billing: Option<BillingClient>,
    /// JSONL usage-event logger
    pub usage: UsageLogger,
}

impl AppState {
    /// Assemble state from validated configuration and a live Mongo client
    pub fn new(args: Args, mongo: MongoClient) -> Result<Self> {
        let jwt = if args.dev_mode {
            JwtValidator::new_dev()
        } else {
            JwtValidator::new(args.jwt_secret(), args.jwt_expiry_seconds)?
        };

        let completion: Option<Arc<dyn CompletionService>> =
            match (&args.completion_api_url, &args.completion_api_key) {
                (Some(url), Some(key)) => Some(Arc::new(HttpCompletionClient::new(
                    url.clone(),
                    key.clone(),
                ))),
                _ => {
                    warn!("Completion service not configured; advisory endpoints will degrade");
                    None
                }
            };

        let billing = match (&args.billing_api_url, &args.billing_api_key) {
            (Some(url), Some(key)) => Some(BillingClient::new(url.clone(), key.clone())),
            _ => {
                warn!("Billing service not configured");
                None
            }
        };

        let resolver = CatalogResolver::new(mongo.clone());
        let usage = UsageLogger::new(args.node_id.to_string());

        Ok(Self {
            args,
            mongo,
            resolver,
            jwt,
            completion,
            billing,
            usage,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "transferable listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - dev tokens accepted");
    }

    if let Some(path) = state.args.usage_log_path.clone() {
        if let Err(e) = state.usage.init_file(path).await {
            warn!("Usage logging disabled: {}", e);
        }
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)).await)
        }

        // Readiness probe - 200 only when MongoDB answers
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)).await)
        }

        // Build info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        // ====================================================================
        // Advisory AI endpoints (exact paths, dispatched before the
        // /api/applications prefix so ai-feedback lands here)
        // ====================================================================
        (Method::POST, "/api/ai-counselor")
        | (Method::POST, "/api/homework-help")
        | (Method::POST, "/api/applications/ai-feedback")
        | (Method::POST, "/api/transfer-prediction") => {
            return Ok(to_boxed(
                routes::handle_advisor_request(req, Arc::clone(&state), &path).await,
            ));
        }

        // User profile and sync
        (_, p) if p.starts_with("/api/users") => {
            return Ok(to_boxed(
                routes::handle_users_request(req, Arc::clone(&state), &path).await,
            ));
        }

        // Applications, essays, activities
        (_, p) if p.starts_with("/api/applications") => {
            return Ok(to_boxed(
                routes::handle_applications_request(req, Arc::clone(&state), &path).await,
            ));
        }

        // Timeline and milestones
        (_, p) if p.starts_with("/api/timeline") => {
            return Ok(to_boxed(
                routes::handle_timeline_request(req, Arc::clone(&state), &path).await,
            ));
        }

        // Course requirement view, notifications, completions
        (_, p) if p.starts_with("/api/courses") => {
            return Ok(to_boxed(
                routes::handle_courses_request(req, Arc::clone(&state), &path).await,
            ));
        }

        // Mentor directory, requests, chat
        (_, p) if p.starts_with("/api/mentors") => {
            return Ok(to_boxed(
                routes::handle_mentors_request(req, Arc::clone(&state), &path).await,
            ));
        }

        // Admin catalog import/seed
        (_, p) if p.starts_with("/api/admin") => {
            return Ok(to_boxed(
                routes::handle_admin_request(req, Arc::clone(&state), &path).await,
            ));
        }

        // Billing checkout and webhook
        (_, p) if p.starts_with("/api/payments") => {
            return Ok(to_boxed(
                routes::handle_payments_request(req, Arc::clone(&state), &path).await,
            ));
        }

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
