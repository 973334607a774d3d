//! The HTTP JSON API: template catalog, previews, verification and issue creation.

mod api;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use moka::future::Cache as VerifyCache;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::github::{self, Verification};
use crate::prelude::*;
use crate::template::Catalog;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct Server {
    pub ctx: Context,
    pub catalog: Arc<Catalog>,
    pub github: Arc<github::Client>,
    /// Successful verifications, keyed by [`Credentials::fingerprint`](crate::github::Credentials::fingerprint).
    pub verified: VerifyCache<u64, Verification>,
}

impl Server {
    pub fn new(ctx: &Context) -> Result<Self> {
        let catalog = Catalog::builtin()?;
        let github = github::Client::new(&ctx.config.github)
            .wrap_err("Failed to build the GitHub client.")?;
        debug!("Proxying issues to {}", github.api_url());

        let verified = VerifyCache::builder()
            .max_capacity(ctx.config.cache.verify_capacity)
            .time_to_live(Duration::from_secs(ctx.config.cache.verify_ttl_secs))
            .build();

        Ok(Self {
            ctx: Arc::clone(ctx),
            catalog: Arc::new(catalog),
            github: Arc::new(github),
            verified,
        })
    }
}

/// Bootstraps the Tokio runtime and starts the internal `async` serving code.
pub fn serve(ctx: &Context) -> Result<()> {
    runtime()?.block_on(_serve(ctx))
}

async fn _serve(ctx: &Context) -> Result<()> {
    let port = match &ctx.args.command {
        Command::Serve { port: Some(port) } => *port,
        _ => ctx.config.serve.port,
    };

    let address: SocketAddr = format!("{}:{port}", ctx.config.serve.address)
        .parse()
        .wrap_err("Invalid listen address.")
        .suggestion("Check the `address` and `port` keys under [serve] in your configuration file.")?;

    let server = Server::new(ctx)?;
    let app = router(server)?;

    info!("Listening on http://{address}");

    axum::Server::try_bind(&address)
        .wrap_err_with(|| format!("Could not bind to {address}."))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("The HTTP server exited with an error.")?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}

/// Builds the full application router over `server`.
pub fn router(server: Server) -> Result<Router> {
    let cors = cors_layer(&server.ctx.config.serve.cors_origins)?;
    let frontend = server.ctx.config.serve.frontend_dir.clone();

    let api = Router::new()
        .route("/", get(api::index))
        .route("/test", get(api::index))
        .route("/templates", get(api::templates))
        .route("/templates/:name", get(api::template))
        .route("/template/:name", get(api::template))
        .route("/preview", post(api::preview))
        .route("/issues/create", post(api::create_issue))
        .route("/create-issue", post(api::create_issue))
        .route("/verify", post(api::verify))
        .route("/verify-token", get(api::verify_token));

    let mut app = Router::new()
        .route("/health", get(api::health))
        .nest("/api", api);

    match frontend {
        Some(dir) if dir.is_dir() => {
            debug!("Serving frontend from {dir:?}");
            app = app
                .nest_service("/static", ServeDir::new(&dir))
                .route_service("/", ServeFile::new(dir.join("index.html")));
        }
        Some(dir) => {
            debug!("Frontend directory {dir:?} not found, serving the API only.");
            app = app.route("/", get(api::root));
        }
        None => app = app.route("/", get(api::root)),
    }

    Ok(app
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(server))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).wrap_err_with(|| format!("Invalid CORS origin {o:?}.")))
        .collect::<Result<Vec<_>>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
