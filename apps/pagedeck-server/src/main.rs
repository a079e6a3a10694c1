//! pagedeck server
//!
//! HTTP service for page-level PDF transformations. Accepts PDF (and image)
//! uploads over multipart forms and returns the transformed PDF as a
//! downloadable attachment:
//!
//! - Reverse page order
//! - Delete the last two pages
//! - Delete N pages from the start or end
//! - Delete specific 1-based pages
//! - Insert images as full-page A4 pages
//! - Merge multiple PDFs in upload order
//!
//! Every request works inside its own scratch directory, removed when the
//! request finishes on any path, so concurrent requests never interfere.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod scratch;
#[cfg(test)]
mod tests;

use api::{
    handle_add_images, handle_delete_last_two, handle_delete_n, handle_delete_specific,
    handle_health, handle_index, handle_merge, handle_reverse,
};

/// Command-line arguments for the pagedeck server
#[derive(Parser, Debug)]
#[command(name = "pagedeck-server")]
#[command(about = "HTTP service for page-level PDF transformations")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Maximum accepted request body size in bytes
    #[arg(long, default_value = "67108864")]
    max_upload_bytes: usize,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Routes plus per-request middleware; rate limiting is layered on in main.
fn app(max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Upload form and health check
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        // Page operations
        .route("/reverse", post(handle_reverse))
        .route("/delete_last_2", post(handle_delete_last_two))
        .route("/delete_n", post(handle_delete_n))
        .route("/delete_specific", post(handle_delete_specific))
        .route("/add_images", post(handle_add_images))
        .route("/merge", post(handle_merge))
        // Apply middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pagedeck server on {}:{}", args.host, args.port);

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .expect("Failed to create rate limiter config"),
    );

    let app = app(args.max_upload_bytes).layer(GovernorLayer {
        config: governor_conf,
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Max upload size: {} bytes", args.max_upload_bytes);

    axum::serve(listener, app).await?;

    Ok(())
}
