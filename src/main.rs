use std::sync::Arc;

use axum::{
  headers::ContentType,
  response::IntoResponse,
  routing::{get, post},
  Json, Router, TypedHeader,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod config;
mod download;
mod error;
mod extract;
mod resolver;
mod tweet;

pub use error::{Error, Result};

use config::Config;
use resolver::{DynResolver, Syndication};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let config = Config::from_env();
  let resolver: DynResolver = Arc::new(Syndication::new(&config)?);

  let app = Router::new()
    .route("/", get(homepage))
    .route("/api/extract", post(extract::extract_video))
    .route("/api/download", get(download::download_video))
    .route("/api/health", get(health))
    .with_state(resolver);

  tracing::info!("Listening on http://{}", config.bind_addr);

  axum::Server::bind(&config.bind_addr)
    .serve(app.into_make_service())
    .await
    .expect("Failed to start server");

  Ok(())
}

pub const HOMEPAGE_HTML: &str = include_str!("../html/homepage.html");

async fn homepage() -> impl IntoResponse {
  (
    TypedHeader::<ContentType>(ContentType::html()),
    HOMEPAGE_HTML,
  )
}

async fn health() -> impl IntoResponse {
  Json(json!({ "status": "ok", "message": "Server is running" }))
}
