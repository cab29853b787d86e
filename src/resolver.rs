mod syndication;

use std::sync::Arc;

use async_trait::async_trait;

pub use syndication::Syndication;

use crate::{tweet::ResolvedTweet, Result};

/// Turns a tweet URL into structured post + media metadata. The concrete
/// extraction technique lives behind this seam and is swappable without
/// touching the endpoints.
#[async_trait]
pub trait Resolver: Send + Sync {
  async fn resolve(&self, url: &str) -> Result<ResolvedTweet>;
}

pub type DynResolver = Arc<dyn Resolver>;
