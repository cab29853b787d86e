use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::{
  resolver::{DynResolver, Resolver},
  tweet::{self, TweetVideo},
  Error, Result,
};

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
  #[serde(default)]
  url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExtractResponse {
  success: bool,
  data: TweetVideo,
}

#[axum::debug_handler]
pub async fn extract_video(
  State(resolver): State<DynResolver>,
  request: Option<Json<ExtractRequest>>,
) -> Result<impl IntoResponse, Error> {
  // an absent or undecodable body is the same failure as a missing url
  let url = request.and_then(|Json(request)| request.url);
  let video = run_extraction(&*resolver, url.as_deref()).await?;

  Ok(Json(ExtractResponse {
    success: true,
    data: video,
  }))
}

/// Validator -> resolver -> normalizer, linear; the first failure wins and
/// maps to its status through `Error`.
async fn run_extraction(
  resolver: &dyn Resolver,
  url: Option<&str>,
) -> Result<TweetVideo> {
  let url = match url {
    Some(url) if !url.is_empty() => url,
    _ => return Err(Error::MissingUrl),
  };

  if !tweet::is_tweet_url(url) {
    return Err(Error::InvalidUrl);
  }

  let resolved = resolver.resolve(url).await?;
  TweetVideo::from_tweet(resolved)
}
