use axum::{
  response::{IntoResponse, Response},
  Json,
};
use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every predictable failure of the two API operations. The `IntoResponse`
/// impl below is the single boundary where these become HTTP responses, so
/// handlers only ever return `Result<_, Error>`.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Twitter URL is required")]
  MissingUrl,

  #[error("Invalid Twitter URL. Please provide a valid tweet URL with video.")]
  InvalidUrl,

  #[error("No media found in this tweet. Please ensure the tweet contains a video.")]
  NoMedia,

  #[error("No video found in this tweet.")]
  NoVideo,

  // the resolver's own message, passed through verbatim
  #[error("{0}")]
  Resolution(String),

  #[error("Failed to extract video data")]
  Transport(#[from] reqwest::Error),

  #[error("Video URL is required")]
  MissingVideoUrl,

  #[error("Failed to download video")]
  Download(#[source] reqwest::Error),

  #[error("Failed to download video")]
  Http(#[from] http::Error),
}

impl Error {
  fn status(&self) -> StatusCode {
    match self {
      Error::MissingUrl | Error::InvalidUrl | Error::MissingVideoUrl => {
        StatusCode::BAD_REQUEST
      }
      Error::NoMedia | Error::NoVideo => StatusCode::NOT_FOUND,
      Error::Resolution(_)
      | Error::Transport(_)
      | Error::Download(_)
      | Error::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();

    // the client only ever sees the envelope message; details stay in the log
    if status.is_server_error() {
      tracing::error!(%status, error = ?self, "request failed");
    }

    let body = Json(json!({
      "success": false,
      "message": self.to_string(),
    }));

    (status, body).into_response()
  }
}
