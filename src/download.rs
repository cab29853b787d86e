use std::time::Duration;

use axum::{
  body::StreamBody, extract::Query, http::Response, response::IntoResponse,
};
use bytes::Bytes;
use futures::Stream;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, StatusCode};
use serde::Deserialize;

use crate::{Error, Result};

const DEFAULT_QUALITY: &str = "download";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
// a hung origin must not hold the upstream connection forever
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
  #[serde(default)]
  url: Option<String>,
  #[serde(default)]
  quality: Option<String>,
}

#[axum::debug_handler]
pub async fn download_video(
  Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, Error> {
  let url = match query.url {
    Some(url) if !url.is_empty() => url,
    _ => return Err(Error::MissingVideoUrl),
  };

  let quality =
    sanitize_quality(query.quality.as_deref().unwrap_or(DEFAULT_QUALITY));

  // reqwest picks the transport from the URL's own scheme
  let upstream = reqwest::Client::builder()
    .connect_timeout(CONNECT_TIMEOUT)
    .timeout(TRANSFER_TIMEOUT)
    .build()
    .map_err(Error::Download)?
    .get(&url)
    .send()
    .await
    .map_err(Error::Download)?;

  tracing::debug!(status = %upstream.status(), %url, "piping media from origin");

  attachment_response(&quality, upstream.bytes_stream())
}

/// Strips every character that could escape a filename inside a
/// Content-Disposition header. An all-stripped label falls back to the
/// default so the attachment never ends up extension-only.
fn sanitize_quality(quality: &str) -> String {
  static UNSAFE_CHARS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[^A-Za-z0-9_-]").expect("pattern is hard-coded, thus must be valid")
  });

  let safe = UNSAFE_CHARS_REGEX.replace_all(quality, "");
  if safe.is_empty() {
    DEFAULT_QUALITY.to_owned()
  } else {
    safe.into_owned()
  }
}

/// Headers first, bytes second: the download contract is fixed before the
/// first body chunk is consumed, so a mid-stream failure can only surface
/// as a truncated body. Dropping the response drops the upstream stream.
fn attachment_response<S, E>(
  quality: &str,
  stream: S,
) -> Result<Response<StreamBody<S>>>
where
  S: Stream<Item = Result<Bytes, E>> + Send + 'static,
  E: Into<axum::BoxError> + 'static,
{
  let resp = Response::builder()
    .status(StatusCode::OK)
    .header(
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"twitter-video-{quality}.mp4\""),
    )
    .header(header::CONTENT_TYPE, "video/mp4")
    .header("Content-Transfer-Encoding", "binary")
    .body(StreamBody::new(stream))?;

  Ok(resp)
}

#[cfg(test)]
mod test {
  use axum::body::HttpBody;

  use super::*;

  #[test]
  fn sanitizer_strips_unsafe_characters() {
    assert_eq!(sanitize_quality("720p"), "720p");
    assert_eq!(sanitize_quality("720p!!!"), "720p");
    assert_eq!(sanitize_quality("720x1280"), "720x1280");
    assert_eq!(sanitize_quality("../../etc/passwd"), "etcpasswd");
    assert_eq!(sanitize_quality("a\"; rm -rf"), "arm-rf");
  }

  #[test]
  fn sanitizer_falls_back_when_nothing_survives() {
    assert_eq!(sanitize_quality("!!!"), DEFAULT_QUALITY);
    assert_eq!(sanitize_quality(""), DEFAULT_QUALITY);
  }

  #[tokio::test]
  async fn missing_url_is_a_bad_request() {
    let query = Query(DownloadQuery {
      url: None,
      quality: Some("720p".to_owned()),
    });

    let err = match download_video(query).await {
      Err(err) => err,
      Ok(_) => panic!("expected a bad request"),
    };
    assert!(matches!(err, Error::MissingVideoUrl));
  }

  fn canned_stream(
    chunks: &'static [&'static [u8]],
  ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    futures::stream::iter(
      chunks.iter().map(|chunk| Ok(Bytes::from_static(chunk))),
    )
  }

  #[tokio::test]
  async fn attachment_carries_the_download_header_contract() {
    let resp =
      attachment_response("720p", canned_stream(&[b"mp4 bytes"])).unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
      resp.headers()[header::CONTENT_DISPOSITION],
      "attachment; filename=\"twitter-video-720p.mp4\""
    );
    assert_eq!(resp.headers()["content-transfer-encoding"], "binary");
  }

  #[tokio::test]
  async fn attachment_pipes_chunks_through_unbuffered() {
    let resp =
      attachment_response("720p", canned_stream(&[b"hello", b"world"]))
        .unwrap();

    let mut body = resp.into_body();
    assert_eq!(body.data().await.unwrap().unwrap(), "hello".as_bytes());
    assert_eq!(body.data().await.unwrap().unwrap(), "world".as_bytes());
    assert!(body.data().await.is_none());
  }
}
