use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{
  config::Config,
  tweet::{self, ResolvedTweet, TweetMedia, VideoAttachment, VideoVariant},
  Error, Result,
};

use super::Resolver;

// resolve tweets through the syndication CDN, the JSON endpoint backing
// Twitter's embedded-tweet widgets. No credentials needed, only a token
// derived from the tweet id.
pub struct Syndication {
  client: reqwest::Client,
  base_url: String,
}

impl Syndication {
  pub fn new(config: &Config) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(config.resolver_timeout)
      .build()?;

    Ok(Self {
      client,
      base_url: config.resolver_base_url.clone(),
    })
  }
}

#[async_trait]
impl Resolver for Syndication {
  async fn resolve(&self, url: &str) -> Result<ResolvedTweet> {
    let id = tweet::tweet_id(url).ok_or(Error::InvalidUrl)?;

    let request_url = format!(
      "{}/tweet-result?id={}&token={}",
      self.base_url,
      id,
      syndication_token(id)
    );

    let resp = self
      .client
      .get(&request_url)
      .header("User-Agent", "Mozilla/5.0")
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::Resolution(format!(
        "Failed to extract video data (tweet resolver returned {})",
        resp.status()
      )));
    }

    let raw: RawTweet = resp.json().await?;
    convert(raw)
  }
}

fn convert(raw: RawTweet) -> Result<ResolvedTweet> {
  // deleted, protected and age-gated tweets come back as a tombstone with
  // a human-readable explanation
  if let Some(tombstone) = raw.tombstone {
    let message = tombstone
      .text
      .map(|text| text.text)
      .unwrap_or_else(|| "Failed to extract video data".to_owned());
    return Err(Error::Resolution(message));
  }

  if raw.media_details.is_empty() {
    return Err(Error::NoMedia);
  }

  Ok(ResolvedTweet {
    text: raw.text,
    author: raw.user.and_then(|user| user.screen_name),
    media: raw.media_details.into_iter().map(TweetMedia::from).collect(),
  })
}

#[derive(Deserialize)]
struct RawTweet {
  #[serde(default)]
  text: Option<String>,
  #[serde(default)]
  user: Option<RawUser>,
  #[serde(rename = "mediaDetails", default)]
  media_details: Vec<RawMedia>,
  #[serde(default)]
  tombstone: Option<Tombstone>,
}

#[derive(Deserialize)]
struct RawUser {
  #[serde(default)]
  screen_name: Option<String>,
}

#[derive(Deserialize)]
struct Tombstone {
  #[serde(default)]
  text: Option<TombstoneText>,
}

#[derive(Deserialize)]
struct TombstoneText {
  text: String,
}

#[derive(Deserialize)]
struct RawMedia {
  #[serde(rename = "type")]
  kind: String,
  #[serde(rename = "media_url_https", default)]
  cover: Option<String>,
  #[serde(rename = "video_info", default)]
  video_info: Option<RawVideoInfo>,
}

#[derive(Deserialize, Default)]
struct RawVideoInfo {
  #[serde(default)]
  variants: Vec<RawVariant>,
}

#[derive(Deserialize)]
struct RawVariant {
  #[serde(default)]
  bitrate: Option<u64>,
  content_type: String,
  url: String,
}

impl From<RawMedia> for TweetMedia {
  fn from(raw: RawMedia) -> Self {
    let RawMedia {
      kind,
      cover,
      video_info,
    } = raw;

    let variants = video_info
      .unwrap_or_default()
      .variants
      .into_iter()
      // HLS playlists are not directly downloadable, keep the mp4 renditions
      .filter(|variant| variant.content_type == "video/mp4")
      .map(|variant| VideoVariant {
        quality: dimension_label(&variant.url),
        url: variant.url,
        bitrate: variant.bitrate,
      })
      .collect();

    let attachment = VideoAttachment { cover, variants };

    match kind.as_str() {
      "video" => TweetMedia::Video(attachment),
      "animated_gif" => TweetMedia::AnimatedGif(attachment),
      _ => TweetMedia::Other,
    }
  }
}

// mp4 rendition URLs carry their dimensions in the path,
// e.g. …/vid/avc1/720x1280/AbCdEf.mp4
static DIMENSIONS_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"/(\d+x\d+)/").expect("pattern is hard-coded, thus must be valid")
});

fn dimension_label(url: &str) -> Option<String> {
  DIMENSIONS_REGEX.captures(url).map(|captures| {
    captures
      .get(1)
      .expect("group 1 is not optional")
      .as_str()
      .to_owned()
  })
}

// The widget frontend derives its token as
// ((id / 1e15) * PI).toString(36) with zeroes and the radix point removed.
fn syndication_token(id: &str) -> String {
  const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

  let id: f64 = id.parse().unwrap_or_default();
  let value = (id / 1e15) * std::f64::consts::PI;

  let mut digits = Vec::new();

  let mut int_part = value.trunc() as u64;
  while int_part > 0 {
    digits.insert(0, BASE36[(int_part % 36) as usize]);
    int_part /= 36;
  }

  // twelve fractional digits exhaust f64 precision at this magnitude
  let mut fraction = value.fract();
  for _ in 0..12 {
    fraction *= 36.0;
    digits.push(BASE36[fraction.trunc() as usize % 36]);
    fraction = fraction.fract();
  }

  String::from_utf8(digits)
    .expect("base36 digits are ascii")
    .replace('0', "")
}

#[cfg(test)]
mod test {
  use super::*;

  const VIDEO_TWEET: &str = r#"{
    "text": "launch day",
    "user": { "screen_name": "nasa" },
    "mediaDetails": [
      {
        "type": "photo",
        "media_url_https": "https://pbs.twimg.com/media/photo.jpg"
      },
      {
        "type": "video",
        "media_url_https": "https://pbs.twimg.com/media/thumb.jpg",
        "video_info": {
          "variants": [
            {
              "content_type": "application/x-mpegURL",
              "url": "https://video.twimg.com/ext_tw_video/1/pu/pl/playlist.m3u8"
            },
            {
              "bitrate": 832000,
              "content_type": "video/mp4",
              "url": "https://video.twimg.com/ext_tw_video/1/pu/vid/avc1/480x852/low.mp4"
            },
            {
              "bitrate": 2176000,
              "content_type": "video/mp4",
              "url": "https://video.twimg.com/ext_tw_video/1/pu/vid/avc1/720x1280/high.mp4"
            }
          ]
        }
      }
    ]
  }"#;

  #[test]
  fn maps_raw_media_into_tagged_attachments() {
    let raw: RawTweet = serde_json::from_str(VIDEO_TWEET).unwrap();
    let tweet = convert(raw).unwrap();

    assert_eq!(tweet.text.as_deref(), Some("launch day"));
    assert_eq!(tweet.author.as_deref(), Some("nasa"));
    assert_eq!(tweet.media.len(), 2);
    assert!(matches!(tweet.media[0], TweetMedia::Other));

    let TweetMedia::Video(attachment) = &tweet.media[1] else {
      panic!("expected a video attachment");
    };
    assert_eq!(
      attachment.cover.as_deref(),
      Some("https://pbs.twimg.com/media/thumb.jpg")
    );

    // the m3u8 playlist is filtered out, mp4 renditions remain
    assert_eq!(attachment.variants.len(), 2);
    assert_eq!(attachment.variants[0].quality.as_deref(), Some("480x852"));
    assert_eq!(attachment.variants[1].quality.as_deref(), Some("720x1280"));
    assert_eq!(attachment.variants[1].bitrate, Some(2_176_000));
  }

  #[test]
  fn tweet_without_media_is_no_media() {
    let raw: RawTweet = serde_json::from_str(
      r#"{ "text": "words only", "user": { "screen_name": "nasa" } }"#,
    )
    .unwrap();
    let err = convert(raw).unwrap_err();
    assert!(matches!(err, Error::NoMedia));
  }

  #[test]
  fn tombstone_surfaces_the_capability_message() {
    let raw: RawTweet = serde_json::from_str(
      r#"{ "tombstone": { "text": { "text": "This Post is unavailable." } } }"#,
    )
    .unwrap();
    let err = convert(raw).unwrap_err();
    match err {
      Error::Resolution(message) => {
        assert_eq!(message, "This Post is unavailable.")
      }
      other => panic!("expected a resolution failure, got {other:?}"),
    }
  }

  #[test]
  fn dimension_labels_come_from_the_url_path() {
    assert_eq!(
      dimension_label("https://video.twimg.com/vid/avc1/720x1280/x.mp4"),
      Some("720x1280".to_owned())
    );
    assert_eq!(dimension_label("https://video.twimg.com/vid/x.mp4"), None);
  }

  #[test]
  fn token_is_deterministic_and_zero_free() {
    let token = syndication_token("1580661436132757506");
    assert!(!token.is_empty());
    assert!(!token.contains('0'));
    assert!(!token.contains('.'));
    assert!(token.bytes().all(|b| b.is_ascii_alphanumeric()));
    assert_eq!(token, syndication_token("1580661436132757506"));
  }
}
