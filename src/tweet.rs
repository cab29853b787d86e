use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{Error, Result};

// a tweet URL is an absolute http(s) URL on a supported host whose path
// ends in a numeric status id
static TWEET_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^https?://(?:www\.)?(?:twitter\.com|x\.com)/.+/status/(\d+)")
    .expect("pattern is hard-coded, thus must be valid")
});

/// Whether `url` points at a concrete tweet on one of the supported hosts.
/// Pure predicate; empty/missing input is the caller's problem.
pub fn is_tweet_url(url: &str) -> bool {
  TWEET_URL_REGEX.is_match(url)
}

/// The numeric status id of a tweet URL, when it has one.
pub fn tweet_id(url: &str) -> Option<&str> {
  TWEET_URL_REGEX
    .captures(url)
    .map(|captures| captures.get(1).expect("group 1 is not optional").as_str())
}

pub const DEFAULT_TITLE: &str = "Twitter Video";
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// One media attachment of a tweet, tagged by kind at the resolver boundary
/// so the normalizer can pattern match instead of sniffing fields.
#[derive(Debug)]
pub enum TweetMedia {
  Video(VideoAttachment),
  AnimatedGif(VideoAttachment),
  Other,
}

#[derive(Debug, Default)]
pub struct VideoAttachment {
  pub cover: Option<String>,
  pub variants: Vec<VideoVariant>,
}

/// One encoded rendition as the resolver reports it, before ranking.
#[derive(Debug, Clone)]
pub struct VideoVariant {
  pub quality: Option<String>,
  pub url: String,
  pub bitrate: Option<u64>,
}

/// Resolver adapter output: post metadata plus its media attachments.
#[derive(Debug, Default)]
pub struct ResolvedTweet {
  pub text: Option<String>,
  pub author: Option<String>,
  pub media: Vec<TweetMedia>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QualityOption {
  pub quality: String,
  pub url: String,
  pub bitrate: u64,
}

/// The success payload of `/api/extract`. `qualities` is never empty and
/// index 0 is always the highest-bitrate variant.
#[derive(Debug, Serialize)]
pub struct TweetVideo {
  pub thumbnail: String,
  pub title: String,
  pub author: String,
  pub qualities: Vec<QualityOption>,
}

impl TweetVideo {
  /// Picks the first playable attachment of a resolved tweet and ranks its
  /// variants best-first. A tweet is assumed to carry at most one primary
  /// video, so everything after the first playable attachment is ignored.
  pub fn from_tweet(tweet: ResolvedTweet) -> Result<Self> {
    let ResolvedTweet { text, author, media } = tweet;

    let attachment = media
      .into_iter()
      .find_map(|media| match media {
        TweetMedia::Video(attachment)
        | TweetMedia::AnimatedGif(attachment) => Some(attachment),
        TweetMedia::Other => None,
      })
      .ok_or(Error::NoVideo)?;

    let VideoAttachment { cover, variants } = attachment;

    let qualities: Vec<_> = variants
      .into_iter()
      // sorted_by is stable: variants tied on bitrate keep the resolver's
      // relative order, which decides what the client labels "best"
      .sorted_by(|a, b| {
        b.bitrate.unwrap_or(0).cmp(&a.bitrate.unwrap_or(0))
      })
      .enumerate()
      .map(|(index, variant)| QualityOption {
        quality: variant
          .quality
          .unwrap_or_else(|| format!("Quality {}", index + 1)),
        url: variant.url,
        bitrate: variant.bitrate.unwrap_or(0),
      })
      .collect();

    // an attachment without a single usable rendition is as good as no video
    if qualities.is_empty() {
      return Err(Error::NoVideo);
    }

    Ok(TweetVideo {
      thumbnail: cover.unwrap_or_default(),
      title: text.unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
      author: author.unwrap_or_else(|| DEFAULT_AUTHOR.to_owned()),
      qualities,
    })
  }
}
