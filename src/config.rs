use std::{net::SocketAddr, time::Duration};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RESOLVER_BASE_URL: &str = "https://cdn.syndication.twimg.com";
const DEFAULT_RESOLVER_TIMEOUT_SECS: u64 = 30;

/// Startup configuration, read once from the environment in `main` and
/// passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
  pub bind_addr: SocketAddr,
  pub resolver_base_url: String,
  pub resolver_timeout: Duration,
}

impl Config {
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|port| port.parse::<u16>().ok())
      .unwrap_or(DEFAULT_PORT);

    let resolver_base_url = std::env::var("RESOLVER_BASE_URL")
      .unwrap_or_else(|_| DEFAULT_RESOLVER_BASE_URL.to_owned());

    let resolver_timeout = std::env::var("RESOLVER_TIMEOUT_SECS")
      .ok()
      .and_then(|secs| secs.parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(Duration::from_secs(DEFAULT_RESOLVER_TIMEOUT_SECS));

    Self {
      bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
      resolver_base_url,
      resolver_timeout,
    }
  }
}
