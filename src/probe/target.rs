//! Probe targets.
//!
//! # Responsibilities
//! - Define the handle a transport hands over for probing
//! - Provide the built-in TCP, HTTP and proxied HTTP round trips
//! - Reject malformed targets at construction time
//!
//! # Design Decisions
//! - Targets never apply their own timeout; the prober does
//! - HTTP status >= 400 is a protocol-level rejection, anything else means reachable

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::{Client, Proxy};
use thiserror::Error;
use tokio::net::TcpStream;
use url::Url;

use crate::config::TargetConfig;
use crate::probe::result::ProbeFailure;

/// User agent sent with HTTP probes.
pub const PROBE_USER_AGENT: &str = "observatory-probe/0.1";

/// Default URL for HTTP probes.
pub const DEFAULT_PROBE_URL: &str = "https://www.gstatic.com/generate_204";

const URL_SCHEMES: &[&str] = &["http", "https"];
const PROXY_SCHEMES: &[&str] = &["socks5", "socks5h", "http", "https"];

/// A handle able to perform one minimal round trip over a candidate's path.
pub trait ProbeTarget: Send + Sync + fmt::Debug {
    /// Human readable description for logs.
    fn describe(&self) -> String;

    /// Perform one round trip. Must not retry.
    fn round_trip(&self) -> BoxFuture<'_, Result<(), ProbeFailure>>;
}

/// Error raised when a target definition cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("invalid address '{0}': expected host:port")]
    InvalidAddress(String),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme '{scheme}' in '{url}'")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Probe by opening a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpTarget {
    address: String,
}

impl TcpTarget {
    pub fn new(address: impl Into<String>) -> Result<Self, TargetError> {
        let address = address.into();
        check_address(&address)?;
        Ok(Self { address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl ProbeTarget for TcpTarget {
    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }

    fn round_trip(&self) -> BoxFuture<'_, Result<(), ProbeFailure>> {
        Box::pin(async move {
            TcpStream::connect(self.address.as_str())
                .await
                .map(|_stream| ())
                .map_err(|e| ProbeFailure::Connect(e.to_string()))
        })
    }
}

/// Probe by fetching a URL, directly or through the candidate's proxy endpoint.
///
/// The body is read to the end so the measurement covers the full exchange.
/// Connections are never pooled: every probe pays for its own handshake.
pub struct HttpTarget {
    url: Url,
    proxy: Option<Url>,
    client: Client,
}

impl HttpTarget {
    /// Fetch `url` directly.
    pub fn new(url: &str) -> Result<Self, TargetError> {
        let url = parse_url(url, URL_SCHEMES)?;
        let client = client_builder().no_proxy();
        Self::with_client(url, None, client)
    }

    /// Fetch `url` through `proxy` (`socks5://`, `socks5h://`, `http://` or `https://`).
    pub fn via_proxy(url: &str, proxy: &str) -> Result<Self, TargetError> {
        let url = parse_url(url, URL_SCHEMES)?;
        let proxy = parse_url(proxy, PROXY_SCHEMES)?;
        let route = Proxy::all(proxy.as_str()).map_err(|e| TargetError::InvalidUrl {
            url: proxy.to_string(),
            reason: e.to_string(),
        })?;
        let client = client_builder().proxy(route);
        Self::with_client(url, Some(proxy), client)
    }

    fn with_client(
        url: Url,
        proxy: Option<Url>,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self, TargetError> {
        let client = builder
            .build()
            .map_err(|e| TargetError::Client(e.to_string()))?;
        Ok(Self { url, proxy, client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }
}

fn client_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(PROBE_USER_AGENT)
        .pool_max_idle_per_host(0)
}

impl fmt::Debug for HttpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTarget")
            .field("url", &self.url.as_str())
            .field("proxy", &self.proxy.as_ref().map(Url::as_str))
            .finish()
    }
}

impl ProbeTarget for HttpTarget {
    fn describe(&self) -> String {
        match &self.proxy {
            Some(proxy) => format!("{} via {}", self.url, proxy),
            None => self.url.to_string(),
        }
    }

    fn round_trip(&self) -> BoxFuture<'_, Result<(), ProbeFailure>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url.clone())
                .send()
                .await
                .map_err(|e| ProbeFailure::Connect(error_chain(&e)))?;

            let status = response.status();
            if status.as_u16() >= 400 {
                return Err(ProbeFailure::Rejected(format!("HTTP {}", status)));
            }

            response
                .bytes()
                .await
                .map_err(|e| ProbeFailure::Connect(error_chain(&e)))?;
            Ok(())
        })
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}

impl TargetConfig {
    /// Check the definition without building anything.
    pub fn check(&self) -> Result<(), TargetError> {
        match self {
            TargetConfig::Tcp { address } => check_address(address),
            TargetConfig::Http { url } => parse_url(url, URL_SCHEMES).map(|_| ()),
            TargetConfig::Proxy { proxy, url } => {
                parse_url(url, URL_SCHEMES)?;
                parse_url(proxy, PROXY_SCHEMES).map(|_| ())
            }
        }
    }

    /// Build the probe handle described by this definition.
    pub fn build(&self) -> Result<Arc<dyn ProbeTarget>, TargetError> {
        match self {
            TargetConfig::Tcp { address } => Ok(Arc::new(TcpTarget::new(address.clone())?)),
            TargetConfig::Http { url } => Ok(Arc::new(HttpTarget::new(url)?)),
            TargetConfig::Proxy { proxy, url } => Ok(Arc::new(HttpTarget::via_proxy(url, proxy)?)),
        }
    }
}

fn check_address(address: &str) -> Result<(), TargetError> {
    let invalid = || TargetError::InvalidAddress(address.to_string());
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || host == "[]" {
        return Err(invalid());
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(invalid()),
    }
}

fn parse_url(raw: &str, schemes: &[&str]) -> Result<Url, TargetError> {
    let url = Url::parse(raw).map_err(|e| TargetError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(TargetError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().is_none() {
        return Err(TargetError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}
