//! HTTP fetcher for the published IP range lists.

use async_trait::async_trait;
use ipnet::IpNet;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SourcesConfig;
use crate::error::SyncError;

/// Address family of a range list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// The two published lists, each sorted lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpRanges {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl IpRanges {
    /// Build from raw lists, sorting each one.
    pub fn new(mut ipv4: Vec<String>, mut ipv6: Vec<String>) -> Self {
        ipv4.sort();
        ipv6.sort();
        Self { ipv4, ipv6 }
    }

    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

/// Anything that can produce the current range lists.
#[async_trait]
pub trait RangeSource: Send + Sync {
    async fn fetch(&self) -> Result<IpRanges, SyncError>;
}

/// HTTP client for fetching lists
pub struct Fetcher {
    client: Client,
    sources: SourcesConfig,
}

impl Fetcher {
    /// Create a fetcher for the configured source URLs
    pub fn new(sources: &SourcesConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(sources.timeout_secs))
            .user_agent(format!("cfsync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            sources: sources.clone(),
        })
    }

    /// Fetch and parse one list
    async fn fetch_list(&self, url: &str, family: Family) -> Result<Vec<String>, SyncError> {
        debug!(%url, %family, "Fetching range list");

        let body = self.fetch_body(url).await?;
        let ranges = parse_range_list(&body, family)?;

        info!("Fetched {} list - {} ranges", family, ranges.len());
        Ok(ranges)
    }

    async fn fetch_body(&self, url: &str) -> Result<String, SyncError> {
        let max_size = self.sources.max_list_bytes;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Network(format!("{}: HTTP {}", url, status)));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > max_size as u64 {
                return Err(SyncError::Network(format!(
                    "{}: response too large: {} bytes (max: {} bytes)",
                    url, content_length, max_size
                )));
            }
        }

        let body = response.text().await.map_err(|e| network_error(url, e))?;

        // Content-Length is optional (chunked responses), so check again
        if body.len() > max_size {
            return Err(SyncError::Network(format!(
                "{}: downloaded content too large: {} bytes (max: {} bytes)",
                url,
                body.len(),
                max_size
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl RangeSource for Fetcher {
    async fn fetch(&self) -> Result<IpRanges, SyncError> {
        let (ipv4, ipv6) = tokio::try_join!(
            self.fetch_list(&self.sources.ipv4_url, Family::V4),
            self.fetch_list(&self.sources.ipv6_url, Family::V6),
        )?;

        Ok(IpRanges::new(ipv4, ipv6))
    }
}

fn network_error(url: &str, err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Network(format!("{}: request timed out", url))
    } else {
        SyncError::Network(format!("{}: {}", url, err))
    }
}

/// Parse a newline-separated CIDR list.
///
/// Lines are trimmed and blank lines dropped. Every remaining entry must be a
/// network of `family`; entries are kept verbatim and returned sorted.
pub fn parse_range_list(content: &str, family: Family) -> Result<Vec<String>, SyncError> {
    let mut ranges = Vec::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let net: IpNet = line
            .parse()
            .map_err(|_| SyncError::InvalidRange(format!("'{}' is not a CIDR range", line)))?;

        let matches_family = match family {
            Family::V4 => matches!(net, IpNet::V4(_)),
            Family::V6 => matches!(net, IpNet::V6(_)),
        };
        if !matches_family {
            return Err(SyncError::InvalidRange(format!(
                "'{}' found in the {} list",
                line, family
            )));
        }

        ranges.push(line.to_string());
    }

    if ranges.is_empty() {
        return Err(SyncError::InvalidRange(format!(
            "the {} list is empty",
            family
        )));
    }

    ranges.sort();
    Ok(ranges)
}
