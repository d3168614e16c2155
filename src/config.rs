//! Desired-state configuration loaded from YAML.
//!
//! ```yaml
//! target: tunnel.example.net
//! zones:
//!   example.com: [www, "@"]
//!   example.org: [app]
//! ```
//!
//! Every other key is optional; see [`Config`] for defaults.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dns::{self, APEX};
use crate::error::{ReconcileError, ReconcileResult};

pub const DEFAULT_CONFIG_PATH: &str = "tunnel-dns.yaml";

/// Slowest accepted pacing rate: one record operation every 100 s.
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.01;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Hostname every managed CNAME points at.
    pub target: String,

    /// Zone name -> subdomain labels. `@` is the zone apex.
    pub zones: IndexMap<String, Vec<String>>,

    /// Record TTL in seconds. `1` lets the provider choose.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Route traffic through the provider's proxy.
    #[serde(default = "default_proxied")]
    pub proxied: bool,

    #[serde(default)]
    pub update: UpdatePolicy,

    /// How many zones to reconcile at once.
    #[serde(default = "default_zone_concurrency")]
    pub zone_concurrency: usize,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pacing: PacingConfig,
}

/// What to do when a record with the desired name already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePolicy {
    /// Always send an update.
    #[default]
    Always,
    /// Only update when type, content, TTL or proxy flag differ.
    WhenChanged,
}

/// Provider API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,

    /// Environment variable holding the API token.
    pub token_env: String,

    /// Per-request timeout.
    pub timeout_secs: u64,

    /// Page size for the zone listing.
    pub per_page: u32,

    /// Retries of a rate-limited (429) request.
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloudflare.com/client/v4".to_string(),
            token_env: "CF_API_TOKEN".to_string(),
            timeout_secs: 30,
            per_page: 50,
            max_retries: 2,
        }
    }
}

/// Token bucket applied to record operations within a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    /// Sustained rate. `0` disables pacing.
    pub requests_per_second: f64,
    pub burst: u32,
}

impl PacingConfig {
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            requests_per_second: 0.0,
            burst: 1,
        }
    }
}

impl Default for PacingConfig {
    /// One operation every 500 ms.
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst: 1,
        }
    }
}

const fn default_ttl() -> u32 {
    1
}

const fn default_proxied() -> bool {
    true
}

const fn default_zone_concurrency() -> usize {
    1
}

impl Config {
    /// Minimal configuration with defaults for everything but the
    /// target and zones.
    #[must_use]
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            zones: IndexMap::new(),
            ttl: default_ttl(),
            proxied: default_proxied(),
            update: UpdatePolicy::default(),
            zone_concurrency: default_zone_concurrency(),
            api: ApiConfig::default(),
            pacing: PacingConfig::default(),
        }
    }

    #[must_use]
    pub fn zone(mut self, name: &str, labels: &[&str]) -> Self {
        self.zones.insert(
            name.to_string(),
            labels.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> ReconcileResult<Self> {
        if !path.exists() {
            return Err(ReconcileError::InvalidConfig(format!(
                "{} not found",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate YAML content.
    pub fn parse(content: &str) -> ReconcileResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReconcileResult<()> {
        if !dns::is_valid_hostname(&self.target) {
            return invalid(format!("target '{}' is not a valid hostname", self.target));
        }
        if self.zones.is_empty() {
            return invalid("no zones configured".into());
        }

        for (zone, labels) in &self.zones {
            if !dns::is_valid_hostname(zone) {
                return invalid(format!("zone '{zone}' is not a valid hostname"));
            }
            if labels.is_empty() {
                return invalid(format!("zone '{zone}' has no subdomains"));
            }
            for label in labels {
                if label != APEX && !dns::is_valid_record_name(&dns::fqdn(label, zone)) {
                    return invalid(format!("subdomain '{label}' of '{zone}' is not valid"));
                }
            }
        }

        if self.zone_concurrency == 0 {
            return invalid("zone_concurrency must be at least 1".into());
        }
        if !(5..=50).contains(&self.api.per_page) {
            return invalid("api.per_page must be between 5 and 50".into());
        }
        if self.api.timeout_secs == 0 {
            return invalid("api.timeout_secs must be positive".into());
        }
        let rate = self.pacing.requests_per_second;
        if !rate.is_finite() || rate < 0.0 {
            return invalid("pacing.requests_per_second must be zero or positive".into());
        }
        if rate > 0.0 && rate < MIN_REQUESTS_PER_SECOND {
            return invalid(format!(
                "pacing.requests_per_second must be 0 or at least {MIN_REQUESTS_PER_SECOND}"
            ));
        }
        if self.pacing.burst == 0 {
            return invalid("pacing.burst must be at least 1".into());
        }

        Ok(())
    }

    /// Number of `(zone, subdomain)` entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }
}

fn invalid(message: String) -> ReconcileResult<()> {
    Err(ReconcileError::InvalidConfig(message))
}
