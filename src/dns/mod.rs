pub mod cloudflare;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileResult;

/// Label that stands for the zone apex.
pub const APEX: &str = "@";

/// A zone as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// A DNS record as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

/// The body sent when creating or updating a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSpec {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl RecordSpec {
    #[must_use]
    pub fn cname(name: &str, target: &str, ttl: u32, proxied: bool) -> Self {
        Self {
            record_type: "CNAME".to_string(),
            name: name.to_string(),
            content: target.to_string(),
            ttl,
            proxied,
        }
    }

    /// Whether `record` already carries exactly these values.
    ///
    /// Names and contents compare case-insensitively and ignore a
    /// trailing dot, since the provider normalises both.
    #[must_use]
    pub fn matches(&self, record: &DnsRecord) -> bool {
        record.record_type.eq_ignore_ascii_case(&self.record_type)
            && same_host(&record.content, &self.content)
            && record.ttl == self.ttl
            && record.proxied == self.proxied
    }
}

/// Zone and record operations needed to converge CNAME records.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// Every zone visible to the credentials.
    async fn list_zones(&self) -> ReconcileResult<Vec<Zone>>;

    /// Records in `zone_id` whose name is exactly `name`.
    async fn list_records(&self, zone_id: &str, name: &str) -> ReconcileResult<Vec<DnsRecord>>;

    async fn create_record(&self, zone_id: &str, spec: &RecordSpec) -> ReconcileResult<DnsRecord>;

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        spec: &RecordSpec,
    ) -> ReconcileResult<DnsRecord>;
}

/// Join a subdomain label and a zone into a fully-qualified name.
///
/// Example: `("www", "example.com")` -> `"www.example.com"`,
/// `("@", "example.com")` -> `"example.com"`.
#[must_use]
pub fn fqdn(label: &str, zone: &str) -> String {
    if label == APEX {
        zone.to_string()
    } else {
        format!("{label}.{zone}")
    }
}

/// Check hostname syntax: dot-separated labels of 1-63 ASCII
/// alphanumerics or hyphens, no label starting or ending with a
/// hyphen, at most 253 characters. A single trailing dot is allowed.
#[must_use]
pub fn is_valid_hostname(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(is_valid_label)
}

/// Like [`is_valid_hostname`], but also accepts a leading `*` label.
#[must_use]
pub fn is_valid_record_name(name: &str) -> bool {
    match name.strip_prefix("*.") {
        Some(rest) => is_valid_hostname(rest),
        None => is_valid_hostname(name),
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn same_host(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}
