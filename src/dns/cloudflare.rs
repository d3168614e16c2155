use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::dns::{DnsApi, DnsRecord, RecordSpec, Zone};
use crate::error::{ReconcileError, ReconcileResult};

/// Retry delay used when a 429 response carries no usable
/// `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

const PLACEHOLDER_TOKENS: &[&str] = &["changeme", "replace_me", "xxx"];

/// Cloudflare DNS API client.
///
/// Requires a token with `Zone > Zone > Read` and
/// `Zone > DNS > Edit` permissions on every managed zone.
pub struct Cloudflare {
    http: Client,
    base_url: String,
    token: String,
    per_page: u32,
    max_retries: u32,
    max_retry_after: Duration,
}

/// Successful response payload plus pagination data.
#[derive(Debug)]
pub struct Envelope<T> {
    pub result: T,
    pub result_info: Option<ResultInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResultInfo {
    pub page: u32,
    pub total_pages: u32,
}

impl Default for ResultInfo {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope<T> {
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

impl Cloudflare {
    /// Build a client from an explicit token.
    ///
    /// Fails without touching the network when the token is empty or
    /// a placeholder.
    pub fn new(token: &str, api: &ApiConfig) -> ReconcileResult<Self> {
        if is_placeholder(token) {
            return Err(ReconcileError::MissingCredential(api.token_env.clone()));
        }

        let timeout = Duration::from_secs(api.timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tunnel-dns/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            per_page: api.per_page,
            max_retries: api.max_retries,
            max_retry_after: timeout,
        })
    }

    /// Build a client reading the token from the environment variable
    /// named in `api.token_env`.
    pub fn from_env(api: &ApiConfig) -> ReconcileResult<Self> {
        let token = token_from_env(&api.token_env)?;
        Self::new(&token, api)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ReconcileResult<Envelope<T>> {
        let request = request.bearer_auth(&self.token);
        let mut retries = 0;

        loop {
            let attempt = request.try_clone().ok_or_else(|| ReconcileError::Api {
                status: 0,
                message: "request cannot be replayed".into(),
            })?;
            let response = attempt.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retries >= self.max_retries {
                    return Err(ReconcileError::RateLimited(retries));
                }
                let delay = retry_after_delay(
                    response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                if delay > self.max_retry_after {
                    warn!(delay_secs = delay.as_secs(), "rate limited for too long, giving up");
                    return Err(ReconcileError::RateLimited(retries));
                }
                warn!(delay_secs = delay.as_secs(), "rate limited, backing off");
                tokio::time::sleep(delay).await;
                retries += 1;
                continue;
            }

            let body = response.text().await?;
            return parse_envelope(status.as_u16(), &body);
        }
    }
}

#[async_trait]
impl DnsApi for Cloudflare {
    async fn list_zones(&self) -> ReconcileResult<Vec<Zone>> {
        let mut zones = Vec::new();
        let mut page = 1;

        loop {
            let path = format!("/zones?per_page={}&page={page}", self.per_page);
            debug!(page, "listing zones");
            let envelope: Envelope<Vec<Zone>> = self.execute(self.http.get(self.url(&path))).await?;
            let fetched = envelope.result.len();
            zones.extend(envelope.result);

            if !has_more_pages(envelope.result_info, page, fetched) {
                break;
            }
            page += 1;
        }

        Ok(zones)
    }

    async fn list_records(&self, zone_id: &str, name: &str) -> ReconcileResult<Vec<DnsRecord>> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records"));
        debug!(zone_id, name, "listing records");
        let envelope: Envelope<Vec<DnsRecord>> = self
            .execute(self.http.get(url).query(&[("name", name)]))
            .await?;
        Ok(envelope.result)
    }

    async fn create_record(&self, zone_id: &str, spec: &RecordSpec) -> ReconcileResult<DnsRecord> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records"));
        debug!(zone_id, name = %spec.name, "creating record");
        let envelope: Envelope<DnsRecord> = self.execute(self.http.post(url).json(spec)).await?;
        Ok(envelope.result)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        spec: &RecordSpec,
    ) -> ReconcileResult<DnsRecord> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records/{record_id}"));
        debug!(zone_id, record_id, name = %spec.name, "updating record");
        let envelope: Envelope<DnsRecord> = self.execute(self.http.put(url).json(spec)).await?;
        Ok(envelope.result)
    }
}

/// Interpret a Cloudflare response body.
///
/// A non-2xx status or `"success": false` becomes
/// [`ReconcileError::Api`] carrying the provider's error messages.
pub fn parse_envelope<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> ReconcileResult<Envelope<T>> {
    let ok_status = (200..300).contains(&status);

    let raw: RawEnvelope<T> = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(e) if ok_status => return Err(e.into()),
        Err(_) => {
            return Err(ReconcileError::Api {
                status,
                message: status_text(status),
            });
        }
    };

    if !ok_status || !raw.success.unwrap_or(ok_status) {
        let message = if raw.errors.is_empty() {
            status_text(status)
        } else {
            raw.errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{code}: {}", e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ")
        };
        return Err(ReconcileError::Api { status, message });
    }

    let result = raw.result.ok_or_else(|| ReconcileError::Api {
        status,
        message: "response has no result".into(),
    })?;

    Ok(Envelope {
        result,
        result_info: raw.result_info,
    })
}

/// Delay requested by a `Retry-After` header given in seconds.
///
/// Delays longer than the request timeout are not waited out; the
/// request fails as rate limited instead.
#[must_use]
pub fn retry_after_delay(header: Option<&str>) -> Duration {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

/// Read the API token from `var`.
pub fn token_from_env(var: &str) -> ReconcileResult<String> {
    match std::env::var(var) {
        Ok(token) if !is_placeholder(&token) => Ok(token),
        _ => Err(ReconcileError::MissingCredential(var.to_string())),
    }
}

/// Whether `token` is empty or an obvious stand-in left over from a
/// template.
#[must_use]
pub fn is_placeholder(token: &str) -> bool {
    let token = token.trim();
    let lower = token.to_ascii_lowercase();

    token.is_empty()
        || (token.starts_with('<') && token.ends_with('>'))
        || lower.starts_with("your_")
        || lower.starts_with("your-")
        || PLACEHOLDER_TOKENS.contains(&lower.as_str())
}

fn has_more_pages(info: Option<ResultInfo>, page: u32, fetched: usize) -> bool {
    fetched > 0 && info.is_some_and(|info| page < info.total_pages)
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), |reason| format!("HTTP {status} {reason}"))
}
