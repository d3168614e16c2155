//! In-memory DNS provider for reconciler tests.

#![allow(dead_code)]

pub mod http;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use tunnel_dns::config::{Config, PacingConfig};
use tunnel_dns::dns::{DnsApi, DnsRecord, RecordSpec, Zone};
use tunnel_dns::error::{ReconcileError, ReconcileResult};

pub const TARGET: &str = "tunnel.example.net";

/// A call received by [`FakeApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListZones,
    ListRecords { zone_id: String, name: String },
    Create { zone_id: String, spec: RecordSpec },
    Update { zone_id: String, record_id: String, spec: RecordSpec },
}

#[derive(Default)]
struct State {
    zones: Vec<Zone>,
    records: Vec<(String, DnsRecord)>,
    calls: Vec<Call>,
    next_id: u32,
}

/// Provider double that stores records in memory and logs every
/// call.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
    failing_writes: HashSet<String>,
    fail_zone_listing: bool,
    lookup_delays: HashMap<String, Duration>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().zones.push(Zone {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_record(self, zone_id: &str, record: DnsRecord) -> Self {
        self.state
            .lock()
            .unwrap()
            .records
            .push((zone_id.into(), record));
        self
    }

    /// Make create and update calls for `fqdn` fail with HTTP 500.
    pub fn failing_write(mut self, fqdn: &str) -> Self {
        self.failing_writes.insert(fqdn.into());
        self
    }

    pub fn failing_zone_listing(mut self) -> Self {
        self.fail_zone_listing = true;
        self
    }

    /// Delay record lookups in `zone_id`.
    pub fn slow_zone(mut self, zone_id: &str, delay: Duration) -> Self {
        self.lookup_delays.insert(zone_id.into(), delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create { .. } | Call::Update { .. }))
            .collect()
    }

    pub fn records_named(&self, name: &str) -> Vec<DnsRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|(_, r)| r.name == name)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn check_write(&self, name: &str) -> ReconcileResult<()> {
        if self.failing_writes.contains(name) {
            return Err(ReconcileError::Api {
                status: 500,
                message: "HTTP 500 Internal Server Error".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DnsApi for FakeApi {
    async fn list_zones(&self) -> ReconcileResult<Vec<Zone>> {
        self.record(Call::ListZones);
        if self.fail_zone_listing {
            return Err(ReconcileError::Api {
                status: 403,
                message: "9109: Invalid access token".into(),
            });
        }
        Ok(self.state.lock().unwrap().zones.clone())
    }

    async fn list_records(&self, zone_id: &str, name: &str) -> ReconcileResult<Vec<DnsRecord>> {
        self.record(Call::ListRecords {
            zone_id: zone_id.into(),
            name: name.into(),
        });
        if let Some(delay) = self.lookup_delays.get(zone_id) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|(z, r)| z == zone_id && r.name == name)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn create_record(&self, zone_id: &str, spec: &RecordSpec) -> ReconcileResult<DnsRecord> {
        self.record(Call::Create {
            zone_id: zone_id.into(),
            spec: spec.clone(),
        });
        self.check_write(&spec.name)?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record = DnsRecord {
            id: format!("new{}", state.next_id),
            name: spec.name.clone(),
            record_type: spec.record_type.clone(),
            content: spec.content.clone(),
            ttl: spec.ttl,
            proxied: spec.proxied,
        };
        state.records.push((zone_id.into(), record.clone()));
        Ok(record)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        spec: &RecordSpec,
    ) -> ReconcileResult<DnsRecord> {
        self.record(Call::Update {
            zone_id: zone_id.into(),
            record_id: record_id.into(),
            spec: spec.clone(),
        });
        self.check_write(&spec.name)?;

        let mut state = self.state.lock().unwrap();
        let (_, record) = state
            .records
            .iter_mut()
            .find(|(z, r)| z == zone_id && r.id == record_id)
            .ok_or_else(|| ReconcileError::Api {
                status: 404,
                message: "81044: Record does not exist".into(),
            })?;
        record.record_type.clone_from(&spec.record_type);
        record.content.clone_from(&spec.content);
        record.ttl = spec.ttl;
        record.proxied = spec.proxied;
        Ok(record.clone())
    }
}

pub fn cname(id: &str, name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.into(),
        name: name.into(),
        record_type: "CNAME".into(),
        content: content.into(),
        ttl: 1,
        proxied: true,
    }
}

/// Config pointing at [`TARGET`] with pacing disabled and no zones.
pub fn config() -> Config {
    let mut config = Config::new(TARGET);
    config.pacing = PacingConfig::disabled();
    config
}
