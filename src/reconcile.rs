use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::{Config, UpdatePolicy};
use crate::dns::{self, DnsApi, RecordSpec, Zone};
use crate::error::{ReconcileError, ReconcileResult};
use crate::pacer::Pacer;
use crate::report::{ItemReport, Outcome, ReconcileReport, SkipReason};

/// Converges the CNAME records of every configured
/// `(zone, subdomain)` entry on the configured target.
///
/// # Example
///
/// ```rust,no_run
/// use tunnel_dns::{Cloudflare, Config, Reconciler};
///
/// # async fn run() -> anyhow::Result<()> {
/// let config = Config::new("tunnel.example.net").zone("example.com", &["www", "@"]);
/// let api = Cloudflare::from_env(&config.api)?;
///
/// let report = Reconciler::new(&api, &config).run().await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct Reconciler<'a> {
    api: &'a dyn DnsApi,
    config: &'a Config,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(api: &'a dyn DnsApi, config: &'a Config) -> Self {
        Self {
            api,
            config,
            dry_run: false,
        }
    }

    /// Perform lookups only; report what would be written.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconcile every entry.
    ///
    /// Per-entry failures are recorded in the report. Only a failure
    /// to list zones aborts the run.
    pub async fn run(&self) -> ReconcileResult<ReconcileReport> {
        let zones = self
            .api
            .list_zones()
            .await
            .map_err(|e| ReconcileError::ZoneListing(e.to_string()))?;
        info!(visible = zones.len(), configured = self.config.zones.len(), "zones listed");

        // One bucket for the whole run, shared by concurrent zone workers.
        let pacer = Pacer::new(self.config.pacing);
        let per_zone: Vec<Vec<ItemReport>> = futures::stream::iter(
            self.config
                .zones
                .iter()
                .map(|(name, labels)| self.reconcile_zone(name, labels, &zones, &pacer)),
        )
        .buffered(self.config.zone_concurrency.max(1))
        .collect()
        .await;

        Ok(ReconcileReport {
            items: per_zone.into_iter().flatten().collect(),
            dry_run: self.dry_run,
        })
    }

    async fn reconcile_zone(
        &self,
        name: &str,
        labels: &[String],
        zones: &[Zone],
        pacer: &Pacer,
    ) -> Vec<ItemReport> {
        let Some(zone) = zones.iter().find(|z| z.name == name) else {
            warn!(zone = name, subdomains = labels.len(), "zone not found, skipping");
            return labels
                .iter()
                .map(|label| item(name, label, Outcome::Skipped(SkipReason::ZoneNotFound)))
                .collect();
        };

        let mut items = Vec::with_capacity(labels.len());

        for label in labels {
            pacer.acquire().await;
            let fqdn = dns::fqdn(label, name);
            let outcome = match self.reconcile_record(zone, &fqdn).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(zone = name, fqdn = %fqdn, error = %e, "record failed");
                    Outcome::Failed(e.to_string())
                }
            };
            items.push(item(name, label, outcome));
        }

        items
    }

    async fn reconcile_record(&self, zone: &Zone, fqdn: &str) -> ReconcileResult<Outcome> {
        let spec = RecordSpec::cname(
            fqdn,
            &self.config.target,
            self.config.ttl,
            self.config.proxied,
        );
        let existing = self.api.list_records(&zone.id, fqdn).await?;

        if existing.len() > 1 {
            warn!(
                fqdn,
                count = existing.len(),
                "multiple records share this name, using the first"
            );
        }

        let Some(record) = existing.first() else {
            if !self.dry_run {
                self.api.create_record(&zone.id, &spec).await?;
            }
            info!(fqdn, target = %spec.content, dry_run = self.dry_run, "CNAME created");
            return Ok(Outcome::Created);
        };

        if self.config.update == UpdatePolicy::WhenChanged && spec.matches(record) {
            debug!(fqdn, record_id = %record.id, "CNAME already up to date");
            return Ok(Outcome::Unchanged);
        }

        if !self.dry_run {
            self.api.update_record(&zone.id, &record.id, &spec).await?;
        }
        info!(
            fqdn,
            record_id = %record.id,
            previous = %record.content,
            target = %spec.content,
            dry_run = self.dry_run,
            "CNAME updated"
        );
        Ok(Outcome::Updated)
    }
}

fn item(zone: &str, label: &str, outcome: Outcome) -> ItemReport {
    ItemReport {
        zone: zone.to_string(),
        label: label.to_string(),
        fqdn: dns::fqdn(label, zone),
        outcome,
    }
}
