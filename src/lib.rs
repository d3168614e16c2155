//! Point many subdomains at one tunnel with Cloudflare CNAME
//! records.
//!
//! `tunnel-dns` reads a desired-state file listing zones and their
//! subdomains, then makes sure every subdomain has a CNAME record
//! whose content is the tunnel target hostname. Running it again is
//! safe: existing records are updated, never duplicated.
//!
//! # Overview
//!
//! - [`Config`] is the desired state: target, zones, TTL, proxy
//!   flag, update policy, API and pacing settings
//! - [`DnsApi`](dns::DnsApi) is the provider seam, implemented for
//!   Cloudflare by [`Cloudflare`]
//! - [`Reconciler`] walks the configuration and returns a
//!   [`ReconcileReport`]
//!
//! # Algorithm
//!
//! 1. List every zone visible to the API token, once
//! 2. For each configured zone, skip all its subdomains if the zone
//!    is not visible
//! 3. For each subdomain, look up records with the exact name and
//!    update the first one, or create one if none exist
//!
//! A failing record never stops the run; it is reported as failed.
//! Only a missing credential, an invalid configuration or a failed
//! zone listing abort.
//!
//! # Example
//!
//! ```yaml
//! # tunnel-dns.yaml
//! target: tunnel.example.net
//! zones:
//!   example.com: [www, api, "@"]
//!   example.org: [app]
//! ```
//!
//! ```sh
//! export CF_API_TOKEN=...
//! tunnel-dns --config tunnel-dns.yaml
//!
//! # Preview without writing
//! tunnel-dns --dry-run
//!
//! # Leave matching records alone
//! tunnel-dns --diff-aware
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod pacer;
pub mod reconcile;
pub mod report;
pub mod telemetry;

pub use config::{Config, UpdatePolicy};
pub use dns::cloudflare::Cloudflare;
pub use reconcile::Reconciler;
pub use report::{Outcome, ReconcileReport};
