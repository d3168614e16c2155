use std::fmt;

/// Why an entry was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The zone is not visible to the credentials.
    ZoneNotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZoneNotFound => f.write_str("zone not found"),
        }
    }
}

/// Result of reconciling one `(zone, subdomain)` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// The existing record already matched; no write was issued.
    Unchanged,
    Skipped(SkipReason),
    Failed(String),
}

impl Outcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub zone: String,
    pub label: String,
    pub fqdn: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Counts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped + self.failed
    }
}

/// Per-entry outcomes of one run, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub items: Vec<ItemReport>,
    /// No writes were issued; outcomes describe what would happen.
    pub dry_run: bool,
}

impl ReconcileReport {
    #[must_use]
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for item in &self.items {
            match item.outcome {
                Outcome::Created => counts.created += 1,
                Outcome::Updated => counts.updated += 1,
                Outcome::Unchanged => counts.unchanged += 1,
                Outcome::Skipped(_) => counts.skipped += 1,
                Outcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// Entries whose outcome is `Failed`.
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, Outcome::Failed(_)))
    }

    #[must_use]
    pub fn item(&self, fqdn: &str) -> Option<&ItemReport> {
        self.items.iter().find(|item| item.fqdn == fqdn)
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .items
            .iter()
            .map(|item| item.fqdn.len())
            .max()
            .unwrap_or(0)
            .max("Name".len());

        if self.dry_run {
            writeln!(f, "Dry run: no changes were made")?;
            writeln!(f)?;
        }

        writeln!(f, "{:<width$}  Result", "Name")?;
        writeln!(f, "{:-<width$}  {:-<9}", "", "")?;
        for item in &self.items {
            write!(f, "{:<width$}  {}", item.fqdn, item.outcome.label())?;
            match &item.outcome {
                Outcome::Skipped(reason) => write!(f, " ({reason})")?,
                Outcome::Failed(message) => write!(f, " ({message})")?,
                _ => {}
            }
            writeln!(f)?;
        }

        let counts = self.counts();
        writeln!(f)?;
        writeln!(f, "Summary")?;
        writeln!(f, "  Created:   {}", counts.created)?;
        writeln!(f, "  Updated:   {}", counts.updated)?;
        if counts.unchanged > 0 {
            writeln!(f, "  Unchanged: {}", counts.unchanged)?;
        }
        writeln!(f, "  Skipped:   {}", counts.skipped)?;
        writeln!(f, "  Failed:    {}", counts.failed)?;
        write!(f, "  Total:     {}", counts.total())
    }
}
