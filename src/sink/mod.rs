//! Opportunity sink and snapshot persistence.
//!
//! Holds the live set of opportunities keyed by their upsert identity,
//! and publishes the whole set as one JSON snapshot via write-to-temp
//! then rename, so a reader never observes a half-written file.
//!
//! The raw quote snapshot from each cycle is persisted separately so
//! the calculation stages can be replayed later (`--recompute`) without
//! touching the external API.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{FairPrice, Opportunity, OpportunityKey, Quote};

// ---------------------------------------------------------------------------
// Snapshot formats
// ---------------------------------------------------------------------------

/// The published opportunity snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub generated_at: DateTime<Utc>,
    pub opportunities: Vec<Opportunity>,
    /// Fair-price audit records for the groups behind the opportunities.
    #[serde(default)]
    pub fair_prices: Vec<FairPrice>,
}

/// The persisted raw-quote snapshot backing recomputation.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuotesFile {
    pub captured_at: DateTime<Utc>,
    pub quotes: Vec<Quote>,
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Idempotent store of scored opportunities.
///
/// Upserts are last-write-wins on [`OpportunityKey`], so re-running a
/// cycle over unchanged quotes leaves the set unchanged.
pub struct OpportunitySink {
    path: PathBuf,
    entries: BTreeMap<OpportunityKey, Opportunity>,
    fair_prices: Vec<FairPrice>,
}

impl OpportunitySink {
    /// Open the sink, loading any previously published snapshot so
    /// retention spans restarts.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = BTreeMap::new();

        if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            let snapshot: SnapshotFile = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
            for opp in snapshot.opportunities {
                entries.insert(opp.key(), opp);
            }
            info!(
                path = %path.display(),
                entries = entries.len(),
                "Loaded existing opportunity snapshot"
            );
        }

        Ok(Self {
            path,
            entries,
            fair_prices: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upsert one cycle's opportunities. Returns (inserted, updated).
    pub fn upsert_cycle(&mut self, opportunities: Vec<Opportunity>) -> (usize, usize) {
        let mut inserted = 0;
        let mut updated = 0;
        for opp in opportunities {
            match self.entries.insert(opp.key(), opp) {
                Some(_) => updated += 1,
                None => inserted += 1,
            }
        }
        debug!(inserted, updated, total = self.entries.len(), "Cycle upserted");
        (inserted, updated)
    }

    /// Drop entries for events that have commenced, and entries not
    /// refreshed within the retention window (their market has gone
    /// stale or disappeared from the feed). Returns the removed count.
    pub fn prune(&mut self, now: DateTime<Utc>, retention_hours: i64) -> usize {
        let cutoff = now - Duration::hours(retention_hours);
        let before = self.entries.len();
        self.entries
            .retain(|_, opp| opp.commence_time > now && opp.updated_at >= cutoff);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Pruned stale entries");
        }
        removed
    }

    /// Replace the fair-price audit records published alongside the
    /// opportunities.
    pub fn set_audit(&mut self, fair_prices: Vec<FairPrice>) {
        self.fair_prices = fair_prices;
    }

    /// Publish the current set atomically: serialize to a temp file in
    /// the same directory, then rename over the target.
    pub fn publish(&self, generated_at: DateTime<Utc>) -> Result<()> {
        let snapshot = SnapshotFile {
            generated_at,
            opportunities: self.entries.values().cloned().collect(),
            fair_prices: self.fair_prices.clone(),
        };
        write_atomic(&self.path, &snapshot)?;
        info!(
            path = %self.path.display(),
            opportunities = snapshot.opportunities.len(),
            "Published opportunity snapshot"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Quote snapshot persistence
// ---------------------------------------------------------------------------

/// Persist the raw quote snapshot for later recomputation.
pub fn save_quotes(path: &Path, quotes: &[Quote], captured_at: DateTime<Utc>) -> Result<()> {
    let file = QuotesFile {
        captured_at,
        quotes: quotes.to_vec(),
    };
    write_atomic(path, &file)?;
    debug!(path = %path.display(), quotes = file.quotes.len(), "Saved quote snapshot");
    Ok(())
}

/// Load a previously saved quote snapshot. `Ok(None)` when no snapshot
/// has been written yet.
pub fn load_quotes(path: &Path) -> Result<Option<QuotesFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read quote snapshot {}", path.display()))?;
    let file: QuotesFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse quote snapshot {}", path.display()))?;
    Ok(Some(file))
}

/// Serialize to `<path>.tmp` and rename into place. Rename within one
/// directory is atomic on POSIX filesystems.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize snapshot")?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)
        .with_context(|| format!("Failed to write temp file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
