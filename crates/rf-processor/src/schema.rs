//! Ingestion-time column aliasing.
//!
//! Some inputs carry era-dependent column names for the same quantity. The
//! adapter runs once per batch and exposes each of them under one canonical
//! name, so nothing downstream probes for alternatives.

use serde::{Deserialize, Serialize};

use rf_core::Result;

use crate::batch::EventBatch;

/// One canonical column and the source names it may come from, by priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAlias {
    /// Name exposed to the processors.
    pub canonical: String,
    /// Source columns, first match wins.
    pub sources: Vec<String>,
}

impl ColumnAlias {
    /// Alias from string slices.
    pub fn new(canonical: &str, sources: &[&str]) -> Self {
        Self { canonical: canonical.to_string(), sources: sources.iter().map(|s| s.to_string()).collect() }
    }
}

/// Ordered set of column aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaAdapter {
    aliases: Vec<ColumnAlias>,
}

impl Default for SchemaAdapter {
    /// Lepton isolation: 0.4 cone if present, else 0.3 cone.
    fn default() -> Self {
        Self {
            aliases: vec![
                ColumnAlias::new("electron_relIso", &["Electron_pfRelIso04_all", "Electron_pfRelIso03_all"]),
                ColumnAlias::new("muon_relIso", &["Muon_pfRelIso04_all", "Muon_pfRelIso03_all"]),
            ],
        }
    }
}

impl SchemaAdapter {
    /// Adapter with no aliases.
    pub fn empty() -> Self {
        Self { aliases: Vec::new() }
    }

    /// Add an alias.
    pub fn alias(mut self, alias: ColumnAlias) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Configured aliases.
    pub fn aliases(&self) -> &[ColumnAlias] {
        &self.aliases
    }

    /// Expose every resolvable alias under its canonical name.
    ///
    /// A canonical column already present in the batch is left alone.
    /// Unresolvable aliases are skipped; a processor that needs the column
    /// fails later with the canonical name.
    pub fn apply(&self, batch: &mut EventBatch) -> Result<()> {
        for alias in &self.aliases {
            if batch.has_column(&alias.canonical) {
                continue;
            }
            let sources: Vec<&str> = alias.sources.iter().map(String::as_str).collect();
            match batch.first_column(&sources) {
                Some((source, values)) => {
                    let values = values.to_vec();
                    tracing::debug!(canonical = %alias.canonical, source, "column aliased");
                    batch.insert_column(alias.canonical.clone(), values)?;
                }
                None => tracing::debug!(canonical = %alias.canonical, "no source column for alias"),
            }
        }
        Ok(())
    }
}
