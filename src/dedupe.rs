//! Cross-archive deduplication and contradiction reporting.
//!
//! Resolution policy: among the distinct rows for one repository, the row
//! first seen in archive sequence order wins (the oldest answer). The
//! choice is arbitrary; it only has to be deterministic.

use std::collections::{BTreeMap, HashSet};

use crate::model::{MetadataRecord, RepoRef};

#[derive(Debug, Default)]
pub struct Resolution {
    /// Exactly one row per repository, sorted by repository.
    pub resolved: Vec<MetadataRecord>,
    /// Every distinct row of every contradicted repository, sorted by
    /// repository then language.
    pub contradictions: Vec<MetadataRecord>,
    pub distinct_rows: usize,
}

impl Resolution {
    pub fn contradicted_repos(&self) -> usize {
        let mut repos: Vec<&RepoRef> = self.contradictions.iter().map(|row| &row.repo).collect();
        repos.dedup();
        repos.len()
    }
}

/// Drops exact duplicates (provenance ignored), keeping input order.
pub fn distinct_records(records: Vec<MetadataRecord>) -> Vec<MetadataRecord> {
    let mut seen = HashSet::new();
    let mut distinct = Vec::with_capacity(records.len());
    for record in records {
        let key = (
            record.repo.clone(),
            record.found,
            record.language.clone(),
            record.fork,
        );
        if seen.insert(key) {
            distinct.push(record);
        }
    }
    distinct
}

pub fn resolve(records: Vec<MetadataRecord>) -> Resolution {
    let distinct = distinct_records(records);
    let distinct_rows = distinct.len();

    let mut by_repo: BTreeMap<RepoRef, Vec<MetadataRecord>> = BTreeMap::new();
    for record in distinct {
        by_repo.entry(record.repo.clone()).or_default().push(record);
    }

    let mut resolved = Vec::with_capacity(by_repo.len());
    let mut contradictions = Vec::new();
    for (_, mut rows) in by_repo {
        if rows.len() > 1 {
            let mut report = rows.clone();
            report.sort_by(|a, b| a.language.cmp(&b.language));
            contradictions.extend(report);
        }
        resolved.push(rows.swap_remove(0));
    }

    Resolution {
        resolved,
        contradictions,
        distinct_rows,
    }
}
