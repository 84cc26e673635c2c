use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Repository identifier in `owner/name` form.
///
/// Values are kept as read so that malformed identifiers still show up in
/// input counts; [`RepoRef::owner_and_name`] is the validating accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoRef(String);

impl RepoRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_owner_separator(&self) -> bool {
        self.0.contains('/')
    }

    /// Splits into `(owner, name)` when there is exactly one `/` and both
    /// sides are non-empty.
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        let mut parts = self.0.split('/');
        let owner = parts.next()?;
        let name = parts.next()?;
        if parts.next().is_some() || owner.is_empty() || name.is_empty() {
            return None;
        }
        Some((owner, name))
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepoRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub repo: RepoRef,
    pub weight: u64,
}

/// One resolved (or unresolvable) repository as read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub repo: RepoRef,
    pub found: bool,
    pub language: String,
    /// `None` when the repository could not be found.
    pub fork: Option<bool>,
    pub source_archive: PathBuf,
}

impl MetadataRecord {
    pub fn found(repo: RepoRef, language: String, fork: bool, source_archive: PathBuf) -> Self {
        Self {
            repo,
            found: true,
            language,
            fork: Some(fork),
            source_archive,
        }
    }

    pub fn not_found(repo: RepoRef, source_archive: PathBuf) -> Self {
        Self {
            repo,
            found: false,
            language: String::new(),
            fork: None,
            source_archive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichPaths {
    pub events: Vec<String>,
    pub dones: Option<String>,
    pub outdir: String,
    pub run_manifest_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichCounts {
    pub input_rows: usize,
    pub queued_repos: usize,
    pub done_repos: usize,
    pub remaining_repos: usize,
    pub planned_chunks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    pub attempted: usize,
    pub succeeded: usize,
    pub transient_errors: usize,
    pub archive_conflicts: usize,
    pub other_errors: usize,
}

impl RunTally {
    pub fn errors(&self) -> usize {
        self.transient_errors + self.archive_conflicts + self.other_errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub sequence: u64,
    pub repo_count: usize,
    pub status: String,
    pub archive_path: Option<String>,
    pub archive_sha256: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub endpoint: String,
    pub batch_size: usize,
    pub first_sequence: u64,
    pub paths: EnrichPaths,
    pub counts: EnrichCounts,
    pub tally: RunTally,
    pub chunks: Vec<ChunkEntry>,
    pub warnings: Vec<String>,
}
