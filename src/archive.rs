//! Sequence-numbered response archives: discovery, progress, and record
//! extraction.
//!
//! The archive directory is the only checkpoint. Everything here is a
//! read-only scan, so the next sequence number and the done set are always
//! re-derived from whatever `chunk<N>.json` files exist on disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::language::normalize_language;
use crate::model::{MetadataRecord, RepoRef};

#[derive(Debug, Error)]
#[error("failed to parse archive {}", .path.display())]
pub struct ArchiveParseError {
    pub path: PathBuf,
    #[source]
    pub source: serde_json::Error,
}

pub fn archive_file_name(sequence: u64) -> String {
    format!("chunk{sequence}.json")
}

pub fn archive_path(dir: &Path, sequence: u64) -> PathBuf {
    dir.join(archive_file_name(sequence))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub sequence: u64,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct ExtractedRecords {
    pub data: Vec<MetadataRecord>,
    pub errors: Vec<MetadataRecord>,
}

impl ExtractedRecords {
    pub fn into_records(self) -> Vec<MetadataRecord> {
        let mut records = self.data;
        records.extend(self.errors);
        records
    }
}

pub struct ArchiveReader {
    archive_name: Regex,
    error_repo: Regex,
}

impl ArchiveReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            archive_name: Regex::new(r"^chunk(\d+)\.json$")
                .context("failed to compile archive name regex")?,
            error_repo: Regex::new(r"'([^'/\s]+/[^'/\s]+)'")
                .context("failed to compile error repository regex")?,
        })
    }

    pub fn sequence_of(&self, file_name: &str) -> Option<u64> {
        self.archive_name
            .captures(file_name)
            .and_then(|captures| captures.get(1))
            .and_then(|value| value.as_str().parse::<u64>().ok())
    }

    /// Archives in ascending sequence order. A missing directory has none.
    pub fn list_archives(&self, dir: &Path) -> Result<Vec<ArchiveEntry>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();

            if !entry
                .file_type()
                .with_context(|| format!("failed to inspect file type: {}", path.display()))?
                .is_file()
            {
                continue;
            }

            let Some(sequence) = entry.file_name().to_str().and_then(|name| self.sequence_of(name))
            else {
                continue;
            };

            archives.push(ArchiveEntry { sequence, path });
        }

        archives.sort_by_key(|archive| archive.sequence);
        Ok(archives)
    }

    /// `max(N) + 1` over existing archives, or `0` for an empty directory.
    pub fn next_sequence(&self, dir: &Path) -> Result<u64> {
        Ok(self
            .list_archives(dir)?
            .last()
            .map(|archive| archive.sequence + 1)
            .unwrap_or(0))
    }

    pub fn read_archive(&self, path: &Path) -> Result<Value> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let value = serde_json::from_slice(&raw).map_err(|source| ArchiveParseError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(value)
    }

    pub fn extract(&self, response: &Value, source: &Path) -> ExtractedRecords {
        ExtractedRecords {
            data: self.extract_data(response, source),
            errors: self.extract_errors(response, source),
        }
    }

    fn extract_data(&self, response: &Value, source: &Path) -> Vec<MetadataRecord> {
        let Some(entries) = response.get("data").and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut records = Vec::with_capacity(entries.len());
        for (alias, entry) in entries {
            if entry.is_null() {
                continue;
            }

            let name_with_owner = entry.get("nameWithOwner").and_then(Value::as_str);
            let is_fork = entry.get("isFork").and_then(Value::as_bool);
            let (Some(name_with_owner), Some(is_fork)) = (name_with_owner, is_fork) else {
                debug!(alias = %alias, path = %source.display(), "skipping non-repository entry");
                continue;
            };

            let language = entry
                .get("primaryLanguage")
                .and_then(|value| value.get("name"))
                .and_then(Value::as_str)
                .map(normalize_language)
                .unwrap_or_default();

            records.push(MetadataRecord::found(
                RepoRef::new(name_with_owner),
                language,
                is_fork,
                source.to_path_buf(),
            ));
        }

        records
    }

    fn extract_errors(&self, response: &Value, source: &Path) -> Vec<MetadataRecord> {
        let Some(errors) = response.get("errors").and_then(Value::as_array) else {
            return Vec::new();
        };

        errors
            .iter()
            .filter_map(|error| error.get("message").and_then(Value::as_str))
            .filter_map(|message| self.error_repo.captures(message))
            .filter_map(|captures| captures.get(1))
            .map(|repo| MetadataRecord::not_found(RepoRef::new(repo.as_str()), source.to_path_buf()))
            .collect()
    }

    /// All records across every archive, archives in sequence order.
    pub fn load_records(&self, dir: &Path) -> Result<Vec<MetadataRecord>> {
        self.load_archives(&self.list_archives(dir)?)
    }

    /// Records from already-listed archives, in the order given.
    pub fn load_archives(&self, archives: &[ArchiveEntry]) -> Result<Vec<MetadataRecord>> {
        let mut records = Vec::new();
        for archive in archives {
            let response = self.read_archive(&archive.path)?;
            records.extend(self.extract(&response, &archive.path).into_records());
        }
        Ok(records)
    }

    /// Repositories that appear in any archive, found or not.
    pub fn done_set(&self, dir: &Path) -> Result<HashSet<RepoRef>> {
        Ok(self
            .load_records(dir)?
            .into_iter()
            .map(|record| record.repo)
            .collect())
    }
}
