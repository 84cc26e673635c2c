//! Delimited-text tables at the edges of the pipeline.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{MetadataRecord, RepoRef};

#[derive(Debug, Clone, Deserialize)]
pub struct CountRow {
    pub repo: String,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
struct RepoRow {
    repo: String,
}

/// Output row for metadata tables; column order is `fork,found,lang,repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MetadataRow {
    pub fork: Option<bool>,
    pub found: bool,
    pub lang: String,
    pub repo: String,
}

impl From<&MetadataRecord> for MetadataRow {
    fn from(record: &MetadataRecord) -> Self {
        Self {
            fork: record.fork,
            found: record.found,
            lang: record.language.clone(),
            repo: record.repo.to_string(),
        }
    }
}

pub fn read_count_rows(path: &Path) -> Result<Vec<CountRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open count table {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<CountRow>().enumerate() {
        let row = record.with_context(|| {
            format!("failed to parse row {} of {}", index + 1, path.display())
        })?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn read_repo_set(path: &Path) -> Result<HashSet<RepoRef>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open repo table {}", path.display()))?;

    let mut repos = HashSet::new();
    for (index, record) in reader.deserialize::<RepoRow>().enumerate() {
        let row = record.with_context(|| {
            format!("failed to parse row {} of {}", index + 1, path.display())
        })?;
        repos.insert(RepoRef::new(row.repo));
    }

    Ok(repos)
}

pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        crate::util::ensure_directory(parent)?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create table {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush table {}", path.display()))?;

    Ok(())
}

pub fn write_metadata_table(path: &Path, records: &[MetadataRecord]) -> Result<()> {
    let rows: Vec<MetadataRow> = records.iter().map(MetadataRow::from).collect();
    if rows.is_empty() {
        return write_header_only(path, &["fork", "found", "lang", "repo"]);
    }
    write_rows(path, &rows)
}

/// `csv::Writer` derives headers from the first serialized row, so an empty
/// table needs its header written explicitly.
pub fn write_header_only(path: &Path, header: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        crate::util::ensure_directory(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create table {}", path.display()))?;
    writer
        .write_record(header)
        .with_context(|| format!("failed to write header to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush table {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn read_count_rows_ignores_extra_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.csv");
        fs::write(
            &path,
            "year,quarter,event,repo,count\n2020,1,WatchEvent,a/b,3\n2020,2,WatchEvent,c/d,5\n",
        )
        .expect("write events");

        let rows = read_count_rows(&path).expect("read counts");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].repo, "a/b");
        assert_eq!(rows[1].count, 5);
    }

    #[test]
    fn read_count_rows_reports_bad_row_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.csv");
        fs::write(&path, "repo,count\na/b,many\n").expect("write events");

        let err = read_count_rows(&path).expect_err("non-numeric count must fail");
        assert!(format!("{err:#}").contains("events.csv"));
    }

    #[test]
    fn read_repo_set_collects_distinct_repos_and_ignores_other_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dones.csv");
        fs::write(&path, "source,repo\nold,a/b\nold,c/d\nnew,a/b\n").expect("write dones");

        let repos = read_repo_set(&path).expect("read dones");
        assert_eq!(repos.len(), 2);
        assert!(repos.contains(&RepoRef::from("a/b")));
        assert!(repos.contains(&RepoRef::from("c/d")));
    }

    #[test]
    fn read_repo_set_requires_a_repo_column() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dones.csv");
        fs::write(&path, "name\na/b\n").expect("write dones");

        let err = read_repo_set(&path).expect_err("missing repo column must fail");
        assert!(format!("{err:#}").contains("dones.csv"));
    }

    #[test]
    fn metadata_table_leaves_unknown_fork_blank() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("langs.csv");
        let records = vec![
            MetadataRecord::found(
                RepoRef::from("a/b"),
                "Rust".to_string(),
                false,
                PathBuf::from("chunk0.json"),
            ),
            MetadataRecord::not_found(RepoRef::from("x/y"), PathBuf::from("chunk0.json")),
        ];

        write_metadata_table(&path, &records).expect("write table");
        let written = fs::read_to_string(&path).expect("read table");
        assert_eq!(
            written,
            "fork,found,lang,repo\nfalse,true,Rust,a/b\n,false,,x/y\n"
        );
    }

    #[test]
    fn empty_metadata_table_still_has_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("langs.csv");
        write_metadata_table(&path, &[]).expect("write table");
        assert_eq!(
            fs::read_to_string(&path).expect("read table"),
            "fork,found,lang,repo\n"
        );
    }
}
