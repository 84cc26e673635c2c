use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::archive::ArchiveReader;
use crate::cli::StatusArgs;
use crate::model::{EnrichRunManifest, RepoRef};

pub fn run(args: StatusArgs) -> Result<()> {
    let outdir = &args.outdir;
    info!(outdir = %outdir.display(), "status requested");

    if !outdir.exists() {
        warn!(path = %outdir.display(), "archive directory missing");
        return Ok(());
    }

    let reader = ArchiveReader::new()?;
    let archives = reader.list_archives(outdir)?;
    let sequences: Vec<u64> = archives.iter().map(|archive| archive.sequence).collect();
    let gaps = sequence_gaps(&sequences);
    let next_sequence = sequences.last().map_or(0, |last| last + 1);

    let records = reader.load_archives(&archives)?;
    let found = records.iter().filter(|record| record.found).count();
    let done: HashSet<&RepoRef> = records.iter().map(|record| &record.repo).collect();

    info!(
        archives = archives.len(),
        next_sequence,
        gap_count = gaps.len(),
        gaps = ?gaps,
        "archive status"
    );
    info!(
        done_repos = done.len(),
        found_rows = found,
        not_found_rows = records.len() - found,
        "progress status"
    );

    match latest_run_manifest(&outdir.join("manifests"))? {
        Some(manifest) => {
            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                updated_at = %manifest.updated_at,
                attempted = manifest.tally.attempted,
                succeeded = manifest.tally.succeeded,
                remaining_repos = manifest.counts.remaining_repos,
                "loaded latest enrich run manifest"
            );
        }
        None => warn!("no enrich run manifest found"),
    }

    Ok(())
}

/// Sequence numbers below the highest archive that have no archive.
fn sequence_gaps(sorted_sequences: &[u64]) -> Vec<u64> {
    let mut gaps = Vec::new();
    let mut expected = 0u64;
    for &sequence in sorted_sequences {
        gaps.extend(expected..sequence);
        expected = sequence + 1;
    }
    gaps
}

fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<EnrichRunManifest>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let path = entry.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("enrich_run_") && name.ends_with(".json"))
            .unwrap_or(false);
        if is_run_manifest {
            paths.push(path);
        }
    }

    // Compact UTC timestamps sort lexicographically.
    paths.sort();
    let Some(latest) = paths.last() else {
        return Ok(None);
    };

    let raw = fs::read(latest).with_context(|| format!("failed to read {}", latest.display()))?;
    let manifest: EnrichRunManifest = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", latest.display()))?;
    Ok(Some(manifest))
}
