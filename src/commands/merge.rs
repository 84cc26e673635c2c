use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::archive::ArchiveReader;
use crate::cli::MergeArgs;
use crate::dedupe::{Resolution, resolve};
use crate::model::MetadataRecord;
use crate::table::write_metadata_table;
use crate::util::ensure_output_available;

pub fn run(args: MergeArgs) -> Result<()> {
    let contradictions_path = args
        .contradictions_path
        .clone()
        .unwrap_or_else(|| default_contradictions_path(&args.output));

    ensure_output_available(&args.output)?;
    ensure_output_available(&contradictions_path)?;

    info!(archive_dir = %args.archive_dir.display(), "starting merge");

    let reader = ArchiveReader::new()?;
    let archives = reader.list_archives(&args.archive_dir)?;
    let records = reader.load_archives(&archives)?;
    info!(archives = archives.len(), records = records.len(), "loaded archive records");

    let resolution = resolve(records);

    if resolution.contradictions.is_empty() {
        info!("no contradictions found");
    } else {
        warn!(
            repos = resolution.contradicted_repos(),
            rows = resolution.contradictions.len(),
            "contradictions found; keeping the first-seen row per repository"
        );
        print_contradictions(&resolution.contradictions)?;
    }

    write_metadata_table(&contradictions_path, &resolution.contradictions)?;
    info!(path = %contradictions_path.display(), "wrote contradiction report");

    write_metadata_table(&args.output, &resolution.resolved)?;
    log_summary(&args.output, &resolution);

    Ok(())
}

/// `<parent>/<stem>_contradictions.csv` next to the resolved table.
fn default_contradictions_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("langs");
    output.with_file_name(format!("{stem}_contradictions.csv"))
}

fn print_contradictions(rows: &[MetadataRecord]) -> Result<()> {
    let repo_width = rows
        .iter()
        .map(|row| row.repo.as_str().len())
        .max()
        .unwrap_or(0)
        .max("repo".len());
    let lang_width = rows
        .iter()
        .map(|row| row.language.len())
        .max()
        .unwrap_or(0)
        .max("lang".len());

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Contradictions")?;
    writeln!(
        output,
        "{:<repo_width$}  {:<lang_width$}  {:<5}  {:<5}  archive",
        "repo", "lang", "found", "fork"
    )?;
    for row in rows {
        let fork = row
            .fork
            .map(|value| value.to_string())
            .unwrap_or_default();
        writeln!(
            output,
            "{:<repo_width$}  {:<lang_width$}  {:<5}  {:<5}  {}",
            row.repo.as_str(),
            row.language,
            row.found,
            fork,
            row.source_archive.display()
        )?;
    }
    output.flush().context("failed to flush contradiction table")?;
    Ok(())
}

fn log_summary(output: &Path, resolution: &Resolution) {
    let found = resolution.resolved.iter().filter(|row| row.found).count();
    info!(
        path = %output.display(),
        distinct_rows = resolution.distinct_rows,
        repos = resolution.resolved.len(),
        found,
        not_found = resolution.resolved.len() - found,
        "merge completed"
    );
}
