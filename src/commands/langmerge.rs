use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::{DropMode, LangmergeArgs};
use crate::table::{MetadataRow, write_header_only, write_rows};
use crate::util::ensure_output_available;

pub fn run(args: LangmergeArgs) -> Result<()> {
    ensure_output_available(&args.output)?;

    let mut rows = Vec::new();
    for path in &args.inputs {
        let table = read_language_table(path)?;
        info!(path = %path.display(), rows = table.len(), "loaded language table");
        rows.extend(table);
    }
    info!(full = rows.len(), "combined language tables");

    let rows = apply_drops(rows, &args.drops);

    if rows.is_empty() {
        write_header_only(&args.output, &["fork", "found", "lang", "repo"])?;
    } else {
        write_rows(&args.output, &rows)?;
    }
    info!(path = %args.output.display(), rows = rows.len(), "langmerge completed");

    Ok(())
}

fn apply_drops(mut rows: Vec<MetadataRow>, drops: &[DropMode]) -> Vec<MetadataRow> {
    if drops.contains(&DropMode::Empty) {
        rows.retain(|row| !row.lang.is_empty());
        info!(non_empty = rows.len(), "dropped rows without a language");
    }

    let rows = if drops.contains(&DropMode::Multi) {
        // Load order decides: earlier inputs win.
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter(|row| seen.insert(row.repo.clone()))
            .collect::<Vec<_>>()
    } else {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter(|row| seen.insert(row.clone()))
            .collect::<Vec<_>>()
    };
    info!(non_dupe = rows.len(), "dropped duplicate rows");

    rows
}

/// Reads either a metadata table (`repo`, `lang`, optional `fork` and
/// `found`) or a per-language byte table (`repo`, `lang`, `bytes`), which
/// is reduced to its largest language per repository.
fn read_language_table(path: &Path) -> Result<Vec<MetadataRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open language table {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();
    let column = |name: &str| headers.iter().position(|header| header == name);

    let Some(repo_column) = column("repo") else {
        bail!("language table {} has no repo column", path.display());
    };
    let Some(lang_column) = column("lang") else {
        bail!("language table {} has no lang column", path.display());
    };
    let fork_column = column("fork");
    let found_column = column("found");
    let bytes_column = column("bytes");

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("failed to read row {} of {}", index + 1, path.display()))?;
        let field = |column: Option<usize>| column.and_then(|column| record.get(column)).unwrap_or("");
        let context = || format!("invalid row {} of {}", index + 1, path.display());

        let fork = parse_flag(field(fork_column)).with_context(context)?;
        let found = parse_flag(field(found_column))
            .with_context(context)?
            .unwrap_or(true);
        let bytes = match bytes_column {
            Some(_) => field(bytes_column)
                .parse::<u64>()
                .with_context(context)?,
            None => 0,
        };

        rows.push((
            bytes,
            MetadataRow {
                fork,
                found,
                lang: field(Some(lang_column)).to_string(),
                repo: field(Some(repo_column)).to_string(),
            },
        ));
    }

    if bytes_column.is_some() {
        rows.sort_by(|(a_bytes, a), (b_bytes, b)| {
            a.repo.cmp(&b.repo).then_with(|| b_bytes.cmp(a_bytes))
        });
        let mut seen = HashSet::new();
        rows.retain(|(_, row)| seen.insert(row.repo.clone()));
    }

    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

fn parse_flag(value: &str) -> Result<Option<bool>> {
    match value.trim() {
        "" => Ok(None),
        "true" | "True" | "TRUE" | "1" => Ok(Some(true)),
        "false" | "False" | "FALSE" | "0" => Ok(Some(false)),
        other => bail!("unrecognized flag value: {other}"),
    }
}
