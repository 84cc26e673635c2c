use super::*;

/// Per-run accumulation, threaded through the chunk loop by value.
#[derive(Debug, Default)]
pub(super) struct RunReport {
    pub(super) tally: RunTally,
    pub(super) chunks: Vec<ChunkEntry>,
}

impl RunReport {
    pub(super) fn record(mut self, chunk: &Chunk<'_>, outcome: ChunkOutcome) -> Self {
        self.tally.attempted += 1;
        let mut entry = ChunkEntry {
            sequence: chunk.sequence,
            repo_count: chunk.items.len(),
            status: outcome.status().to_string(),
            archive_path: None,
            archive_sha256: None,
            error: None,
        };

        match outcome {
            ChunkOutcome::Archived { path, sha256 } => {
                self.tally.succeeded += 1;
                entry.archive_path = Some(path.display().to_string());
                entry.archive_sha256 = sha256;
            }
            ChunkOutcome::TransientFailure { message } => {
                self.tally.transient_errors += 1;
                entry.error = Some(message);
            }
            ChunkOutcome::ArchiveConflict { path } => {
                self.tally.archive_conflicts += 1;
                entry.error = Some(format!("archive already exists: {}", path.display()));
                entry.archive_path = Some(path.display().to_string());
            }
            ChunkOutcome::Failed { message } => {
                self.tally.other_errors += 1;
                entry.error = Some(message);
            }
        }

        self.chunks.push(entry);
        self
    }
}

pub(super) fn run_chunks<'a>(
    transport: &dyn BatchTransport,
    outdir: &Path,
    chunks: impl Iterator<Item = Chunk<'a>>,
) -> RunReport {
    chunks.fold(RunReport::default(), |report, chunk| {
        info!(
            sequence = chunk.sequence,
            repos = chunk.items.len(),
            queried = query_repo_count(&chunk),
            "querying chunk"
        );
        let outcome = process_chunk(transport, outdir, &chunk);
        log_outcome(&chunk, &outcome);
        report.record(&chunk, outcome)
    })
}

fn log_outcome(chunk: &Chunk<'_>, outcome: &ChunkOutcome) {
    match outcome {
        ChunkOutcome::Archived { path, .. } => {
            info!(sequence = chunk.sequence, path = %path.display(), "wrote archive");
        }
        ChunkOutcome::TransientFailure { message } => {
            warn!(
                sequence = chunk.sequence,
                error = %message,
                "transport failure, chunk skipped"
            );
        }
        ChunkOutcome::ArchiveConflict { path } => {
            error!(
                sequence = chunk.sequence,
                path = %path.display(),
                "archive already exists, chunk skipped"
            );
        }
        ChunkOutcome::Failed { message } => {
            error!(sequence = chunk.sequence, error = %message, "chunk failed");
        }
    }
}

fn resolve_token(token_env: &str) -> Result<String> {
    check_token(token_env, std::env::var(token_env).ok())
}

pub(super) fn check_token(token_env: &str, value: Option<String>) -> Result<String> {
    let Some(token) = value else {
        bail!("environment variable {token_env} is not set");
    };
    if token.trim().is_empty() {
        bail!("environment variable {token_env} is empty");
    }
    Ok(token)
}

pub fn run(args: EnrichArgs) -> Result<()> {
    run_with(&args, || {
        let token = resolve_token(&args.token_env)?;
        GraphqlClient::new(
            &args.endpoint,
            token,
            Duration::from_secs(args.timeout_secs),
        )
    })
}

/// Plans and runs the chunks. `connect` is skipped on a dry run and is
/// called before the output directory is created.
pub(super) fn run_with<T: BatchTransport>(
    args: &EnrichArgs,
    connect: impl FnOnce() -> Result<T>,
) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("enrich-{}", utc_compact_string(started_ts));
    let batch_size = args.batch_size.max(1);
    let outdir = args.outdir.clone();

    if outdir.exists() && !outdir.is_dir() {
        bail!("output directory is not a directory: {}", outdir.display());
    }

    let run_manifest_path = args.run_manifest_path.clone().unwrap_or_else(|| {
        outdir.join("manifests").join(format!(
            "enrich_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    info!(outdir = %outdir.display(), run_id = %run_id, batch_size, "starting enrich");

    let rows = load_count_tables(&args.events)?;
    let input_rows = rows.len();
    let queue = build_work_queue(rows);
    let queued_repos = queue.len();
    info!(input_rows, queued_repos, "built work queue");

    let reader = ArchiveReader::new()?;
    let mut done = reader.done_set(&outdir)?;
    info!(archived_repos = done.len(), "scanned existing archives");
    if let Some(dones_path) = &args.dones {
        let prior = read_repo_set(dones_path)?;
        info!(path = %dones_path.display(), repos = prior.len(), "loaded prior done list");
        done.extend(prior);
    }

    let first_sequence = reader.next_sequence(&outdir)?;
    let remaining = remove_done(queue, &done);
    let mut planned_chunks = planned_chunk_count(remaining.len(), batch_size);
    if let Some(max_chunks) = args.max_chunks {
        planned_chunks = planned_chunks.min(max_chunks);
    }

    info!(
        done_repos = queued_repos - remaining.len(),
        remaining_repos = remaining.len(),
        first_sequence,
        planned_chunks,
        "planned chunks"
    );

    if args.dry_run {
        info!("enrich dry-run complete");
        return Ok(());
    }

    let transport = connect()?;
    ensure_directory(&outdir)?;

    let chunks = plan_chunks(&remaining, batch_size, first_sequence).take(planned_chunks);
    let report = run_chunks(&transport, &outdir, chunks);
    let tally = report.tally.clone();

    let mut warnings = Vec::new();
    if tally.transient_errors > 0 {
        warnings.push(format!(
            "{} chunk(s) lost to transport failures; their repositories remain outstanding",
            tally.transient_errors
        ));
    }
    if tally.archive_conflicts > 0 {
        warnings.push(format!(
            "{} chunk(s) collided with existing archives",
            tally.archive_conflicts
        ));
    }

    let manifest = EnrichRunManifest {
        manifest_version: 1,
        run_id,
        status: if tally.errors() == 0 {
            "completed"
        } else {
            "completed-with-errors"
        }
        .to_string(),
        started_at,
        updated_at: now_utc_string(),
        endpoint: args.endpoint.clone(),
        batch_size,
        first_sequence,
        paths: EnrichPaths {
            events: args
                .events
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            dones: args.dones.as_ref().map(|path| path.display().to_string()),
            outdir: outdir.display().to_string(),
            run_manifest_path: run_manifest_path.display().to_string(),
        },
        counts: EnrichCounts {
            input_rows,
            queued_repos,
            done_repos: queued_repos - remaining.len(),
            remaining_repos: remaining.len(),
            planned_chunks,
        },
        tally: tally.clone(),
        chunks: report.chunks,
        warnings,
    };

    write_json_pretty(&run_manifest_path, &manifest)?;
    info!(path = %run_manifest_path.display(), "wrote enrich run manifest");

    info!(
        attempted = tally.attempted,
        succeeded = tally.succeeded,
        transient_errors = tally.transient_errors,
        archive_conflicts = tally.archive_conflicts,
        other_errors = tally.other_errors,
        "enrich completed, errors: {}/{}",
        tally.errors(),
        tally.attempted
    );

    Ok(())
}
