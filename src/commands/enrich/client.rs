use std::error::Error as _;

use super::*;

#[derive(Debug, Error)]
pub(super) enum QueryError {
    /// Connection, timeout, protocol, or body-decoding failure. The chunk
    /// is skipped and its repositories stay outstanding for a later run.
    #[error("transport failure: {0}")]
    Transient(String),
    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(String),
}

pub(super) trait BatchTransport {
    fn execute(&self, query: &str) -> Result<Value, QueryError>;
}

pub(super) struct GraphqlClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl GraphqlClient {
    pub(super) fn new(endpoint: &str, token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("langpop/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
        })
    }
}

impl BatchTransport for GraphqlClient {
    fn execute(&self, query: &str) -> Result<Value, QueryError> {
        let body = serde_json::json!({ "query": query });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().map_err(classify_transport_error)
    }
}

fn classify_transport_error(err: reqwest::Error) -> QueryError {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(&format!(" <- {cause}"));
        source = cause.source();
    }

    if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() || err.is_decode()
    {
        QueryError::Transient(detail)
    } else {
        QueryError::Request(detail)
    }
}

#[derive(Debug)]
pub(super) enum ChunkOutcome {
    Archived {
        path: PathBuf,
        sha256: Option<String>,
    },
    TransientFailure {
        message: String,
    },
    ArchiveConflict {
        path: PathBuf,
    },
    Failed {
        message: String,
    },
}

impl ChunkOutcome {
    pub(super) fn status(&self) -> &'static str {
        match self {
            Self::Archived { .. } => "archived",
            Self::TransientFailure { .. } => "transient-failure",
            Self::ArchiveConflict { .. } => "archive-conflict",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Error)]
pub(super) enum ArchiveWriteError {
    #[error("archive already exists: {}", .0.display())]
    Exists(PathBuf),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Queries one chunk and archives the raw response under the chunk's
/// sequence number. Every failure is classified here; nothing escapes.
pub(super) fn process_chunk(
    transport: &dyn BatchTransport,
    outdir: &Path,
    chunk: &Chunk<'_>,
) -> ChunkOutcome {
    let path = archive_path(outdir, chunk.sequence);
    if path.exists() {
        return ChunkOutcome::ArchiveConflict { path };
    }

    let query = build_query(chunk);
    let response = match transport.execute(&query) {
        Ok(response) => response,
        Err(QueryError::Transient(message)) => return ChunkOutcome::TransientFailure { message },
        Err(err) => {
            return ChunkOutcome::Failed {
                message: err.to_string(),
            };
        }
    };

    if response_mentions_rate_limit(&response) {
        warn!(sequence = chunk.sequence, "response reports a rate limit; archiving as received");
    }

    match write_archive(&path, &response) {
        Ok(()) => {}
        Err(ArchiveWriteError::Exists(path)) => return ChunkOutcome::ArchiveConflict { path },
        Err(ArchiveWriteError::Other(err)) => {
            return ChunkOutcome::Failed {
                message: format!("{err:#}"),
            };
        }
    }

    let sha256 = match sha256_file(&path) {
        Ok(hash) => Some(hash),
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "failed to hash archive");
            None
        }
    };

    ChunkOutcome::Archived { path, sha256 }
}

/// Writes `response` to a new file with its keys in received order; an
/// existing file is never replaced.
pub(super) fn write_archive(path: &Path, response: &Value) -> Result<(), ArchiveWriteError> {
    let data = serde_json::to_vec_pretty(response)
        .with_context(|| format!("failed to serialize archive {}", path.display()))?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(ArchiveWriteError::Exists(path.to_path_buf()));
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("failed to create archive {}", path.display()))
                .into());
        }
    };

    let written = file
        .write_all(&data)
        .and_then(|()| file.write_all(b"\n"))
        .and_then(|()| file.sync_all());
    if let Err(err) = written {
        drop(file);
        discard_partial_archive(path);
        return Err(anyhow::Error::new(err)
            .context(format!("failed to write archive {}", path.display()))
            .into());
    }

    Ok(())
}

/// Removes a half-written archive, which would otherwise read as corrupt.
/// Returns whether the file is gone.
pub(super) fn discard_partial_archive(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to remove partial archive; it will read as corrupt"
            );
            false
        }
    }
}

fn response_mentions_rate_limit(response: &Value) -> bool {
    response
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors.iter().any(|error| {
                error.get("type").and_then(Value::as_str) == Some("RATE_LIMITED")
                    || error
                        .get("message")
                        .and_then(Value::as_str)
                        .map(|message| message.to_lowercase().contains("rate limit"))
                        .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}
