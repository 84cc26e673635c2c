use std::collections::{BTreeMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::archive::{ArchiveReader, archive_path};
use crate::cli::EnrichArgs;
use crate::model::{
    ChunkEntry, EnrichCounts, EnrichPaths, EnrichRunManifest, RepoRef, RunTally, WorkItem,
};
use crate::table::{CountRow, read_count_rows, read_repo_set};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

mod client;
mod planner;
mod query;
mod run;
mod work_queue;

pub use run::run;

use client::*;
use planner::*;
use query::*;
use work_queue::*;
