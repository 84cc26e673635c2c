use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

#[derive(Parser, Debug)]
#[command(
    name = "langpop",
    version,
    about = "Repository metadata enrichment for language popularity signals"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query repository metadata in resumable, sequence-numbered chunks.
    Enrich(EnrichArgs),
    /// Fold an archive directory into one metadata table.
    Merge(MergeArgs),
    /// Combine several metadata tables into one.
    Langmerge(LangmergeArgs),
    /// Summarize the archives in an output directory.
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EnrichArgs {
    /// Count tables with `repo` and `count` columns.
    #[arg(long = "events", required = true, num_args = 1..)]
    pub events: Vec<PathBuf>,

    /// Table with a `repo` column listing repositories resolved elsewhere.
    #[arg(long)]
    pub dones: Option<PathBuf>,

    #[arg(long)]
    pub outdir: PathBuf,

    #[arg(long, default_value_t = 500)]
    pub batch_size: usize,

    #[arg(long, default_value = DEFAULT_GRAPHQL_ENDPOINT)]
    pub endpoint: String,

    /// Environment variable holding the bearer token.
    #[arg(long, default_value = "GITHUB_TOKEN")]
    pub token_env: String,

    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Stop after this many chunks have been attempted.
    #[arg(long)]
    pub max_chunks: Option<usize>,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[arg(long)]
    pub archive_dir: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub contradictions_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DropMode {
    /// Drop rows without a language.
    Empty,
    /// Keep only the first row per repository in load order.
    Multi,
}

#[derive(Args, Debug, Clone)]
pub struct LangmergeArgs {
    #[arg(long = "inputs", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long = "drops", value_enum, num_args = 1..)]
    pub drops: Vec<DropMode>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub outdir: PathBuf,
}
