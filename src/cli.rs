use clap::Parser;
use std::path::PathBuf;

/// A terminal journal for thoughts, moods and tags
#[derive(Parser, Debug, Default)]
#[clap(name = "mood-journal", about = "A terminal journal for thoughts, moods and tags")]
#[clap(author, version, long_about = None)]
pub struct CliArgs {
    /// Keep everything in memory for this run; any email signs in
    #[clap(long, conflicts_with_all = &["project_id", "api_key"])]
    pub offline: bool,

    /// Firebase project holding the `journals` collection
    #[clap(long, value_name = "ID")]
    pub project_id: Option<String>,

    /// Firebase web API key
    #[clap(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Seconds between refreshes of the entry list
    #[clap(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// File receiving diagnostic logs
    #[clap(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log at debug level
    #[clap(short = 'v', long)]
    pub verbose: bool,
}
