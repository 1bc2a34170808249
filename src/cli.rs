use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubenav",
    version,
    about = "Browse namespaces, resources and live container logs in one terminal view."
)]
pub struct CliArgs {
    /// Start with a namespace already selected
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Lines of history to fetch when a log session starts
    #[arg(long)]
    pub tail_lines: Option<i64>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Append diagnostics to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
