use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::logging::LogFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionBackend {
    /// Table state lives in the workspace database and survives restarts.
    Sqlite,
    /// Table state lives in process memory only.
    Memory,
}

/// Command line configuration for the sidecar.
#[derive(Parser, Debug, Clone)]
#[command(name = "filtertabled", about = "Filterable table engine sidecar (JSON lines on stdio)")]
pub struct Config {
    /// Workspace directory to open at startup (same as `workspace.select`).
    #[arg(long, env = "FILTERTABLED_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Tracing filter directive, e.g. `info` or `filtertabled=debug`.
    #[arg(long, default_value = "info", env = "FILTERTABLED_LOG")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, env = "FILTERTABLED_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Rows per page for users who have not picked a page size yet.
    #[arg(long, default_value_t = 20, env = "FILTERTABLED_PER_PAGE",
          value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub default_per_page: u32,

    /// Where per-user table state is kept.
    #[arg(long, value_enum, default_value_t = SessionBackend::Sqlite, env = "FILTERTABLED_SESSIONS")]
    pub session_store: SessionBackend,
}
