use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid compound id: {0}")]
    #[diagnostic(help("CIDs are positive integers, e.g. 2244"))]
    InvalidCid(String),

    #[error("missing config file {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("PubChem client setup failed: {0}")]
    PubchemHttp(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("progress file {path} is corrupt: {detail}")]
    #[diagnostic(help("fix the file by hand or run `kira-pc reset --to <cid>`"))]
    ProgressParse { path: String, detail: String },

    #[error("failed to write table: {0}")]
    Table(String),
}
