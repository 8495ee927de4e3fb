use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::Cid;
use crate::error::KiraError;

const HEADER: &str = "Molecules Not Found\n===================\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotFoundReason {
    /// No descriptor data; the CID gets no table row.
    NoPropertyData,
    /// Descriptors exist but neither a 3D nor a 2D SDF could be fetched.
    NoStructure,
}

impl NotFoundReason {
    fn as_str(self) -> &'static str {
        match self {
            NotFoundReason::NoPropertyData => "No Molecular Data Found",
            NotFoundReason::NoStructure => "No Molecule Found",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "No Molecular Data Found" => Some(NotFoundReason::NoPropertyData),
            "No Molecule Found" => Some(NotFoundReason::NoStructure),
            _ => None,
        }
    }
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotFoundEntry {
    pub cid: Cid,
    pub reason: NotFoundReason,
}

#[derive(Debug, Clone)]
pub struct NotFoundLog {
    path: Utf8PathBuf,
}

impl NotFoundLog {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Truncates the log down to its header.
    pub fn reset(&self) -> Result<(), KiraError> {
        fs::write(self.path.as_std_path(), HEADER)
            .map_err(|err| KiraError::Filesystem(format!("reset {}: {err}", self.path)))
    }

    pub fn append(&self, cid: Cid, reason: NotFoundReason) -> Result<(), KiraError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("open {}: {err}", self.path)))?;
        writeln!(file, "CID {cid} - {reason}")
            .map_err(|err| KiraError::Filesystem(format!("append {}: {err}", self.path)))
    }

    /// Entries from the last run. Lines that do not look like entries
    /// (header, hand edits) are skipped.
    pub fn entries(&self) -> Result<Vec<NotFoundEntry>, KiraError> {
        let content = match fs::read_to_string(self.path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(KiraError::Filesystem(format!("read {}: {err}", self.path))),
        };
        Ok(content.lines().filter_map(parse_entry).collect())
    }
}

fn parse_entry(line: &str) -> Option<NotFoundEntry> {
    let rest = line.trim().strip_prefix("CID ")?;
    let (cid, reason) = rest.split_once(" - ")?;
    Some(NotFoundEntry {
        cid: cid.parse().ok()?,
        reason: NotFoundReason::parse(reason.trim())?,
    })
}
