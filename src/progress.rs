use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::domain::Cid;
use crate::error::KiraError;
use crate::store::Layout;

const LABEL: &str = "Start_CID";

/// File-backed marker holding the next CID to scan.
///
/// Layout is two lines: the `Start_CID` label and the integer. A missing
/// file means nothing has run yet and reads as CID 1.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: Utf8PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn read(&self) -> Result<Cid, KiraError> {
        let content = match fs::read_to_string(self.path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path, "no progress file, starting at CID 1");
                return Ok(Cid::FIRST);
            }
            Err(err) => {
                return Err(KiraError::Filesystem(format!("read {}: {err}", self.path)));
            }
        };
        self.parse(&content)
    }

    pub fn write(&self, next: Cid) -> Result<(), KiraError> {
        Layout::write_bytes_atomic(&self.path, format!("{LABEL}\n{next}\n").as_bytes())
    }

    fn parse(&self, content: &str) -> Result<Cid, KiraError> {
        let corrupt = |detail: String| KiraError::ProgressParse {
            path: self.path.to_string(),
            detail,
        };
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        match lines.next() {
            Some(LABEL) => {}
            Some(other) => return Err(corrupt(format!("expected `{LABEL}`, found `{other}`"))),
            None => return Err(corrupt("file is empty".to_string())),
        }
        let value = lines
            .next()
            .ok_or_else(|| corrupt("missing CID line".to_string()))?;
        value
            .parse::<Cid>()
            .map_err(|_| corrupt(format!("`{value}` is not a positive integer")))
    }
}
