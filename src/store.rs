use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::domain::{Cid, StructureKind};
use crate::error::KiraError;

pub const NOT_FOUND_LOG_FILE: &str = "No_Molecule_Found.log";
pub const PROGRESS_FILE: &str = "Download_Progress.txt";
pub const STRUCTURES_3D_DIR: &str = "3dSDF";
pub const STRUCTURES_2D_DIR: &str = "2dSDF";

/// Every on-disk artifact a batch touches. Built once and handed to the
/// runner so tests can point it at a scratch directory.
#[derive(Debug, Clone)]
pub struct Layout {
    not_found_log: Utf8PathBuf,
    progress: Utf8PathBuf,
    structures_3d: Utf8PathBuf,
    structures_2d: Utf8PathBuf,
    table_dir: Utf8PathBuf,
}

impl Layout {
    /// Default layout rooted at `root`, matching the historical file names.
    pub fn under(root: &Utf8Path) -> Self {
        Self {
            not_found_log: root.join(NOT_FOUND_LOG_FILE),
            progress: root.join(PROGRESS_FILE),
            structures_3d: root.join(STRUCTURES_3D_DIR),
            structures_2d: root.join(STRUCTURES_2D_DIR),
            table_dir: root.to_path_buf(),
        }
    }

    pub fn new_with_paths(
        not_found_log: Utf8PathBuf,
        progress: Utf8PathBuf,
        structures_3d: Utf8PathBuf,
        structures_2d: Utf8PathBuf,
        table_dir: Utf8PathBuf,
    ) -> Self {
        Self {
            not_found_log,
            progress,
            structures_3d,
            structures_2d,
            table_dir,
        }
    }

    pub fn not_found_log(&self) -> &Utf8Path {
        &self.not_found_log
    }

    pub fn progress(&self) -> &Utf8Path {
        &self.progress
    }

    pub fn structures_dir(&self, kind: StructureKind) -> &Utf8Path {
        match kind {
            StructureKind::ThreeD => &self.structures_3d,
            StructureKind::TwoD => &self.structures_2d,
        }
    }

    pub fn table_dir(&self) -> &Utf8Path {
        &self.table_dir
    }

    pub fn structure_path(&self, cid: Cid, kind: StructureKind) -> Utf8PathBuf {
        self.structures_dir(kind).join(format!("{cid}.sdf"))
    }

    pub fn table_path(&self, start: Cid, end: Cid) -> Utf8PathBuf {
        self.table_dir.join(format!("Molecules_{start}_to_{end}.csv"))
    }

    pub fn ensure_dirs(&self) -> Result<(), KiraError> {
        for dir in [&self.structures_3d, &self.structures_2d, &self.table_dir] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("create {dir}: {err}")))?;
        }
        for file in [&self.not_found_log, &self.progress] {
            if let Some(parent) = file.parent().filter(|p| !p.as_str().is_empty()) {
                fs::create_dir_all(parent.as_std_path())
                    .map_err(|err| KiraError::Filesystem(format!("create {parent}: {err}")))?;
            }
        }
        for dir in [&self.structures_3d, &self.structures_2d] {
            remove_stale_temp_files(dir)?;
        }
        Ok(())
    }

    /// Writes through a sibling temp file so a crash never leaves a
    /// half-written file under the final name.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), KiraError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        }
        let tmp_path = Utf8PathBuf::from(format!("{path}.tmp"));
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| KiraError::Filesystem(format!("write {tmp_path}: {err}")))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("rename to {path}: {err}")))?;
        Ok(())
    }
}

/// Drops `*.sdf.tmp` files left behind by an interrupted write.
fn remove_stale_temp_files(dir: &Utf8Path) -> Result<(), KiraError> {
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("read {dir}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| KiraError::Filesystem(format!("read {dir}: {err}")))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && entry.file_name().to_string_lossy().ends_with(".tmp") {
            let path = entry.path();
            fs::remove_file(&path).map_err(|err| {
                KiraError::Filesystem(format!("remove {}: {err}", path.display()))
            })?;
            debug!(path = %path.display(), "removed stale temp file");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = Layout::under(Utf8Path::new("/data/pubchem"));
        let cid = Cid::new(2244).unwrap();

        assert!(
            layout
                .structure_path(cid, StructureKind::ThreeD)
                .ends_with("3dSDF/2244.sdf")
        );
        assert!(
            layout
                .structure_path(cid, StructureKind::TwoD)
                .ends_with("2dSDF/2244.sdf")
        );
        assert_eq!(
            layout.table_path(Cid::new(1).unwrap(), Cid::new(10000).unwrap()),
            Utf8PathBuf::from("/data/pubchem/Molecules_1_to_10000.csv")
        );
        assert!(layout.progress().ends_with("Download_Progress.txt"));
        assert!(layout.not_found_log().ends_with("No_Molecule_Found.log"));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("nested").join("file.sdf");

        Layout::write_bytes_atomic(&path, b"first").unwrap();
        Layout::write_bytes_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(path.as_std_path()).unwrap(), b"second");
        assert!(!root.join("nested").join("file.sdf.tmp").exists());
    }

    #[test]
    fn ensure_dirs_sweeps_interrupted_writes() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let layout = Layout::under(&root);
        layout.ensure_dirs().unwrap();

        let stale = root.join("3dSDF").join("12.sdf.tmp");
        let kept = root.join("2dSDF").join("12.sdf");
        fs::write(stale.as_std_path(), b"partial").unwrap();
        fs::write(kept.as_std_path(), b"complete").unwrap();

        layout.ensure_dirs().unwrap();

        assert!(!stale.exists());
        assert_eq!(fs::read(kept.as_std_path()).unwrap(), b"complete");
    }
}
