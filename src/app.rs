use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::domain::{Cid, CompoundRecord, StructureKind, StructureOutcome};
use crate::error::KiraError;
use crate::not_found::{NotFoundEntry, NotFoundLog, NotFoundReason};
use crate::progress::ProgressStore;
use crate::pubchem::PubchemClient;
use crate::store::Layout;
use crate::table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounters {
    pub scanned: u64,
    pub rows: u64,
    pub no_property_data: u64,
    pub structures_3d: u64,
    pub structures_2d: u64,
    pub structures_missing: u64,
}

impl BatchCounters {
    fn record_structure(&mut self, outcome: StructureOutcome) {
        match outcome {
            StructureOutcome::Saved3D => self.structures_3d += 1,
            StructureOutcome::Saved2D => self.structures_2d += 1,
            StructureOutcome::NotFound => self.structures_missing += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub start_cid: Cid,
    pub end_cid: Cid,
    pub scanned: u64,
    pub rows_written: u64,
    pub no_property_data: u64,
    pub structures_3d: u64,
    pub structures_2d: u64,
    pub structures_missing: u64,
    pub next_start_cid: Cid,
    pub table_path: Option<String>,
    pub not_found_log: String,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub next_start_cid: Cid,
    pub progress_path: String,
    pub not_found_log: String,
    pub not_found: Vec<NotFoundEntry>,
    pub structures_3d_dir: String,
    pub structures_2d_dir: String,
    pub table_dir: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResult {
    pub previous_start_cid: Option<Cid>,
    pub next_start_cid: Cid,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub processed: u64,
    pub total: u64,
    pub counters: BatchCounters,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: PubchemClient> {
    layout: Layout,
    client: C,
    progress: ProgressStore,
    not_found: NotFoundLog,
}

impl<C: PubchemClient> App<C> {
    pub fn new(layout: Layout, client: C) -> Self {
        let progress = ProgressStore::new(layout.progress());
        let not_found = NotFoundLog::new(layout.not_found_log());
        Self {
            layout,
            client,
            progress,
            not_found,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs one batch starting at the configured override, or at the
    /// persisted marker when there is none.
    pub fn run(
        &self,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<BatchReport, KiraError> {
        let start = match config.start_cid {
            Some(cid) => {
                info!(start = %cid, "using start override");
                cid
            }
            None => self.progress.read()?,
        };
        self.run_batch(start, config.batch_size, sink)
    }

    /// Descriptors for `cid`, or `None` when PubChem has none to give.
    pub fn fetch_properties(&self, cid: Cid) -> Option<CompoundRecord> {
        match self.client.fetch_properties(cid) {
            Ok(record) => Some(record),
            Err(reason) => {
                debug!(%cid, %reason, "property data unavailable");
                None
            }
        }
    }

    /// Saves the 3D SDF, or the 2D SDF when 3D is unavailable. When neither
    /// exists the CID is logged as not found. Only filesystem failures are
    /// errors.
    pub fn download_structure(&self, cid: Cid) -> Result<StructureOutcome, KiraError> {
        for (kind, outcome) in [
            (StructureKind::ThreeD, StructureOutcome::Saved3D),
            (StructureKind::TwoD, StructureOutcome::Saved2D),
        ] {
            match self.client.fetch_structure(cid, kind) {
                Ok(bytes) => {
                    let path = self.layout.structure_path(cid, kind);
                    Layout::write_bytes_atomic(&path, &bytes)?;
                    info!(%cid, %kind, "downloaded SDF");
                    return Ok(outcome);
                }
                Err(reason) => debug!(%cid, %kind, %reason, "SDF unavailable"),
            }
        }

        self.not_found.append(cid, NotFoundReason::NoStructure)?;
        info!(%cid, "no molecule found");
        Ok(StructureOutcome::NotFound)
    }

    /// Scans `count` consecutive CIDs from `start`, writes the batch table and
    /// advances the progress marker to `start + count`. Any error aborts the
    /// run before the marker moves, so the next run repeats the whole batch.
    pub fn run_batch(
        &self,
        start: Cid,
        count: u64,
        sink: &dyn ProgressSink,
    ) -> Result<BatchReport, KiraError> {
        if count == 0 {
            return Err(KiraError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        let end = start.offset(count - 1)?;
        let next = start.offset(count)?;
        let started_at = Utc::now();
        let clock = Instant::now();

        self.layout.ensure_dirs()?;
        self.not_found.reset()?;
        info!(%start, %end, "starting batch");

        let mut rows = Vec::new();
        let mut counters = BatchCounters::default();
        for offset in 0..count {
            let cid = start.offset(offset)?;
            debug!(%cid, "fetching molecular properties");

            let message = match self.fetch_properties(cid) {
                Some(record) => {
                    rows.push(record);
                    counters.rows += 1;
                    let outcome = self.download_structure(cid)?;
                    counters.record_structure(outcome);
                    match outcome {
                        StructureOutcome::Saved3D => format!("cid={cid}; row; 3D SDF"),
                        StructureOutcome::Saved2D => format!("cid={cid}; row; 2D SDF"),
                        StructureOutcome::NotFound => format!("cid={cid}; row; no SDF"),
                    }
                }
                None => {
                    self.not_found.append(cid, NotFoundReason::NoPropertyData)?;
                    counters.no_property_data += 1;
                    format!("cid={cid}; no molecular data")
                }
            };
            counters.scanned += 1;

            sink.event(ProgressEvent {
                message,
                processed: counters.scanned,
                total: count,
                counters,
            });
        }

        let table_path = if rows.is_empty() {
            info!(%start, %end, "no molecular data in range, skipping table");
            None
        } else {
            let path = self.layout.table_path(start, end);
            table::write_table(&path, &rows)?;
            info!(%start, %end, rows = rows.len(), path = %path, "molecular data saved");
            Some(path.to_string())
        };

        self.progress.write(next)?;
        info!(next = %next, elapsed = ?clock.elapsed(), "progress updated");

        sink.event(ProgressEvent {
            message: format!("batch done; next start CID {next}"),
            processed: counters.scanned,
            total: count,
            counters,
        });

        Ok(BatchReport {
            start_cid: start,
            end_cid: end,
            scanned: counters.scanned,
            rows_written: counters.rows,
            no_property_data: counters.no_property_data,
            structures_3d: counters.structures_3d,
            structures_2d: counters.structures_2d,
            structures_missing: counters.structures_missing,
            next_start_cid: next,
            table_path,
            not_found_log: self.not_found.path().to_string(),
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn status(&self) -> Result<StatusResult, KiraError> {
        Ok(StatusResult {
            next_start_cid: self.progress.read()?,
            progress_path: self.progress.path().to_string(),
            not_found_log: self.not_found.path().to_string(),
            not_found: self.not_found.entries()?,
            structures_3d_dir: self.layout.structures_dir(StructureKind::ThreeD).to_string(),
            structures_2d_dir: self.layout.structures_dir(StructureKind::TwoD).to_string(),
            table_dir: self.layout.table_dir().to_string(),
        })
    }

    /// Overwrites the progress marker. A corrupt marker is replaced rather
    /// than reported, since this is how it gets repaired.
    pub fn reset(&self, to: Cid) -> Result<ResetResult, KiraError> {
        let previous_start_cid = self.progress.read().ok();
        self.progress.write(to)?;
        info!(next = %to, "progress reset");
        Ok(ResetResult {
            previous_start_cid,
            next_start_cid: to,
        })
    }
}
