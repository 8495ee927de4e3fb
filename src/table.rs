use camino::Utf8Path;
use serde::Serialize;

use crate::domain::{CompoundRecord, Decimal};
use crate::error::KiraError;

/// One CSV row. Field order is the column order; `None` serialises as an
/// empty field.
#[derive(Debug, Serialize)]
struct TableRow<'a> {
    #[serde(rename = "CID")]
    cid: u64,
    #[serde(rename = "MW")]
    molecular_weight: Option<&'a str>,
    #[serde(rename = "nHA")]
    hbond_acceptors: Option<u32>,
    #[serde(rename = "nHD")]
    hbond_donors: Option<u32>,
    #[serde(rename = "LogP")]
    xlogp: Option<&'a str>,
    #[serde(rename = "TPSA")]
    tpsa: Option<&'a str>,
}

impl<'a> From<&'a CompoundRecord> for TableRow<'a> {
    fn from(record: &'a CompoundRecord) -> Self {
        Self {
            cid: record.cid.get(),
            molecular_weight: record.molecular_weight.as_ref().map(Decimal::as_str),
            hbond_acceptors: record.hbond_acceptors,
            hbond_donors: record.hbond_donors,
            xlogp: record.xlogp.as_ref().map(Decimal::as_str),
            tpsa: record.tpsa.as_ref().map(Decimal::as_str),
        }
    }
}

pub fn render(records: &[CompoundRecord]) -> Result<Vec<u8>, KiraError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(TableRow::from(record))
            .map_err(|err| KiraError::Table(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| KiraError::Table(err.to_string()))
}

/// Renders the batch table and writes it in one step, so a failure never
/// leaves a truncated CSV behind.
pub fn write_table(path: &Utf8Path, records: &[CompoundRecord]) -> Result<(), KiraError> {
    let bytes = render(records)?;
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let temp = tempfile::Builder::new()
        .prefix("kira-pc-table")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    std::fs::write(temp.path(), &bytes)
        .map_err(|err| KiraError::Filesystem(format!("write {path}: {err}")))?;
    temp.persist(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("persist {path}: {err}")))?;
    Ok(())
}
