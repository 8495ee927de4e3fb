use std::io::{self, Write};

use serde::Serialize;

use crate::app::{BatchReport, ResetResult, StatusResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &BatchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_status(result: &StatusResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_reset(result: &ResetResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, _event: crate::app::ProgressEvent) {}
}

pub fn print_summary(report: &BatchReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!(
        "{cyan}KIRA-PC batch CID {} to {}{reset}",
        report.start_cid, report.end_cid
    );
    println!(
        "{green}rows written: {} (3D SDF {}, 2D SDF {}){reset}",
        report.rows_written, report.structures_3d, report.structures_2d
    );
    println!(
        "{yellow}no molecular data: {}, no structure: {}{reset}",
        report.no_property_data, report.structures_missing
    );
    match &report.table_path {
        Some(path) => println!("{green}table: {path}{reset}"),
        None => println!("{yellow}table: none (no rows){reset}"),
    }
    println!("{cyan}next start CID: {}{reset}", report.next_start_cid);
}
