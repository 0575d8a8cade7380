//! Text renderings of record sets and comparison results.
//!
//! Nothing here writes to the console; callers print the returned strings.

use std::fmt::Write;
use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::baseline;
use crate::compare::{DiffEntry, Verdict};
use crate::record::DeviceRecord;

pub const TOOL_NAME: &str = "PCIe Diagnostic Tool";
pub const BUILD_DATE: &str = "2025-12-03";

const SHOW_RULE: usize = 79;
const COMPARE_RULE: usize = 82;
const BANNER_RULE: usize = 60;

const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy, Debug, Default)]
pub struct Style {
    pub color: bool,
}

impl Style {
    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_owned()
        }
    }
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to write dump row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush dump: {0}")]
    Flush(#[source] io::Error),
    #[error("dump is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

fn column_header() -> String {
    format!(
        "{:10}{:<6}{:<5}{:<5}{:<6}{:<5}{:<5}{:<5}{:<5}{:<4}{:<5}{:<5}{}",
        "Dev/Vend",
        "dom",
        "Bus",
        "Dev",
        "Func",
        "Max",
        "Neg",
        "Sup",
        "Cur",
        "PN",
        "Tar",
        "Rev",
        "PCI Device Type"
    )
}

/// One table row with the given identifier column.
fn row(id: &str, record: &DeviceRecord) -> String {
    let addr = &record.address;
    format!(
        "{:10}{:<6}{:<5}{:<5}{:<6}{:<5}{:<5}{:<5}{:<5}{:<4}{:<5}{:<5}{}",
        id,
        or_placeholder(&addr.domain, "??"),
        or_placeholder(&addr.bus, "??"),
        or_placeholder(&addr.device, "??"),
        or_placeholder(&addr.function, "?"),
        record.max_link_width,
        record.cur_link_width,
        record.max_link_speed,
        record.cur_link_speed,
        record.port_number,
        record.target_link_speed,
        record.revision,
        record.device_type,
    )
}

/// Device ID followed by vendor ID, as shown for live devices.
fn live_id(record: &DeviceRecord) -> String {
    match (&record.device_id, &record.vendor_id) {
        (Some(device), Some(vendor)) => format!("{device}{vendor}"),
        _ => "????????".to_owned(),
    }
}

/// Vendor ID followed by device ID, as shown for baseline entries.
fn baseline_id(record: &DeviceRecord) -> String {
    format!(
        "{}{}",
        record.vendor_id.as_deref().unwrap_or("????"),
        record.device_id.as_deref().unwrap_or("????")
    )
}

pub fn show_table<'a>(records: impl IntoIterator<Item = &'a DeviceRecord>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", column_header());
    let _ = writeln!(out, "{}", "-".repeat(SHOW_RULE));
    for record in records {
        let _ = writeln!(out, "{}", row(&live_id(record), record));
    }
    out
}

/// Serializes records as a baseline table.
pub fn dump_table<'a>(
    records: impl IntoIterator<Item = &'a DeviceRecord>,
) -> Result<String, DumpError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(baseline::COLUMNS)?;
    for record in records {
        writer.write_record(baseline::row(record))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| DumpError::Flush(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn banner() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(BANNER_RULE));
    let _ = writeln!(out, "{}", TOOL_NAME);
    let _ = writeln!(out, "{}", "-".repeat(BANNER_RULE));
    let _ = writeln!(out, "{:<13}: {}", "Version", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "{:<13}: {}", "Build Date", BUILD_DATE);
    let _ = writeln!(
        out,
        "{:<13}: {}",
        "Author",
        env!("CARGO_PKG_AUTHORS").replace(':', ", ")
    );
    let _ = writeln!(out, "{}", "=".repeat(BANNER_RULE));
    let _ = writeln!(out);
    out
}

fn diff_message(diff: &DiffEntry) -> String {
    match diff {
        DiffEntry::Missing { baseline } => {
            format!(" => addr: {} not in system", baseline.key())
        }
        DiffEntry::Mismatch {
            field,
            expected,
            actual,
            ..
        } => format!(
            " => field: [{field}] is mismatch, expected value: [{expected}], actual value: [{actual}]"
        ),
    }
}

/// PASS/FAIL report for a comparison, one line per difference.
pub fn compare_report(diffs: &[DiffEntry], style: &Style) -> String {
    let verdict = Verdict::from_diffs(diffs);

    let mut out = banner();
    let _ = writeln!(out, "[INFO] compare result: {}", verdict);
    if verdict == Verdict::Pass {
        return out;
    }

    let _ = writeln!(out, "{}", column_header());
    let _ = writeln!(out, "{}", "-".repeat(COMPARE_RULE));
    for diff in diffs {
        let baseline = diff.baseline();
        let _ = writeln!(
            out,
            "{}{}",
            style.paint(RED, &row(&baseline_id(baseline), baseline)),
            style.paint(BLUE, &diff_message(diff))
        );
    }
    out
}
