use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::{DeviceAddress, DeviceRecord, RecordSet};

/// Baseline table columns, in dump order.
pub const COLUMNS: [&str; 14] = [
    "dom",
    "bus",
    "dev",
    "func",
    "vendor",
    "device",
    "max_width",
    "cur_width",
    "max_speed",
    "cur_speed",
    "pn",
    "tar_speed",
    "type",
    "rev",
];

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("failed to open baseline {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed baseline: {0}")]
    Csv(#[from] csv::Error),
}

fn zero_fill(value: &str, width: usize) -> String {
    format!("{:0>width$}", value, width = width)
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Cells of one row, looked up by column name. Missing columns and short rows read as empty.
struct Row<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn get(&self, column: &str) -> &str {
        self.columns
            .get(column)
            .and_then(|&idx| self.record.get(idx))
            .unwrap_or("")
    }

    fn lower(&self, column: &str) -> String {
        self.get(column).to_lowercase()
    }

    fn raw(&self, column: &str) -> String {
        self.get(column).to_owned()
    }

    fn into_record(self) -> DeviceRecord {
        let pn = self.get("pn");
        let port_number = if is_numeric(pn) {
            zero_fill(pn, 2)
        } else {
            pn.to_owned()
        };

        DeviceRecord {
            address: DeviceAddress::new(
                zero_fill(&self.lower("dom"), 4),
                zero_fill(&self.lower("bus"), 2),
                zero_fill(&self.lower("dev"), 2),
                self.lower("func"),
            ),
            vendor_id: non_empty(self.lower("vendor")),
            device_id: non_empty(self.lower("device")),
            max_link_width: self.raw("max_width"),
            cur_link_width: self.raw("cur_width"),
            max_link_speed: self.raw("max_speed"),
            cur_link_speed: self.raw("cur_speed"),
            target_link_speed: self.raw("tar_speed"),
            port_number,
            revision: self.lower("rev"),
            device_type: self.raw("type"),
        }
    }
}

/// Parses a baseline table. Blank cells stay blank so that they act as wildcards.
pub fn parse<R: Read>(reader: R) -> Result<Vec<DeviceRecord>, BaselineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_owned(), idx))
        .collect();

    for column in COLUMNS.iter().filter(|c| !columns.contains_key(**c)) {
        log::debug!("baseline: no {} column, treating it as a wildcard", column);
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row = Row {
            columns: &columns,
            record: &record,
        };
        records.push(row.into_record());
    }
    Ok(records)
}

pub fn load(path: impl AsRef<Path>) -> Result<RecordSet, BaselineError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| BaselineError::Open {
        path: path.to_owned(),
        source,
    })?;
    let records = parse(file)?;
    log::info!(
        "loaded {} baseline entries from {}",
        records.len(),
        path.display()
    );
    Ok(records.into_iter().collect())
}

/// Cells of a record in [`COLUMNS`] order.
pub fn row(record: &DeviceRecord) -> [&str; 14] {
    [
        record.address.domain.as_str(),
        record.address.bus.as_str(),
        record.address.device.as_str(),
        record.address.function.as_str(),
        record.vendor_id.as_deref().unwrap_or(""),
        record.device_id.as_deref().unwrap_or(""),
        record.max_link_width.as_str(),
        record.cur_link_width.as_str(),
        record.max_link_speed.as_str(),
        record.cur_link_speed.as_str(),
        record.port_number.as_str(),
        record.target_link_speed.as_str(),
        record.device_type.as_str(),
        record.revision.as_str(),
    ]
}
