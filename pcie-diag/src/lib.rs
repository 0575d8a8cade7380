//! PCI Express topology and link-training inspection.
//!
//! The pipeline is `enumerate` → `block` → `extract` → `record`/`baseline` → `compare` →
//! `report`. Everything except the enumerator is pure and works on borrowed text.

pub mod baseline;
pub mod block;
pub mod compare;
pub mod config;
pub mod enumerate;
pub mod extract;
pub mod record;
pub mod report;

pub use crate::compare::{compare, DiffEntry, Verdict};
pub use crate::enumerate::{DeviceSource, EnumerateError, Lspci, TextFile};
pub use crate::record::{DeviceAddress, DeviceRecord, Field, RecordSet};

/// Runs the enumerator and extracts one record per device block, in enumeration order.
pub fn live_records(source: &dyn DeviceSource) -> Result<Vec<DeviceRecord>, EnumerateError> {
    let text = source.read_text()?;
    let records: Vec<DeviceRecord> = block::split_blocks(&text)
        .map(|block| DeviceRecord::from_block(&block))
        .collect();
    log::debug!("extracted {} device records", records.len());
    Ok(records)
}
