use std::fmt;

use crate::record::{DeviceRecord, Field, RecordSet};

/// One difference between the baseline and the live system.
#[derive(Clone, Debug, PartialEq)]
pub enum DiffEntry {
    /// The baseline address is not present on the live system.
    Missing { baseline: DeviceRecord },
    /// The address is present, but a field set in the baseline differs.
    Mismatch {
        field: Field,
        expected: String,
        actual: String,
        baseline: DeviceRecord,
    },
}

impl DiffEntry {
    pub fn baseline(&self) -> &DeviceRecord {
        match self {
            DiffEntry::Missing { baseline } | DiffEntry::Mismatch { baseline, .. } => baseline,
        }
    }
}

/// Checks every baseline entry against the live set.
///
/// Blank baseline fields match anything, and live devices the baseline does not mention are
/// ignored.
pub fn compare(baseline: &RecordSet, live: &RecordSet) -> Vec<DiffEntry> {
    let mut diffs = Vec::new();

    for (key, expected) in baseline.iter() {
        let Some(actual) = live.get(key) else {
            log::debug!("compare: {} not in system", key);
            diffs.push(DiffEntry::Missing {
                baseline: expected.clone(),
            });
            continue;
        };

        for field in Field::ALL {
            let want = expected.field(field).trim();
            if want.is_empty() {
                continue;
            }
            let got = actual.field(field).trim();
            if want != got {
                log::debug!("compare: {} {}: expected {:?}, got {:?}", key, field, want, got);
                diffs.push(DiffEntry::Mismatch {
                    field,
                    expected: want.to_owned(),
                    actual: got.to_owned(),
                    baseline: expected.clone(),
                });
            }
        }
    }

    diffs
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_diffs(diffs: &[DiffEntry]) -> Self {
        if diffs.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        })
    }
}
