//! Support code shared by the pcie-diag crates.

mod logger;

pub use logger::{file_level, level_from_verbosity, output_level, setup_logging};
