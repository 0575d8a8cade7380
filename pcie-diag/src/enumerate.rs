use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use thiserror::Error;

/// Flags for domain-qualified addresses, full register dumps and bracketed numeric IDs.
/// The extraction rules only match output produced with these.
pub const LSPCI_ARGS: &[&str] = &["-Dvvvnn"];

pub const DEFAULT_LSPCI: &str = "lspci";

#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Status {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("failed to read enumerator output from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Produces the raw text describing every PCI function on the host.
pub trait DeviceSource {
    fn read_text(&self) -> Result<String, EnumerateError>;
}

/// Runs `lspci` and returns its standard output.
#[derive(Clone, Debug)]
pub struct Lspci {
    program: String,
}

impl Lspci {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for Lspci {
    fn default() -> Self {
        Self::new(DEFAULT_LSPCI)
    }
}

impl DeviceSource for Lspci {
    fn read_text(&self) -> Result<String, EnumerateError> {
        let mut command = Command::new(&self.program);
        command.args(LSPCI_ARGS);

        log::debug!("enumerate: running {:?}", command);

        let output = command.output().map_err(|source| EnumerateError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(EnumerateError::Status {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        log::trace!("enumerate: {} bytes of output", text.len());
        Ok(text)
    }
}

/// Previously captured enumerator output.
#[derive(Clone, Debug)]
pub struct TextFile {
    path: PathBuf,
}

impl TextFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DeviceSource for TextFile {
    fn read_text(&self) -> Result<String, EnumerateError> {
        log::debug!("enumerate: reading {}", self.path.display());
        let bytes = fs::read(&self.path).map_err(|source| EnumerateError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
