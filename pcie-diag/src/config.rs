use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::enumerate::DEFAULT_LSPCI;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Optional tool settings, loaded from TOML.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub enumerator: EnumeratorSettings,
    pub report: ReportSettings,
    pub log: LogSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnumeratorSettings {
    pub program: String,
}

impl Default for EnumeratorSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_LSPCI.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSettings {
    /// `None` means color when stdout is a terminal.
    pub color: Option<bool>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    pub level: Option<LogLevel>,
}

impl Settings {
    pub fn from_toml(path: &Path, data: &str) -> Result<Self, SettingsError> {
        toml::from_str(data).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(path, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Result<Settings, SettingsError> {
        Settings::from_toml(Path::new("settings.toml"), data)
    }

    #[test]
    fn empty_file_is_default() {
        let settings = parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.enumerator.program, "lspci");
        assert_eq!(settings.report.color, None);
        assert_eq!(settings.log.level, None);
    }

    #[test]
    fn all_sections() {
        let settings = parse(
            r#"
[enumerator]
program = "/usr/bin/lspci"

[report]
color = false

[log]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(settings.enumerator.program, "/usr/bin/lspci");
        assert_eq!(settings.report.color, Some(false));
        assert_eq!(
            settings.log.level.map(log::LevelFilter::from),
            Some(log::LevelFilter::Debug)
        );
    }

    #[test]
    fn bad_level_is_rejected() {
        assert!(matches!(
            parse("[log]\nlevel = \"loud\"\n"),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Settings::load("/nonexistent/pcie-diag.toml"),
            Err(SettingsError::Read { .. })
        ));
    }
}
