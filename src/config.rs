//! Runtime configuration read from the environment

use std::path::PathBuf;

use serde::Serialize;

use crate::bordereau::DEFAULT_DELIMITER;
use crate::error::{CrmError, Result};

pub const DATA_FILE_VAR: &str = "RCD_CRM_DATA_FILE";
pub const SESSIONS_FILE_VAR: &str = "RCD_CRM_SESSIONS_FILE";
pub const CSV_DELIMITER_VAR: &str = "RCD_CRM_CSV_DELIMITER";
pub const PERSIST_VAR: &str = "RCD_CRM_PERSIST";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfig {
    /// JSON snapshot of the CRM tables
    pub data_file: PathBuf,

    /// Bearer token to session table
    pub sessions_file: PathBuf,

    /// Field separator of generated CSV files
    pub csv_delimiter: u8,

    /// Write the snapshot back after each mutation
    pub persist: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/crm.json"),
            sessions_file: PathBuf::from("data/sessions.json"),
            csv_delimiter: DEFAULT_DELIMITER,
            persist: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables keep their default
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup(DATA_FILE_VAR) {
            config.data_file = PathBuf::from(path);
        }
        if let Some(path) = lookup(SESSIONS_FILE_VAR) {
            config.sessions_file = PathBuf::from(path);
        }
        if let Some(value) = lookup(CSV_DELIMITER_VAR) {
            config.csv_delimiter = parse_delimiter(&value)?;
        }
        if let Some(value) = lookup(PERSIST_VAR) {
            config.persist = parse_flag(PERSIST_VAR, &value)?;
        }
        Ok(config)
    }
}

/// A single ASCII character other than a quote or line break
pub fn parse_delimiter(value: &str) -> Result<u8> {
    match value.as_bytes() {
        [b] if b.is_ascii() && !matches!(b, b'"' | b'\r' | b'\n') => Ok(*b),
        _ => Err(CrmError::validation(format!(
            "{} must be a single ASCII character, got {:?}",
            CSV_DELIMITER_VAR, value
        ))),
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(CrmError::validation(format!("{} must be true or false, got {:?}", name, other))),
    }
}
