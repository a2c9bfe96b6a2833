use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{Result, StoreError};
use crate::storage::table_name_for_session;

pub const DEFAULT_FILENAME: &str = "tasks.db";
pub const DEFAULT_TABLE: &str = "task_records";
pub const DEFAULT_CACHED_STATEMENTS: usize = 64;

/// Where a task store lives and which table it binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory containing the database file.
    pub location: PathBuf,
    pub filename: String,
    /// Explicit table identity; wins over `session`.
    pub table: Option<String>,
    /// Session token the table identity is derived from.
    pub session: Option<String>,
    /// Offset attached to naive timestamps. Defaults to the host's local offset.
    pub utc_offset_seconds: Option<i32>,
    pub cached_statements: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("."),
            filename: DEFAULT_FILENAME.to_string(),
            table: None,
            session: None,
            utc_offset_seconds: None,
            cached_statements: DEFAULT_CACHED_STATEMENTS,
        }
    }
}

impl StoreConfig {
    /// Loads a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read config file '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            StoreError::Config(format!("Malformed config file '{}': {e}", path.display()))
        })
    }

    /// Overlays `TASKSTORE_*` variables from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(std::env::vars())
    }

    /// Overlays `TASKSTORE_LOCATION`, `TASKSTORE_FILENAME`, `TASKSTORE_TABLE`,
    /// `TASKSTORE_SESSION` and `TASKSTORE_UTC_OFFSET` from `vars`.
    pub fn apply_vars<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value: String = value.into();
            match key.as_ref() {
                "TASKSTORE_LOCATION" => self.location = PathBuf::from(value),
                "TASKSTORE_FILENAME" => self.filename = value,
                "TASKSTORE_TABLE" => self.table = Some(value),
                "TASKSTORE_SESSION" => self.session = Some(value),
                "TASKSTORE_UTC_OFFSET" => {
                    let secs = value.parse::<i32>().map_err(|_| {
                        StoreError::Config(format!(
                            "TASKSTORE_UTC_OFFSET must be whole seconds but got '{value}'"
                        ))
                    })?;
                    self.utc_offset_seconds = Some(secs);
                }
                _ => {}
            }
        }
        Ok(self)
    }

    pub fn path(&self) -> PathBuf {
        self.location.join(&self.filename)
    }

    /// Requested table identity: explicit table, else derived from the
    /// session, else the default.
    pub fn table_name(&self) -> String {
        match (&self.table, &self.session) {
            (Some(table), _) if !table.is_empty() => table.clone(),
            (_, Some(session)) => table_name_for_session(session),
            _ => DEFAULT_TABLE.to_string(),
        }
    }

    pub fn codec(&self) -> Result<Codec> {
        match self.utc_offset_seconds {
            None => Ok(Codec::local()),
            Some(secs) => FixedOffset::east_opt(secs).map(Codec::new).ok_or_else(|| {
                StoreError::Config(format!("UTC offset {secs}s is out of range"))
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.filename.trim().is_empty() {
            return Err(StoreError::Config("filename cannot be empty".to_string()));
        }
        if self.cached_statements == 0 {
            return Err(StoreError::Config(
                "cached_statements must be greater than zero".to_string(),
            ));
        }
        self.codec().map(|_| ())
    }
}
