use rusqlite::Connection;
use tracing::{info, warn};

use crate::codec::Codec;
use crate::error::{Result, StoreError};
use crate::types::field::Field;

/// Upper bound on `<base>_<n>` candidates tried when tables have drifted.
pub const MAX_TABLE_ATTEMPTS: usize = 1000;

/// Represents a single column as SQLite reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub declared_type: String,
}

/// Column names and declared types of one table, in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

/// Outcome of comparing a table identity against the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCheck {
    Missing,
    Matches,
    Drifted(String),
}

impl TableSchema {
    /// The task-record shape, with declared types taken from the codec.
    pub fn expected() -> Self {
        let columns = Field::ALL
            .iter()
            .map(|f| Column {
                name: f.name().to_string(),
                declared_type: Codec::declared_type(f.kind()).to_string(),
            })
            .collect();
        Self { columns }
    }

    /// Reads the shape of `table`, or `None` if no such table exists.
    pub fn load(conn: &Connection, table: &str) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(Column {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { columns }))
    }

    /// Describes the first difference from `expected`, if any. SQLite may
    /// report declared types in a different case, so types compare ignoring
    /// ASCII case.
    pub fn mismatch(&self, expected: &TableSchema) -> Option<String> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let expected_names: Vec<&str> = expected.columns.iter().map(|c| c.name.as_str()).collect();
        if names != expected_names {
            return Some(format!(
                "keys mismatch: found [{}], expected [{}]",
                names.join(", "),
                expected_names.join(", ")
            ));
        }
        self.columns
            .iter()
            .zip(&expected.columns)
            .find(|(found, want)| !found.declared_type.eq_ignore_ascii_case(&want.declared_type))
            .map(|(found, want)| {
                format!(
                    "type mismatch: {}: {} != {}",
                    found.name, found.declared_type, want.declared_type
                )
            })
    }

    pub fn create_sql(&self, table: &str) -> String {
        let cols = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let pk = if i == 0 { " PRIMARY KEY" } else { "" };
                format!("{} {}{}", quote_ident(&c.name), c.declared_type, pk)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({cols})", quote_ident(table))
    }
}

pub fn check_table(conn: &Connection, table: &str, expected: &TableSchema) -> Result<TableCheck> {
    Ok(match TableSchema::load(conn, table)? {
        None => TableCheck::Missing,
        Some(found) => match found.mismatch(expected) {
            None => TableCheck::Matches,
            Some(reason) => TableCheck::Drifted(reason),
        },
    })
}

/// Binds to `base` or the first `<base>_<n>` that is unused or already has the
/// expected shape, creating the table when it is missing. Drifted tables are
/// left untouched.
pub fn resolve_table(conn: &Connection, base: &str) -> Result<String> {
    let expected = TableSchema::expected();
    let mut candidate = base.to_string();
    for attempt in 1..=MAX_TABLE_ATTEMPTS {
        match check_table(conn, &candidate, &expected)? {
            TableCheck::Matches => {
                info!(table = %candidate, "reusing existing task table");
                return Ok(candidate);
            }
            TableCheck::Missing => {
                conn.execute_batch(&expected.create_sql(&candidate))?;
                info!(table = %candidate, "created task table");
                return Ok(candidate);
            }
            TableCheck::Drifted(reason) => {
                let next = format!("{base}_{attempt}");
                warn!(
                    table = %candidate,
                    %reason,
                    "Table {candidate} exists and doesn't match db format, trying {next}"
                );
                candidate = next;
            }
        }
    }
    Err(StoreError::StorageUnavailable(format!(
        "no compatible table found for '{base}' after {MAX_TABLE_ATTEMPTS} attempts"
    )))
}

/// Derives a table identity from a session token.
pub fn table_name_for_session(session: &str) -> String {
    let mut name: String = session
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
