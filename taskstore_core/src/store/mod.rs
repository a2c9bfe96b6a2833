//! The task-record store: CRUD over one SQLite table.
//!
//! Writes go into an open engine transaction and become durable only when
//! the owner calls [`TaskStore::flush`] (or [`TaskStore::close`]). Dropping a
//! store without closing it discards unflushed writes.

mod rows;

use std::path::{Path, PathBuf};

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, params_from_iter};
use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::filter::{Filter, Predicate};
use crate::storage::{open_connection, quote_ident, resolve_table};
use crate::types::field::{Field, parse_field};
use crate::types::value::Value;
use crate::types::{Record, empty_record};

use rows::{bind_params, decode_row};

#[derive(Debug)]
pub struct TaskStore {
    conn: Connection,
    codec: Codec,
    path: Option<PathBuf>,
    table: String,
    quoted_table: String,
}

impl TaskStore {
    /// Opens (or creates) the database file named by `config` and binds to a
    /// compatible table, which may be a suffixed variant of the requested one.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let path = config.path();
        let conn = open_connection(&path, config.cached_statements)?;
        Self::bind(conn, config.codec()?, &config.table_name(), Some(path))
    }

    /// Store backed by a private in-memory database.
    pub fn open_in_memory(table: &str, codec: Codec) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::bind(conn, codec, table, None)
    }

    fn bind(
        conn: Connection,
        codec: Codec,
        requested: &str,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        let table = resolve_table(&conn, requested)?;
        if table != requested {
            warn!(requested, resolved = %table, "task table identity changed");
        }
        info!(table = %table, "task store ready");
        Ok(Self {
            conn,
            codec,
            path,
            quoted_table: quote_ident(&table),
            table,
        })
    }

    /// Table identity this store resolved to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Database file, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// True when writes are waiting for the next flush.
    pub fn has_pending_writes(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Inserts a new record. Fields missing from `fields` are null and the
    /// `msg_id` column is forced to `msg_id`.
    pub fn add_record(&mut self, msg_id: &str, fields: Record) -> Result<()> {
        validate_id(msg_id)?;
        let mut rec = empty_record();
        rec.extend(fields);
        rec.insert(Field::MsgId, Value::Text(msg_id.to_string()));

        let values = rec
            .iter()
            .map(|(field, value)| self.codec.encode(*field, value))
            .collect::<Result<Vec<SqlValue>>>()?;
        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!("INSERT INTO {} VALUES ({placeholders})", self.quoted_table);

        self.begin()?;
        let inserted = self
            .conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values.iter()));
        match inserted {
            Ok(_) => {
                debug!(msg_id, "added task record");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKey(msg_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_record(&self, msg_id: &str) -> Result<Record> {
        let sql = format!("SELECT * FROM {} WHERE \"msg_id\" = ?1", self.quoted_table);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query([msg_id])?;
        match rows.next()? {
            Some(row) => decode_row(&self.codec, row, &Field::ALL),
            None => Err(StoreError::NotFound(msg_id.to_string())),
        }
    }

    /// Rewrites only the given columns. An unknown `msg_id` is `NotFound`.
    pub fn update_record(&mut self, msg_id: &str, fields: Record) -> Result<()> {
        if fields.contains_key(&Field::MsgId) {
            return Err(StoreError::validation("msg_id cannot be updated"));
        }
        if fields.is_empty() {
            return self.get_record(msg_id).map(|_| ());
        }

        let mut entries: Vec<(Field, &Value)> = fields.iter().map(|(f, v)| (*f, v)).collect();
        entries.sort_by_key(|(field, _)| field.name());
        let mut values = entries
            .iter()
            .map(|(field, value)| self.codec.encode(*field, value))
            .collect::<Result<Vec<SqlValue>>>()?;
        values.push(SqlValue::Text(msg_id.to_string()));
        let sets = entries
            .iter()
            .map(|(field, _)| format!("{} = ?", field.quoted()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {sets} WHERE \"msg_id\" = ?", self.quoted_table);

        self.begin()?;
        let updated = self
            .conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values.iter()))?;
        if updated == 0 {
            return Err(StoreError::NotFound(msg_id.to_string()));
        }
        debug!(msg_id, columns = entries.len(), "updated task record");
        Ok(())
    }

    /// Deletes a record if present.
    pub fn drop_record(&mut self, msg_id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE \"msg_id\" = ?1", self.quoted_table);
        self.begin()?;
        let removed = self.conn.prepare_cached(&sql)?.execute([msg_id])?;
        debug!(msg_id, removed, "dropped task record");
        Ok(())
    }

    /// Deletes every record matching `filter`; returns how many went.
    pub fn drop_matching(&mut self, filter: &Filter) -> Result<usize> {
        let Predicate { sql: expr, params } = filter.compile()?;
        let args = bind_params(&self.codec, &params)?;
        let sql = format!("DELETE FROM {} WHERE {expr}", self.quoted_table);
        self.begin()?;
        let removed = self.conn.execute(&sql, params_from_iter(args.iter()))?;
        debug!(removed, "dropped matching task records");
        Ok(removed)
    }

    /// Records matching `filter`, oldest submission first. With a non-empty
    /// projection, each record holds only the named fields, always including
    /// `msg_id`. An empty projection means every field.
    pub fn find_records(
        &self,
        filter: &Filter,
        projection: Option<&[&str]>,
    ) -> Result<Vec<Record>> {
        let fields = match projection {
            Some(names) if !names.is_empty() => resolve_projection(names)?,
            _ => Field::ALL.to_vec(),
        };
        let Predicate { sql: expr, params } = filter.compile()?;
        let args = bind_params(&self.codec, &params)?;
        let columns = fields
            .iter()
            .map(|f| f.quoted())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM {} WHERE {expr} ORDER BY \"submitted\", \"msg_id\"",
            self.quoted_table
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(decode_row(&self.codec, row, &fields)?);
        }
        debug!(matched = out.len(), "found task records");
        Ok(out)
    }

    pub fn count(&self, filter: &Filter) -> Result<usize> {
        let Predicate { sql: expr, params } = filter.compile()?;
        let args = bind_params(&self.codec, &params)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {expr}", self.quoted_table);
        let n: i64 = self
            .conn
            .query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
        usize::try_from(n)
            .map_err(|_| StoreError::codec("count", format!("count '{n}' cannot be represented")))
    }

    /// All ids ordered by submission time; records never submitted come
    /// first, ties fall back to `msg_id`.
    pub fn history(&self) -> Result<Vec<String>> {
        let fields = [Field::MsgId, Field::Submitted];
        let sql = format!("SELECT \"msg_id\", \"submitted\" FROM {}", self.quoted_table);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let mut rec = decode_row(&self.codec, row, &fields)?;
            let submitted = rec
                .remove(&Field::Submitted)
                .and_then(|v| v.as_timestamp().copied());
            let msg_id = match rec.remove(&Field::MsgId) {
                Some(Value::Text(id)) => id,
                other => {
                    return Err(StoreError::codec("msg_id", format!("unexpected id {other:?}")));
                }
            };
            entries.push((submitted, msg_id));
        }
        entries.sort();
        Ok(entries.into_iter().map(|(_, id)| id).collect())
    }

    /// Commits pending writes. A no-op when nothing is pending.
    pub fn flush(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("COMMIT")?;
        debug!(table = %self.table, "flushed task store");
        Ok(())
    }

    /// Final flush, then release of the connection. The connection is
    /// released even when the flush fails; the first error is returned.
    pub fn close(mut self) -> Result<()> {
        let flushed = self.flush();
        if let Err(err) = &flushed {
            warn!(
                table = %self.table,
                error = %err,
                "final flush failed; unflushed writes are lost"
            );
        }
        let TaskStore { conn, table, .. } = self;
        let closed = conn.close().map_err(|(_, err)| StoreError::from(err));
        info!(table = %table, "task store closed");
        flushed.and(closed)
    }

    fn begin(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

fn validate_id(msg_id: &str) -> Result<()> {
    if msg_id.is_empty() {
        return Err(StoreError::validation("msg_id cannot be empty"));
    }
    Ok(())
}

/// `msg_id` first, then the requested fields in order without repeats.
fn resolve_projection(names: &[&str]) -> Result<Vec<Field>> {
    let requested = names
        .iter()
        .map(|name| parse_field(name).map_err(StoreError::Validation))
        .collect::<Result<Vec<Field>>>()?;
    let mut fields = vec![Field::MsgId];
    for field in requested {
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    Ok(fields)
}
