//! SQLite analytical store for tabular assets.
//!
//! Each write replaces the named table wholesale. Columns are declared
//! without a type so every cell keeps the storage class of its JSON value:
//! integers, reals, text, and JSON text for arrays and objects.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::Value;

use crate::domain::ItemTable;

/// Handle to the analytical database file
#[derive(Debug, Clone)]
pub struct Warehouse {
    path: PathBuf,
}

impl Warehouse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open database: {}", self.path.display()))
    }

    /// Replace table `name` with the rows of `table`; returns rows written
    pub fn replace_table(&self, name: &str, table: &ItemTable) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;
        let quoted = quote_ident(name);

        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quoted))
            .with_context(|| format!("Failed to drop table {}", name))?;

        // A table without observed fields has nothing to declare
        if table.columns().is_empty() {
            tx.commit().context("Failed to commit transaction")?;
            return Ok(0);
        }

        let columns: Vec<String> = table.columns().iter().map(|c| quote_ident(c)).collect();
        tx.execute_batch(&format!("CREATE TABLE {} ({});", quoted, columns.join(", ")))
            .with_context(|| format!("Failed to create table {}", name))?;

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut written = 0;
        {
            let mut stmt = tx
                .prepare(&insert)
                .with_context(|| format!("Failed to prepare insert into {}", name))?;
            for row in table.rows() {
                let values = row.iter().map(|cell| to_sql(cell.as_ref()));
                stmt.execute(params_from_iter(values))
                    .with_context(|| format!("Failed to insert row into {}", name))?;
                written += 1;
            }
        }

        tx.commit().context("Failed to commit transaction")?;
        Ok(written)
    }

    /// Number of rows in `name`, or `None` if the table does not exist
    pub fn row_count(&self, name: &str) -> Result<Option<usize>> {
        let conn = self.connect()?;
        if !table_exists(&conn, name)? {
            return Ok(None);
        }
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(name)), [], |r| r.get(0))
            .with_context(|| format!("Failed to count rows of {}", name))?;
        Ok(Some(count as usize))
    }

    /// Column names of `name`, in declaration order
    pub fn column_names(&self, name: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(name)))?;
        let names = stmt
            .query_map([], |r| r.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read columns of {}", name))?;
        Ok(names)
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |r| r.get(0),
        )
        .optional()
        .context("Failed to query sqlite_master")?;
    Ok(found.is_some())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}
