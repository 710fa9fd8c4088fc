//! The module responsible for writing a model to a `SQLite` database.
//!
//! Tables are written inside a single transaction, each under its own savepoint, so that a table
//! which cannot be written is rolled back on its own and reported instead of aborting the write.
use crate::relation::{Relation, RelationSet, Row};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info, warn};
use rusqlite::{Connection, params_from_iter};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

/// File extension for model databases
pub const DATABASE_EXTENSION: &str = "sqlite";

/// A table which could not be written
#[derive(Debug, Clone, PartialEq)]
pub struct WriteWarning {
    /// Name of the table
    pub table: &'static str,
    /// Why the write failed
    pub reason: String,
}

impl fmt::Display for WriteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not write table {}: {}", self.table, self.reason)
    }
}

/// Path to the database for the named model
pub fn database_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{name}.{DATABASE_EXTENSION}"))
}

/// Quote an identifier for use in SQL
fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

/// SQL creating the table for a relation, if it does not already exist
fn create_table_sql(relation: Relation) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(relation.table_name()),
        relation.columns().iter().copied().map(quote).join(", ")
    )
}

/// SQL inserting one row into the table for a relation
fn insert_sql(relation: Relation) -> String {
    format!(
        "INSERT INTO {} VALUES ({})",
        quote(relation.table_name()),
        (1..=relation.arity()).map(|i| format!("?{i}")).join(", ")
    )
}

/// Create a table for every relation which doesn't already have one
fn create_schema(conn: &Connection) -> Result<()> {
    for relation in Relation::iter() {
        conn.execute(&create_table_sql(relation), [])
            .with_context(|| format!("Could not create table {relation}"))?;
    }

    Ok(())
}

/// Insert rows into the table for a relation
fn insert_rows(conn: &Connection, relation: Relation, rows: &[Row]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(&insert_sql(relation))?;
    for row in rows {
        stmt.execute(params_from_iter(row))?;
    }

    Ok(())
}

/// Create an empty database at `path`, replacing any existing file.
///
/// If a template database is given, it is copied first and only missing tables are created.
fn create_database(path: &Path, template: Option<&Path>) -> Result<Connection> {
    if path.exists() {
        debug!("Removing existing database {}", path.display());
        fs::remove_file(path)
            .with_context(|| format!("Could not remove existing database {}", path.display()))?;
    }

    if let Some(template) = template {
        fs::copy(template, path).with_context(|| {
            format!(
                "Could not copy template database {} to {}",
                template.display(),
                path.display()
            )
        })?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Could not open database {}", path.display()))?;
    create_schema(&conn)?;

    Ok(conn)
}

/// Write every relation to a new database at `path`.
///
/// Tables which cannot be written are skipped and returned as warnings. Other failures, such as
/// being unable to create the database, are errors.
///
/// # Arguments
///
/// * `path` - Path of the database file to create
/// * `relations` - The assembled model
/// * `template` - Optional database to copy the schema from
pub fn write_model(
    path: &Path,
    relations: &RelationSet,
    template: Option<&Path>,
) -> Result<Vec<WriteWarning>> {
    let mut conn = create_database(path, template)?;
    let mut tx = conn.transaction()?;
    let mut warnings = Vec::new();

    for (relation, rows) in relations.tables() {
        if rows.is_empty() {
            continue;
        }

        let savepoint = tx.savepoint()?;
        match insert_rows(&savepoint, relation, rows) {
            Ok(()) => savepoint.commit()?,
            Err(err) => {
                // Dropping the savepoint rolls the table back
                let warning = WriteWarning {
                    table: relation.table_name(),
                    reason: err.to_string(),
                };
                warn!("{warning}");
                warnings.push(warning);
            }
        }
    }
    tx.commit()
        .with_context(|| format!("Could not commit database {}", path.display()))?;

    info!(
        "Wrote {} rows to {}",
        relations.total_rows(),
        path.display()
    );

    Ok(warnings)
}
