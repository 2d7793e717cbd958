//! Drops and recreates every table from a DDL/DML script.

use crate::error::DbError;
use sqlx::PgPool;
use std::path::Path;

/// The schema and sample data shipped with the crate.
pub const BUNDLED_SCRIPT: &str = include_str!("../scripts/database.sql");

/// Reads the script at `path`, or returns the bundled one.
pub fn load_script(path: Option<&Path>) -> Result<String, DbError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| DbError::ScriptReadError {
            path: path.display().to_string(),
            source,
        }),
        None => Ok(BUNDLED_SCRIPT.to_string()),
    }
}

/// Splits a script into statements on `;`.
///
/// Whole-line `--` comments are removed first and empty statements are
/// skipped. Semicolons inside string literals are not supported.
pub fn split_statements(script: &str) -> Vec<String> {
    let without_comments: String = script
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drops every table in the current schema, then runs `script`, all in one
/// transaction. The first failing statement rolls everything back.
///
/// Returns the number of script statements executed.
pub async fn replay(pool: &PgPool, script: &str) -> Result<usize, DbError> {
    let statements = split_statements(script);
    let mut tx = pool.begin().await?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT tablename::text FROM pg_tables WHERE schemaname = current_schema()",
    )
    .fetch_all(&mut *tx)
    .await?;

    for table in &tables {
        tracing::debug!(table = %table, "Dropping table.");
        let drop = format!("DROP TABLE IF EXISTS \"{}\" CASCADE", table.replace('"', "\"\""));
        sqlx::query(&drop).persistent(false).execute(&mut *tx).await?;
    }

    for (index, statement) in statements.iter().enumerate() {
        tracing::debug!(index = index + 1, statement = %statement, "Executing schema statement.");
        if let Err(e) = sqlx::query(statement).persistent(false).execute(&mut *tx).await {
            tracing::error!(index = index + 1, error = %e, "Schema statement failed, rolling back.");
            // Dropping `tx` without committing rolls the transaction back.
            return Err(DbError::ScriptError {
                index: index + 1,
                statement: statement.clone(),
                message: e.to_string(),
            });
        }
    }

    tx.commit().await?;
    tracing::info!(
        dropped = tables.len(),
        statements = statements.len(),
        "Schema reinitialized."
    );
    Ok(statements.len())
}
