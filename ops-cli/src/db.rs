// Database diagnostics over the resilient data layer.
use std::io::Write;

use colored::Colorize;
use database_layer::{DataRequest, DatabaseTarget, Outcome, ResilientDataAccess, Row};
use error_common::Result;
use serde_json::Value;

use crate::cli::DbCommand;

const VERSION_SQL: &str = "SELECT version() AS version";

const TABLES_SQL: &str = "SELECT table_schema, table_name \
     FROM information_schema.tables \
     WHERE table_type = 'BASE TABLE' \
       AND table_schema NOT IN ('pg_catalog', 'information_schema') \
     ORDER BY table_schema, table_name";

const COLUMNS_SQL: &str = "SELECT column_name, data_type \
     FROM information_schema.columns \
     WHERE table_name = @table \
     ORDER BY ordinal_position";

fn target(warehouse: bool) -> DatabaseTarget {
    if warehouse {
        DatabaseTarget::Warehouse
    } else {
        DatabaseTarget::Primary
    }
}

pub async fn execute<W: Write>(access: &ResilientDataAccess, command: DbCommand, out: &mut W) -> Result<()> {
    match command {
        DbCommand::Check { warehouse } => check(access, target(warehouse), out).await,
        DbCommand::Columns { table, warehouse } => columns(access, target(warehouse), &table, out).await,
    }
}

fn field<'r>(row: &'r Row, name: &str) -> &'r str {
    row.get(name).and_then(Value::as_str).unwrap_or("?")
}

fn report_suppressed<W: Write>(out: &mut W, context: &str) -> Result<()> {
    writeln!(
        out,
        "{} {context} failed; the error filter suppressed the failure",
        "!".yellow()
    )?;
    Ok(())
}

pub async fn check<W: Write>(access: &ResilientDataAccess, target: DatabaseTarget, out: &mut W) -> Result<()> {
    writeln!(out, "Checking {target} database...\n")?;

    let version = DataRequest::query(VERSION_SQL).on(target).context("Version Check");
    match access.run(&version).await? {
        Outcome::Completed(rows) => {
            let version = rows.first().map_or("unknown", |row| field(row, "version"));
            writeln!(out, "Server: {version}")?;
        }
        Outcome::Suppressed => return report_suppressed(out, "Version Check"),
    }

    let tables = DataRequest::query(TABLES_SQL).on(target).context("Table Listing");
    match access.run(&tables).await? {
        Outcome::Completed(rows) => {
            writeln!(out, "\n{} ({}):", "Tables".bold(), rows.len())?;
            for row in &rows {
                writeln!(out, "  - {}.{}", field(row, "table_schema"), field(row, "table_name"))?;
            }
            writeln!(out, "\n{} Connected to {target} database", "✓".green())?;
            Ok(())
        }
        Outcome::Suppressed => report_suppressed(out, "Table Listing"),
    }
}

pub async fn columns<W: Write>(
    access: &ResilientDataAccess,
    target: DatabaseTarget,
    table: &str,
    out: &mut W,
) -> Result<()> {
    let request = DataRequest::query(COLUMNS_SQL)
        .on(target)
        .bind("table", table)
        .context("Column Listing");

    match access.run(&request).await? {
        Outcome::Completed(rows) if rows.is_empty() => {
            writeln!(out, "No columns found for {table}")?;
            Ok(())
        }
        Outcome::Completed(rows) => {
            writeln!(out, "Columns in {table}:")?;
            for row in &rows {
                writeln!(out, "  - {} ({})", field(row, "column_name"), field(row, "data_type"))?;
            }
            Ok(())
        }
        Outcome::Suppressed => report_suppressed(out, "Column Listing"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use database_layer::{DatabaseError, DatabaseResult, SqlTransport, TransportConnector, TypedParam};
    use error_policy::{ErrorPolicyStore, MemoryPolicySource};

    use super::*;

    /// Answers the catalogue queries from fixed rows.
    struct Catalogue;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
            .collect()
    }

    #[async_trait]
    impl SqlTransport for Catalogue {
        async fn query(&self, sql: &str, params: &[TypedParam]) -> DatabaseResult<Vec<Row>> {
            if sql == VERSION_SQL {
                return Ok(vec![row(&[("version", "PostgreSQL 16.2")])]);
            }
            if sql == TABLES_SQL {
                return Ok(vec![
                    row(&[("table_schema", "public"), ("table_name", "sys_user_master")]),
                    row(&[("table_schema", "public"), ("table_name", "cdc_patient_data")]),
                ]);
            }
            match params.first().and_then(TypedParam::as_text).as_deref() {
                Some("sys_user_master") => Ok(vec![
                    row(&[("column_name", "UserID"), ("data_type", "uuid")]),
                    row(&[("column_name", "Username"), ("data_type", "text")]),
                ]),
                _ => Err(DatabaseError::QueryFailed("ETIMEOUT reading catalogue".into())),
            }
        }

        async fn execute_procedure(&self, _: &str, _: &[TypedParam]) -> DatabaseResult<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn close(&self) {}
    }

    struct CatalogueConnector;

    #[async_trait]
    impl TransportConnector for CatalogueConnector {
        async fn connect(&self, _: DatabaseTarget) -> DatabaseResult<Arc<dyn SqlTransport>> {
            Ok(Arc::new(Catalogue))
        }
    }

    async fn access() -> ResilientDataAccess {
        colored::control::set_override(false);
        let policy = MemoryPolicySource::with_contents(
            r#"{ "ignoredPatterns": [ { "regex": "^ETIMEOUT", "description": "", "enabled": true } ] }"#,
        );
        let store = Arc::new(ErrorPolicyStore::open(Arc::new(policy)).await);
        ResilientDataAccess::new(Arc::new(CatalogueConnector), store)
    }

    #[tokio::test]
    async fn test_check_lists_tables() {
        let access = access().await;
        let mut out = Vec::new();
        execute(&access, DbCommand::Check { warehouse: true }, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Checking warehouse database"));
        assert!(out.contains("Server: PostgreSQL 16.2"));
        assert!(out.contains("Tables (2):"));
        assert!(out.contains("  - public.cdc_patient_data"));
    }

    #[tokio::test]
    async fn test_columns_and_suppressed_failure() {
        let access = access().await;
        let mut out = Vec::new();
        let columns = DbCommand::Columns {
            table: "sys_user_master".into(),
            warehouse: false,
        };
        execute(&access, columns, &mut out).await.unwrap();
        let missing = DbCommand::Columns {
            table: "unknown".into(),
            warehouse: false,
        };
        execute(&access, missing, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("  - UserID (uuid)"));
        assert!(out.contains("Column Listing failed; the error filter suppressed the failure"));
    }
}
