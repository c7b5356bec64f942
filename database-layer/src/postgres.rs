// Postgres transport built on sqlx pools.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::params::{SqlType, TypedParam};
use crate::settings::DatabaseSettings;
use crate::sql::{procedure_call, rewrite_named_parameters};
use crate::transport::{DatabaseTarget, Row, SqlTransport, TransportConnector};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Connection pool for one database
pub struct PgTransport {
    pool: PgPool,
    target: DatabaseTarget,
}

impl PgTransport {
    /// Open a pool and establish its first connection.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::ConnectionFailed`] with the driver's message.
    pub async fn connect(settings: &DatabaseSettings, target: DatabaseTarget) -> DatabaseResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(settings.idle_timeout())
            .connect_with(settings.connect_options(target))
            .await
            .map_err(|e| DatabaseError::connection(target, &e))?;

        info!(
            target_db = %target,
            database = settings.database_for(target),
            "Database connection pool created successfully"
        );

        Ok(Self { pool, target })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SqlTransport for PgTransport {
    async fn query(&self, sql: &str, params: &[TypedParam]) -> DatabaseResult<Vec<Row>> {
        let prepared = rewrite_named_parameters(sql, params)?;
        debug!(target_db = %self.target, binds = prepared.binds.len(), "Executing query");

        let mut query = sqlx::query(&prepared.sql);
        for param in prepared.binds {
            query = bind(query, param)?;
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn execute_procedure(&self, name: &str, params: &[TypedParam]) -> DatabaseResult<Vec<Row>> {
        let sql = procedure_call(name, params)?;
        debug!(target_db = %self.target, procedure = name, "Executing stored procedure");

        let mut query = sqlx::query(&sql);
        for param in params {
            query = bind(query, param)?;
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!(target_db = %self.target, "Database connection pool closed");
    }
}

fn bind<'q>(query: PgQuery<'q>, param: &TypedParam) -> DatabaseResult<PgQuery<'q>> {
    Ok(match param.sql_type {
        SqlType::Text => query.bind(param.as_text()),
        SqlType::Integer => query.bind(param.as_integer()?),
        SqlType::Float => query.bind(param.as_float()?),
        SqlType::Boolean => query.bind(param.as_boolean()?),
        SqlType::DateTime => query.bind(param.as_timestamp()?),
        SqlType::UniqueIdentifier => query.bind(param.as_uuid()?),
    })
}

/// Decode a row into JSON by column type. Types without a mapping decode
/// as text when the driver allows it, otherwise as null.
fn row_to_json(row: &PgRow) -> DatabaseResult<Row> {
    let mut map = Row::new();

    for column in row.columns() {
        let index = column.ordinal();
        if row.try_get_raw(index)?.is_null() {
            map.insert(column.name().to_string(), Value::Null);
            continue;
        }

        let value = match column.type_info().name() {
            "BOOL" => Value::Bool(row.try_get(index)?),
            "INT2" => Value::from(row.try_get::<i16, _>(index)?),
            "INT4" => Value::from(row.try_get::<i32, _>(index)?),
            "INT8" => Value::from(row.try_get::<i64, _>(index)?),
            "FLOAT4" => Value::from(row.try_get::<f32, _>(index)?),
            "FLOAT8" => Value::from(row.try_get::<f64, _>(index)?),
            "UUID" => Value::String(row.try_get::<Uuid, _>(index)?.to_string()),
            "TIMESTAMPTZ" => Value::String(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
            "TIMESTAMP" => Value::String(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
            "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
            "JSON" | "JSONB" => row.try_get::<Value, _>(index)?,
            other => match row.try_get::<String, _>(index) {
                Ok(text) => Value::String(text),
                Err(e) => {
                    debug!(column = column.name(), pg_type = other, error = %e, "Column decoded as null");
                    Value::Null
                }
            },
        };
        map.insert(column.name().to_string(), value);
    }

    Ok(map)
}

/// Opens [`PgTransport`] pools from shared settings
pub struct PgConnector {
    settings: DatabaseSettings,
}

impl PgConnector {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }
}

#[async_trait]
impl TransportConnector for PgConnector {
    async fn connect(&self, target: DatabaseTarget) -> DatabaseResult<Arc<dyn SqlTransport>> {
        let transport = PgTransport::connect(&self.settings, target).await?;
        Ok(Arc::new(transport))
    }
}
