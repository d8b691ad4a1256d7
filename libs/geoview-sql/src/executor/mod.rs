// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Running validated statements against a database.

mod cell_value;
mod result_set;

use std::{sync::Arc, time::Duration};

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_postgres::{NoTls, error::SqlState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    connect::{ConnectionProvider, DatabaseClient},
    database_error::DatabaseError,
    validator::ValidatedStatement,
};

pub use cell_value::{CellValue, GeometryCell};
pub use result_set::{ColumnMetadata, ResultRow, ResultSet};

pub const DEFAULT_MAX_ROWS: usize = 10_000;
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Statement timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Statement was cancelled")]
    Cancelled,

    #[error("Connection error: {0}")]
    ConnectionError(#[source] DatabaseError),

    #[error("{0}")]
    QueryFailed(String),

    #[error("Failed to decode column '{column}' of type {type_name}: {message}")]
    DecodeFailed {
        column: String,
        type_name: String,
        message: String,
    },
}

impl ExecutionError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::TimedOut(_) => "TimedOut",
            ExecutionError::Cancelled => "Cancelled",
            ExecutionError::ConnectionError(_) => "ConnectionError",
            ExecutionError::QueryFailed(_) => "QueryFailed",
            ExecutionError::DecodeFailed { .. } => "DecodeFailed",
        }
    }

    /// Timeouts and connection failures may succeed when tried again
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExecutionError::TimedOut(_) | ExecutionError::ConnectionError(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub max_rows: usize,
    pub timeout: Duration,
    /// Cancelling it aborts the in-flight statement
    pub cancel: CancellationToken,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            timeout: DEFAULT_STATEMENT_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }
}

/// Runs validated statements on connections from a [`ConnectionProvider`]. Executions are
/// independent, so one executor can serve concurrent callers.
#[derive(Clone)]
pub struct QueryExecutor {
    provider: Arc<dyn ConnectionProvider>,
}

impl QueryExecutor {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn ConnectionProvider> {
        &self.provider
    }

    /// Execute a statement in a read-only transaction. On timeout or cancellation, the statement
    /// is cancelled on the server before returning.
    pub async fn execute(
        &self,
        connection_id: &str,
        statement: &ValidatedStatement,
        options: &ExecuteOptions,
    ) -> Result<ResultSet, ExecutionError> {
        let mut client = self
            .provider
            .client(connection_id)
            .await
            .map_err(ExecutionError::ConnectionError)?;
        let cancel_token = client.cancel_token();

        debug!(connection_id, sql = statement.sql(), "Executing statement");

        let outcome = tokio::select! {
            result = run_statement(&mut client, statement, options) => result,
            _ = tokio::time::sleep(options.timeout) => Err(ExecutionError::TimedOut(options.timeout)),
            _ = options.cancel.cancelled() => Err(ExecutionError::Cancelled),
        };

        if let Err(error @ (ExecutionError::TimedOut(_) | ExecutionError::Cancelled)) = &outcome {
            warn!(connection_id, %error, "Cancelling in-flight statement");
            if let Err(e) = cancel_token.cancel_query(NoTls).await {
                warn!("Failed to cancel statement: {e}");
            }
        }

        outcome
    }
}

async fn run_statement(
    client: &mut DatabaseClient,
    statement: &ValidatedStatement,
    options: &ExecuteOptions,
) -> Result<ResultSet, ExecutionError> {
    let query_failed = |e: tokio_postgres::Error| map_query_error(e, options.timeout);

    let transaction = client
        .build_transaction()
        .read_only(true)
        .start()
        .await
        .map_err(query_failed)?;

    // The server enforces the timeout too, so the statement dies even if this task does
    transaction
        .batch_execute(&format!(
            "SET LOCAL statement_timeout = {}",
            options.timeout.as_millis()
        ))
        .await
        .map_err(query_failed)?;

    let prepared = transaction
        .prepare(statement.sql())
        .await
        .map_err(query_failed)?;

    let columns = prepared
        .columns()
        .iter()
        .map(|column| ColumnMetadata {
            name: column.name().to_string(),
            type_name: column.type_().name().to_string(),
        })
        .collect();

    let stream = transaction
        .query_raw(&prepared, statement.parameters().iter())
        .await
        .map_err(query_failed)?
        .map(|row| row.map_err(query_failed));

    let (rows, truncated) = collect_capped(stream, options.max_rows, |row| {
        let fields = (0..row.len())
            .map(|index| {
                Ok((
                    row.columns()[index].name().to_string(),
                    cell_value::decode_cell(&row, index)?,
                ))
            })
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        Ok(ResultRow { fields })
    })
    .await?;

    transaction.commit().await.map_err(query_failed)?;

    Ok(ResultSet {
        columns,
        rows,
        truncated,
    })
}

/// Convert up to `max_rows` items of `stream`. Reading stops at the first item past the cap, in
/// which case the result is marked truncated.
async fn collect_capped<R, T>(
    stream: impl Stream<Item = Result<R, ExecutionError>>,
    max_rows: usize,
    mut convert: impl FnMut(R) -> Result<T, ExecutionError>,
) -> Result<(Vec<T>, bool), ExecutionError> {
    let mut stream = std::pin::pin!(stream);
    let mut rows = vec![];

    while let Some(row) = stream.next().await {
        let row = row?;

        if rows.len() == max_rows {
            return Ok((rows, true));
        }

        rows.push(convert(row)?);
    }

    Ok((rows, false))
}

fn map_query_error(error: tokio_postgres::Error, timeout: Duration) -> ExecutionError {
    if error.is_closed() {
        return ExecutionError::ConnectionError(DatabaseError::Delegate(error));
    }

    match error.as_db_error() {
        // Raised by `statement_timeout`
        Some(db_error) if *db_error.code() == SqlState::QUERY_CANCELED => {
            ExecutionError::TimedOut(timeout)
        }
        Some(db_error) => ExecutionError::QueryFailed(db_error.message().to_string()),
        None => ExecutionError::QueryFailed(error.to_string()),
    }
}
