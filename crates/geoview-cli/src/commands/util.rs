// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::ArgMatches;
use geoview_sql::{
    CompiledStatement, ExecuteOptions, QueryDefinition, QueryExecutor, SqlValue, compile,
    config::GeoviewConfig,
    connect::{DatabasePool, PoolRegistry, TransactionMode},
};
use geoview_store::FileQueryStore;
use serde::Serialize;

use super::command::get;

/// The single connection the CLI registers
pub(super) const CONNECTION_ID: &str = "default";

const DEFAULT_QUERY_STORE: &str = "geoview-queries.json";

pub(super) fn read_definition(path: &PathBuf) -> Result<QueryDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid query definition", path.display()))
}

/// The statement named on the command line: `--sql` with its `--param`s, or a compiled definition
pub(super) fn load_statement(matches: &ArgMatches) -> Result<CompiledStatement> {
    match get::<String>(matches, "sql") {
        Some(sql) => {
            let parameters = matches
                .get_many::<String>("param")
                .map(|values| values.map(|value| parse_param(value)).collect())
                .unwrap_or_default();
            Ok(CompiledStatement::from_text(sql, parameters))
        }
        None => {
            let path: PathBuf = super::command::get_required(matches, "definition")?;
            Ok(compile(&read_definition(&path)?)?)
        }
    }
}

/// Command-line values are untyped: take the narrowest reading
pub(super) fn parse_param(value: &str) -> SqlValue {
    if let Ok(int) = value.parse() {
        return SqlValue::Int(int);
    }

    match value.parse::<f64>() {
        Ok(float) if float.is_finite() => SqlValue::Float(float),
        _ => match value.parse() {
            Ok(bool) => SqlValue::Bool(bool),
            Err(_) => SqlValue::Text(value.to_string()),
        },
    }
}

pub(super) fn open_executor(matches: &ArgMatches, config: &GeoviewConfig) -> Result<QueryExecutor> {
    let url = match get::<String>(matches, "database") {
        Some(url) => url,
        None => config.postgres_url()?.to_string(),
    };

    let registry = PoolRegistry::new();
    registry.register(
        CONNECTION_ID,
        DatabasePool::from_db_url(&url, config.pool_size, TransactionMode::ReadOnly)?,
    );

    Ok(QueryExecutor::new(Arc::new(registry)))
}

/// Execution options from the configuration, overridden by `--max-rows` and `--timeout-ms`
pub(super) fn execute_options(matches: &ArgMatches, config: &GeoviewConfig) -> ExecuteOptions {
    let defaults = config.execute_options();

    ExecuteOptions {
        max_rows: get(matches, "max-rows").unwrap_or(defaults.max_rows),
        timeout: get(matches, "timeout-ms")
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout),
        ..defaults
    }
}

pub(super) fn query_store(config: &GeoviewConfig) -> FileQueryStore {
    FileQueryStore::new(
        config
            .query_store
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_QUERY_STORE)),
    )
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
