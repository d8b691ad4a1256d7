// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use anyhow::{Result, bail};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use colored::Colorize;
use geoview_sql::{config::GeoviewConfig, query::DEFAULT_SCHEMA};
use geoview_store::{QueryKey, QueryStore};

use super::{
    command::{CommandDefinition, SubcommandDefinition, definition_arg, get, get_required},
    util::{print_json, query_store, read_definition},
};

pub fn command_definition() -> SubcommandDefinition {
    SubcommandDefinition::new(
        "query",
        "Save, list and delete query definitions",
        vec![
            Box::new(SaveCommandDefinition {}),
            Box::new(ListCommandDefinition {}),
            Box::new(DeleteCommandDefinition {}),
        ],
    )
}

fn schema_arg() -> Arg {
    Arg::new("schema")
        .help("Schema of the query's table")
        .long("schema")
        .num_args(1)
}

struct SaveCommandDefinition {}

#[async_trait]
impl CommandDefinition for SaveCommandDefinition {
    fn command(&self) -> Command {
        Command::new("save")
            .about("Save a query definition, replacing one with the same name and table")
            .arg(definition_arg().required(true))
            .arg(
                Arg::new("name")
                    .help("Name to save under, instead of the definition's own")
                    .long("name")
                    .num_args(1),
            )
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let path: PathBuf = get_required(matches, "definition")?;
        let mut definition = read_definition(&path)?;
        if let Some(name) = get::<String>(matches, "name") {
            definition.name = Some(name);
        }

        // Refuse to store what can't be compiled
        geoview_sql::compile(&definition)?;

        let stored = query_store(config).save(definition)?;
        eprintln!(
            "{}",
            format!("Saved {} (revision {})", stored.key, stored.revision).green()
        );
        Ok(())
    }
}

struct ListCommandDefinition {}

#[async_trait]
impl CommandDefinition for ListCommandDefinition {
    fn command(&self) -> Command {
        Command::new("list")
            .about("List saved queries")
            .arg(schema_arg())
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let schema: Option<String> = get(matches, "schema");
        let queries = query_store(config).list(schema.as_deref())?;

        print_json(&queries)
    }
}

struct DeleteCommandDefinition {}

#[async_trait]
impl CommandDefinition for DeleteCommandDefinition {
    fn command(&self) -> Command {
        Command::new("delete")
            .about("Delete a saved query")
            .arg(
                Arg::new("name")
                    .help("Name of the query")
                    .required(true)
                    .index(1),
            )
            .arg(
                Arg::new("table")
                    .help("Table of the query")
                    .long("table")
                    .required(true),
            )
            .arg(schema_arg())
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let key = QueryKey::new(
            get(matches, "schema").unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            get_required::<String>(matches, "table")?,
            get_required::<String>(matches, "name")?,
        );

        if !query_store(config).delete(&key)? {
            bail!("No saved query {key}");
        }

        eprintln!("{}", format!("Deleted {key}").green());
        Ok(())
    }
}
