// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches, Command};
use geoview_sql::config::GeoviewConfig;

#[async_trait]
pub trait CommandDefinition: Send + Sync {
    fn command(&self) -> Command;

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()>;
}

pub struct SubcommandDefinition {
    pub name: &'static str,
    pub about: &'static str,
    pub command_definitions: Vec<Box<dyn CommandDefinition>>,
}

impl SubcommandDefinition {
    pub fn new(
        name: &'static str,
        about: &'static str,
        command_definitions: Vec<Box<dyn CommandDefinition>>,
    ) -> Self {
        Self {
            name,
            about,
            command_definitions,
        }
    }
}

#[async_trait]
impl CommandDefinition for SubcommandDefinition {
    fn command(&self) -> Command {
        Command::new(self.name)
            .about(self.about)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .disable_help_subcommand(true)
            .subcommands(
                self.command_definitions
                    .iter()
                    .map(|command_definition| command_definition.command()),
            )
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| anyhow!("A subcommand is required"))?;

        for command_definition in &self.command_definitions {
            if command_definition.command().get_name() == name {
                return command_definition.execute(sub_matches, config).await;
            }
        }

        Err(anyhow!("Unknown subcommand: {}", name))
    }
}

pub fn get_required<T: Clone + Send + Sync + 'static>(
    matches: &ArgMatches,
    arg_id: &str,
) -> Result<T> {
    get(matches, arg_id).ok_or_else(|| anyhow!("Required argument `{}` is not present", arg_id))
}

pub fn get<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, arg_id: &str) -> Option<T> {
    matches.get_one::<T>(arg_id).cloned()
}

pub fn definition_arg() -> Arg {
    Arg::new("definition")
        .help("Path to a query definition (JSON)")
        .value_parser(clap::value_parser!(PathBuf))
        .index(1)
}

pub fn sql_arg() -> Arg {
    Arg::new("sql")
        .help("SQL text to use instead of a query definition")
        .long("sql")
        .conflicts_with("definition")
        .num_args(1)
}

pub fn param_arg() -> Arg {
    Arg::new("param")
        .help("Value for the next `$n` placeholder of --sql. Repeat for each placeholder.")
        .long("param")
        .requires("sql")
        .action(ArgAction::Append)
        .num_args(1)
}

pub fn database_arg() -> Arg {
    Arg::new("database")
        .help("The PostgreSQL connection string to use. If not specified, it is read from the environment (`GEOVIEW_POSTGRES_URL`).")
        .long("database")
        .required(false)
}

pub fn max_rows_arg() -> Arg {
    Arg::new("max-rows")
        .help("Maximum number of rows to return (default: `GEOVIEW_MAX_ROWS` or 10000)")
        .long("max-rows")
        .value_parser(clap::value_parser!(usize))
        .num_args(1)
}

pub fn timeout_arg() -> Arg {
    Arg::new("timeout-ms")
        .help("Statement timeout in milliseconds (default: `GEOVIEW_STATEMENT_TIMEOUT_MS` or 30000)")
        .long("timeout-ms")
        .value_parser(clap::value_parser!(u64))
        .num_args(1)
}

/// `--workspace`, `--datastore` and `--name` of a published view
pub fn view_identity_args() -> [Arg; 3] {
    [
        Arg::new("workspace")
            .help("GeoServer workspace")
            .long("workspace")
            .required(true),
        Arg::new("datastore")
            .help("GeoServer datastore connected to the database")
            .long("datastore")
            .required(true),
        Arg::new("name")
            .help("Layer name")
            .long("name")
            .required(true),
    ]
}
