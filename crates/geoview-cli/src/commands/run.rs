// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::Result;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use colored::Colorize;
use geoview_sql::{Validator, config::GeoviewConfig};

use super::{
    command::{
        CommandDefinition, database_arg, definition_arg, max_rows_arg, param_arg, sql_arg,
        timeout_arg,
    },
    util::{CONNECTION_ID, execute_options, load_statement, open_executor, print_json},
};

pub(crate) struct RunCommandDefinition {}

#[async_trait]
impl CommandDefinition for RunCommandDefinition {
    fn command(&self) -> Command {
        Command::new("run")
            .about("Validate and execute a statement, printing the rows as JSON")
            .arg(definition_arg().required_unless_present("sql"))
            .arg(sql_arg())
            .arg(param_arg())
            .arg(database_arg())
            .arg(max_rows_arg())
            .arg(timeout_arg())
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let statement = Validator::new(config.policy.clone())
            .validate_statement(load_statement(matches)?)?;
        let executor = open_executor(matches, config)?;
        let options = execute_options(matches, config);

        let cancel = options.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let result = executor
            .execute(CONNECTION_ID, &statement, &options)
            .await?;

        print_json(&result)?;
        if result.truncated {
            eprintln!(
                "{}",
                format!("Result truncated to {} rows", options.max_rows).yellow()
            );
        }

        Ok(())
    }
}
