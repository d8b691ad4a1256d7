// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::{Result, bail};
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use colored::Colorize;
use geoview_sql::{Validator, config::GeoviewConfig, validator::Outcome};

use super::{
    command::{CommandDefinition, definition_arg, param_arg, sql_arg},
    util::{load_statement, print_json},
};

pub(crate) struct ValidateCommandDefinition {}

#[async_trait]
impl CommandDefinition for ValidateCommandDefinition {
    fn command(&self) -> Command {
        Command::new("validate")
            .about("Check that SQL is a safe, read-only statement")
            .arg(definition_arg().required_unless_present("sql"))
            .arg(sql_arg())
            .arg(param_arg())
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let statement = load_statement(matches)?;
        let verdict = Validator::new(config.policy.clone())
            .validate(&statement.sql, Some(statement.parameters.as_slice()));

        print_json(&verdict)?;

        match verdict.outcome {
            Outcome::Accept => eprintln!("{}", "Accepted".green()),
            Outcome::Rewrite => eprintln!("{}", "Accepted after rewriting".yellow()),
            Outcome::Reject => bail!("Rejected"),
        }

        Ok(())
    }
}
