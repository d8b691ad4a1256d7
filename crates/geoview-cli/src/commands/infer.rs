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
use geoview_sql::{GeometryInference, Validator, config::GeoviewConfig};

use super::{
    command::{CommandDefinition, database_arg, definition_arg, param_arg, sql_arg, timeout_arg},
    util::{CONNECTION_ID, execute_options, load_statement, open_executor, print_json},
};

pub(crate) struct InferCommandDefinition {}

#[async_trait]
impl CommandDefinition for InferCommandDefinition {
    fn command(&self) -> Command {
        Command::new("infer")
            .about("Find the geometry column, type and SRID of a statement's result")
            .arg(definition_arg().required_unless_present("sql"))
            .arg(sql_arg())
            .arg(param_arg())
            .arg(database_arg())
            .arg(timeout_arg())
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let validator = Validator::new(config.policy.clone());
        let statement = validator.validate_statement(load_statement(matches)?)?;

        let inference = GeometryInference::new(open_executor(matches, config)?, validator);
        let metadata = inference
            .infer(CONNECTION_ID, &statement, &execute_options(matches, config))
            .await?;

        print_json(&metadata)
    }
}
