// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::Result;
use geoview_sql::{config::GeoviewConfig, env::SystemEnvironment};

use commands::{
    command::{CommandDefinition, SubcommandDefinition},
    compile::CompileCommandDefinition,
    infer::InferCommandDefinition,
    publish::{PublishCommandDefinition, UnpublishCommandDefinition},
    query,
    run::RunCommandDefinition,
    validate::ValidateCommandDefinition,
};

mod commands;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let subcommand_definition = SubcommandDefinition::new(
        "geoview",
        "Build, validate, run and publish PostGIS queries",
        vec![
            Box::new(CompileCommandDefinition {}),
            Box::new(ValidateCommandDefinition {}),
            Box::new(RunCommandDefinition {}),
            Box::new(InferCommandDefinition {}),
            Box::new(PublishCommandDefinition {}),
            Box::new(UnpublishCommandDefinition {}),
            Box::new(query::command_definition()),
        ],
    );

    let command = subcommand_definition
        .command()
        .version(env!("CARGO_PKG_VERSION"));

    let matches = command.get_matches();

    let config = GeoviewConfig::from_env(&SystemEnvironment)?;

    subcommand_definition.execute(&matches, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_is_well_formed() {
        let definition = SubcommandDefinition::new(
            "geoview",
            "",
            vec![
                Box::new(CompileCommandDefinition {}),
                Box::new(ValidateCommandDefinition {}),
                Box::new(RunCommandDefinition {}),
                Box::new(InferCommandDefinition {}),
                Box::new(PublishCommandDefinition {}),
                Box::new(UnpublishCommandDefinition {}),
                Box::new(query::command_definition()),
            ],
        );

        definition.command().debug_assert();
    }

    #[test]
    fn publish_requires_complete_geometry() {
        let command = PublishCommandDefinition {}.command();

        let matches = command.clone().try_get_matches_from([
            "publish",
            "--sql",
            "SELECT * FROM roads",
            "--workspace",
            "atlas",
            "--datastore",
            "postgis",
            "--name",
            "roads",
            "--geometry-column",
            "geom",
            "--geometry-type",
            "LineString",
            "--srid",
            "3857",
        ]);
        assert!(matches.is_ok());

        let incomplete = command.try_get_matches_from([
            "publish",
            "--sql",
            "SELECT * FROM roads",
            "--workspace",
            "atlas",
            "--datastore",
            "postgis",
            "--name",
            "roads",
            "--geometry-column",
            "geom",
        ]);
        assert!(incomplete.is_err());
    }
}
