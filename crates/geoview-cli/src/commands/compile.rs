// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use geoview_sql::{compile, config::GeoviewConfig};

use super::{
    command::{CommandDefinition, definition_arg, get_required},
    util::{print_json, read_definition},
};

pub(crate) struct CompileCommandDefinition {}

#[async_trait]
impl CommandDefinition for CompileCommandDefinition {
    fn command(&self) -> Command {
        Command::new("compile")
            .about("Compile a query definition into SQL with bound parameters")
            .arg(definition_arg().required(true))
    }

    async fn execute(&self, matches: &ArgMatches, _config: &GeoviewConfig) -> Result<()> {
        let path: PathBuf = get_required(matches, "definition")?;
        let statement = compile(&read_definition(&path)?)?;

        print_json(&statement)
    }
}
