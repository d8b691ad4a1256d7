// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use geoview_publisher::{GeoServerClient, PublishedView, ViewIdentity, ViewPublisher};
use geoview_sql::{
    GeometryInference, GeometryMetadata, GeometryType, ValidatedStatement, Validator,
    config::GeoviewConfig,
};

use super::{
    command::{
        CommandDefinition, database_arg, definition_arg, get, get_required, param_arg, sql_arg,
        timeout_arg, view_identity_args,
    },
    util::{CONNECTION_ID, execute_options, load_statement, open_executor, print_json},
};

pub(crate) struct PublishCommandDefinition {}

#[async_trait]
impl CommandDefinition for PublishCommandDefinition {
    fn command(&self) -> Command {
        Command::new("publish")
            .about("Publish a statement as a GeoServer SQL view layer")
            .arg(definition_arg().required_unless_present("sql"))
            .arg(sql_arg())
            .arg(param_arg())
            .args(view_identity_args())
            .arg(
                Arg::new("update")
                    .help("Replace the definition of an existing layer")
                    .long("update")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("geometry-column")
                    .help("Geometry column. Without it, the geometry is inferred from the database.")
                    .long("geometry-column")
                    .requires("geometry-type")
                    .requires("srid"),
            )
            .arg(
                Arg::new("geometry-type")
                    .help("Geometry type, such as MultiPolygon")
                    .long("geometry-type")
                    .value_parser(clap::value_parser!(GeometryType))
                    .requires("geometry-column"),
            )
            .arg(
                Arg::new("srid")
                    .help("SRID of the geometry column")
                    .long("srid")
                    .value_parser(clap::value_parser!(i32))
                    .requires("geometry-column"),
            )
            .arg(
                Arg::new("key-column")
                    .help("Column GeoServer uses as the feature id")
                    .long("key-column")
                    .conflicts_with("update"),
            )
            .arg(database_arg())
            .arg(timeout_arg())
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let identity = view_identity(matches)?;
        let validator = Validator::new(config.policy.clone());
        let statement = validator.validate_statement(load_statement(matches)?)?;

        let geometry = match explicit_geometry(matches) {
            Some(geometry) => geometry,
            None => GeometryInference::new(open_executor(matches, config)?, validator)
                .infer(CONNECTION_ID, &statement, &execute_options(matches, config))
                .await
                .context("Supply --geometry-column, --geometry-type and --srid to publish without inference")?,
        };

        let publisher = publisher(config)?;
        let endpoints = if matches.get_flag("update") {
            publisher
                .update(&identity, &statement, Some(geometry))
                .await?
        } else {
            publisher
                .publish(
                    published_view(identity, &statement, geometry)?
                        .with_key_column(get(matches, "key-column")),
                )
                .await?
        };

        eprintln!("{}", format!("Published {}", endpoints.layer).green());
        print_json(&endpoints)
    }
}

pub(crate) struct UnpublishCommandDefinition {}

#[async_trait]
impl CommandDefinition for UnpublishCommandDefinition {
    fn command(&self) -> Command {
        Command::new("unpublish")
            .about("Remove a published SQL view layer")
            .args(view_identity_args())
    }

    async fn execute(&self, matches: &ArgMatches, config: &GeoviewConfig) -> Result<()> {
        let identity = view_identity(matches)?;
        publisher(config)?.unpublish(&identity).await?;

        eprintln!("{}", format!("Unpublished {}", identity.layer_name()).green());
        Ok(())
    }
}

fn view_identity(matches: &ArgMatches) -> Result<ViewIdentity> {
    Ok(ViewIdentity::new(
        get_required::<String>(matches, "workspace")?,
        get_required::<String>(matches, "datastore")?,
        get_required::<String>(matches, "name")?,
    )?)
}

fn explicit_geometry(matches: &ArgMatches) -> Option<GeometryMetadata> {
    Some(GeometryMetadata {
        column: get(matches, "geometry-column")?,
        geometry_type: get(matches, "geometry-type")?,
        srid: get(matches, "srid")?,
    })
}

fn published_view(
    identity: ViewIdentity,
    statement: &ValidatedStatement,
    geometry: GeometryMetadata,
) -> Result<PublishedView> {
    Ok(PublishedView::new(identity, statement, Some(geometry))?)
}

fn publisher(config: &GeoviewConfig) -> Result<ViewPublisher> {
    let settings = config
        .geoserver
        .as_ref()
        .ok_or_else(|| anyhow!("GEOSERVER_URL must be set to publish views"))?;
    let client = GeoServerClient::new(&settings.url, &settings.user, &settings.password)?;

    Ok(ViewPublisher::new(Arc::new(client)))
}
