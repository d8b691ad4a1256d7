// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    compiler::{CompiledStatement, OutputColumn, RelationRef},
    executor::{CellValue, ExecuteOptions, QueryExecutor, ResultSet},
    query::AggregateFunction,
    validator::{ValidatedStatement, Validator},
};

use super::{
    ColumnCatalog, GeometryType,
    catalog::load_catalog,
    geometry_type::{DeclaredGeometry, parse_declared_type},
};

/// The geometry column of a result, as a map layer needs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryMetadata {
    pub column: String,
    pub geometry_type: GeometryType,
    pub srid: i32,
}

#[derive(Debug, Error, PartialEq)]
pub enum InferenceError {
    #[error("The result has no geometry column")]
    NoGeometryColumn,

    #[error("The result has several geometry columns: {}", .0.join(", "))]
    Ambiguous(Vec<String>),

    #[error("Unable to determine the SRID of column '{0}'")]
    UnknownSrid(String),

    #[error("No non-null value to sample in column '{0}'")]
    NoSampleValue(String),

    #[error("Probe query failed: {0}")]
    Probe(String),
}

impl InferenceError {
    pub fn code(&self) -> &'static str {
        match self {
            InferenceError::NoGeometryColumn => "NoGeometryColumn",
            InferenceError::Ambiguous(_) => "Ambiguous",
            InferenceError::UnknownSrid(_) => "UnknownSrid",
            InferenceError::NoSampleValue(_) => "NoSampleValue",
            InferenceError::Probe(_) => "Probe",
        }
    }
}

/// Column names conventionally used for geometries
pub fn is_geometry_like_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    matches!(
        name.as_str(),
        "geom" | "the_geom" | "geometry" | "wkb_geometry" | "shape"
    ) || name.ends_with("_geom")
}

/// A geometry column found in the output, with whatever the catalog tells about it
struct Candidate {
    column: String,
    declared: Option<(GeometryType, Option<i32>)>,
}

/// Infer the geometry column from declared column types, without touching the database.
///
/// Columns with a declared `geometry`/`geography` type win over columns that only have a
/// geometry-like name. A name-only match, or a declared type without SRID, reports
/// [`InferenceError::UnknownSrid`] so that the caller can sample the data instead.
pub fn infer_static(
    output_columns: &[OutputColumn],
    catalog: &dyn ColumnCatalog,
) -> Result<GeometryMetadata, InferenceError> {
    let mut declared = vec![];
    let mut named = vec![];

    for output_column in output_columns {
        match output_column {
            OutputColumn::Single {
                name,
                relation,
                column: Some(column),
                aggregate,
            } => {
                let declared_type = catalog.declared_type(relation, column);

                match declared_type.map(parse_declared_type) {
                    Some(Some(geometry)) => {
                        if let Some(output) = aggregated(geometry, *aggregate) {
                            declared.push(Candidate {
                                column: name.clone(),
                                declared: Some(output),
                            });
                        }
                    }
                    // A declared, non-spatial column
                    Some(None) => {}
                    None => {
                        if keeps_geometry(*aggregate)
                            && (is_geometry_like_name(column) || is_geometry_like_name(name))
                        {
                            named.push(Candidate {
                                column: name.clone(),
                                declared: None,
                            });
                        }
                    }
                }
            }
            OutputColumn::Single { column: None, .. } => {}
            OutputColumn::AllOf { relation } => match catalog.columns(relation) {
                Some(columns) => {
                    for column in columns {
                        if let Some(geometry) = parse_declared_type(&column.declared_type) {
                            declared.push(Candidate {
                                column: column.name.clone(),
                                declared: Some((geometry.geometry_type, geometry.srid)),
                            });
                        }
                    }
                }
                None => debug!(
                    "No catalog entry for {}.{}",
                    relation.schema, relation.table
                ),
            },
        }
    }

    let candidates = if declared.is_empty() { named } else { declared };

    match candidates.as_slice() {
        [] => Err(InferenceError::NoGeometryColumn),
        [
            Candidate {
                column,
                declared: Some((geometry_type, Some(srid))),
            },
        ] => Ok(GeometryMetadata {
            column: column.clone(),
            geometry_type: *geometry_type,
            srid: *srid,
        }),
        [Candidate { column, .. }] => Err(InferenceError::UnknownSrid(column.clone())),
        _ => Err(InferenceError::Ambiguous(
            candidates.iter().map(|c| c.column.clone()).collect(),
        )),
    }
}

fn keeps_geometry(aggregate: AggregateFunction) -> bool {
    matches!(
        aggregate,
        AggregateFunction::None
            | AggregateFunction::Min
            | AggregateFunction::Max
            | AggregateFunction::StUnion
            | AggregateFunction::StCollect
    )
}

/// The type and SRID an aggregate yields over a declared geometry column, or `None` if the
/// output isn't a geometry
fn aggregated(
    geometry: DeclaredGeometry,
    aggregate: AggregateFunction,
) -> Option<(GeometryType, Option<i32>)> {
    let DeclaredGeometry {
        geometry_type,
        srid,
        ..
    } = geometry;

    match aggregate {
        AggregateFunction::None | AggregateFunction::Min | AggregateFunction::Max => {
            Some((geometry_type, srid))
        }
        AggregateFunction::StUnion => Some((GeometryType::Geometry, srid)),
        AggregateFunction::StCollect => Some((geometry_type.collected(), srid)),
        // ST_Extent yields a box2d
        AggregateFunction::StExtent
        | AggregateFunction::Count
        | AggregateFunction::Sum
        | AggregateFunction::Avg => None,
    }
}

/// Infer the geometry column from the first row of a result. `hint` names the column to inspect
/// when the result has several spatial columns.
pub fn infer_from_sample(
    result: &ResultSet,
    hint: Option<&str>,
) -> Result<GeometryMetadata, InferenceError> {
    let spatial: Vec<&str> = result
        .columns
        .iter()
        .filter(|column| matches!(column.type_name.as_str(), "geometry" | "geography"))
        .map(|column| column.name.as_str())
        .collect();

    let column = match (hint, spatial.as_slice()) {
        (Some(hint), _) if spatial.contains(&hint) => hint,
        (_, []) => return Err(InferenceError::NoGeometryColumn),
        (_, [single]) => single,
        (_, several) => {
            return Err(InferenceError::Ambiguous(
                several.iter().map(|name| name.to_string()).collect(),
            ));
        }
    };

    let sample = result.rows.first().and_then(|row| row.get(column));

    match sample {
        Some(CellValue::Geometry(cell)) => match (cell.geometry_type, cell.srid) {
            (Some(geometry_type), Some(srid)) => Ok(GeometryMetadata {
                column: column.to_string(),
                geometry_type,
                srid,
            }),
            _ => Err(InferenceError::UnknownSrid(column.to_string())),
        },
        _ => Err(InferenceError::NoSampleValue(column.to_string())),
    }
}

/// Finds the geometry column of a validated statement: statically from the catalog when
/// possible, otherwise by running the statement for a single row.
pub struct GeometryInference {
    executor: QueryExecutor,
    validator: Validator,
}

impl GeometryInference {
    pub fn new(executor: QueryExecutor, validator: Validator) -> Self {
        Self {
            executor,
            validator,
        }
    }

    pub async fn infer(
        &self,
        connection_id: &str,
        statement: &ValidatedStatement,
        options: &ExecuteOptions,
    ) -> Result<GeometryMetadata, InferenceError> {
        let relations = output_relations(statement.output_columns());

        let static_result = if relations.is_empty() {
            Err(InferenceError::NoGeometryColumn)
        } else {
            let client = self
                .executor
                .provider()
                .client(connection_id)
                .await
                .map_err(|e| InferenceError::Probe(e.to_string()))?;
            let catalog = load_catalog(&client, &relations)
                .await
                .map_err(|e| InferenceError::Probe(e.to_string()))?;
            // Return the connection before probing
            drop(client);

            infer_static(statement.output_columns(), &catalog)
        };

        let hint = match static_result {
            Ok(metadata) => return Ok(metadata),
            Err(error @ InferenceError::Ambiguous(_)) => return Err(error),
            Err(InferenceError::UnknownSrid(column)) => Some(column),
            Err(_) => None,
        };

        debug!(?hint, "Falling back to sampling the geometry column");
        self.infer_dynamic(connection_id, statement, hint.as_deref(), options)
            .await
    }

    async fn infer_dynamic(
        &self,
        connection_id: &str,
        statement: &ValidatedStatement,
        hint: Option<&str>,
        options: &ExecuteOptions,
    ) -> Result<GeometryMetadata, InferenceError> {
        let probe = self
            .validator
            .validate_statement(CompiledStatement {
                sql: probe_sql(statement.sql()),
                parameters: statement.parameters().to_vec(),
                output_columns: statement.output_columns().to_vec(),
            })
            .map_err(|e| InferenceError::Probe(e.to_string()))?;

        let sample = self
            .executor
            .execute(
                connection_id,
                &probe,
                &ExecuteOptions {
                    max_rows: 1,
                    ..options.clone()
                },
            )
            .await
            .map_err(|e| InferenceError::Probe(e.to_string()))?;

        infer_from_sample(&sample, hint)
    }
}

fn probe_sql(sql: &str) -> String {
    format!(r#"SELECT * FROM ({sql}) AS "geoview_probe" LIMIT 1"#)
}

fn output_relations(output_columns: &[OutputColumn]) -> Vec<RelationRef> {
    let mut seen = HashSet::new();

    output_columns
        .iter()
        .map(|column| match column {
            OutputColumn::Single { relation, .. } | OutputColumn::AllOf { relation } => relation,
        })
        .filter(|relation| seen.insert(*relation))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::compile,
        executor::{ColumnMetadata, GeometryCell, ResultRow},
        geometry::StaticCatalog,
        query::{QueryDefinition, SelectColumn},
    };

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_relation(
                "public",
                "countries",
                [
                    ("name", "text"),
                    ("population", "bigint"),
                    ("geom", "geometry(MultiPolygon,4326)"),
                ],
            )
            .with_relation(
                "public",
                "rivers",
                [
                    ("name", "text"),
                    ("course", "geometry(LineString,3857)"),
                    ("source_geom", "geometry(Point,3857)"),
                ],
            )
            .with_relation(
                "public",
                "parcels",
                [("id", "integer"), ("geom", "geometry")],
            )
    }

    fn output_columns(definition: QueryDefinition) -> Vec<OutputColumn> {
        compile(&definition).unwrap().output_columns
    }

    fn definition(table: &str, columns: Vec<SelectColumn>) -> QueryDefinition {
        QueryDefinition {
            columns,
            ..QueryDefinition::new(table)
        }
    }

    #[test]
    fn declared_geometry_column() {
        let columns = output_columns(definition(
            "countries",
            vec![SelectColumn::plain("name"), SelectColumn::plain("geom")],
        ));

        assert_eq!(
            infer_static(&columns, &catalog()),
            Ok(GeometryMetadata {
                column: "geom".into(),
                geometry_type: GeometryType::MultiPolygon,
                srid: 4326,
            })
        );
    }

    #[test]
    fn wildcard_uses_catalog_columns() {
        let columns = output_columns(QueryDefinition::new("countries"));

        assert_eq!(
            infer_static(&columns, &catalog()).map(|m| m.column),
            Ok("geom".to_string())
        );

        let columns = output_columns(QueryDefinition::new("rivers"));
        assert_eq!(
            infer_static(&columns, &catalog()),
            Err(InferenceError::Ambiguous(vec![
                "course".into(),
                "source_geom".into()
            ]))
        );
    }

    #[test]
    fn aggregates_over_geometries() {
        let union = output_columns(QueryDefinition {
            group_by: vec!["name".into()],
            ..definition(
                "countries",
                vec![
                    SelectColumn::plain("name"),
                    SelectColumn::aggregated("geom", AggregateFunction::StUnion, Some("merged")),
                ],
            )
        });
        assert_eq!(
            infer_static(&union, &catalog()),
            Ok(GeometryMetadata {
                column: "merged".into(),
                geometry_type: GeometryType::Geometry,
                srid: 4326,
            })
        );

        let collect = output_columns(definition(
            "rivers",
            vec![SelectColumn::aggregated(
                "source_geom",
                AggregateFunction::StCollect,
                None,
            )],
        ));
        assert_eq!(
            infer_static(&collect, &catalog()),
            Ok(GeometryMetadata {
                column: "st_collect".into(),
                geometry_type: GeometryType::MultiPoint,
                srid: 3857,
            })
        );

        let extent = output_columns(definition(
            "countries",
            vec![SelectColumn::aggregated(
                "geom",
                AggregateFunction::StExtent,
                Some("bbox"),
            )],
        ));
        assert_eq!(
            infer_static(&extent, &catalog()),
            Err(InferenceError::NoGeometryColumn)
        );
    }

    #[test]
    fn missing_srid_needs_sampling() {
        let columns = output_columns(definition(
            "parcels",
            vec![SelectColumn::plain("id"), SelectColumn::plain("geom")],
        ));

        assert_eq!(
            infer_static(&columns, &catalog()),
            Err(InferenceError::UnknownSrid("geom".into()))
        );
    }

    #[test]
    fn geometry_like_names_without_catalog() {
        let columns = output_columns(definition(
            "roads",
            vec![SelectColumn::plain("id"), SelectColumn::plain("road_geom")],
        ));

        assert_eq!(
            infer_static(&columns, &StaticCatalog::new()),
            Err(InferenceError::UnknownSrid("road_geom".into()))
        );

        let columns = output_columns(definition("roads", vec![SelectColumn::plain("id")]));
        assert_eq!(
            infer_static(&columns, &StaticCatalog::new()),
            Err(InferenceError::NoGeometryColumn)
        );
    }

    #[test]
    fn geometry_names() {
        assert!(is_geometry_like_name("the_geom"));
        assert!(is_geometry_like_name("WKB_GEOMETRY"));
        assert!(is_geometry_like_name("centroid_geom"));
        assert!(!is_geometry_like_name("geomancy"));
    }

    fn sample(cell: CellValue) -> ResultSet {
        ResultSet {
            columns: vec![
                ColumnMetadata {
                    name: "id".into(),
                    type_name: "int4".into(),
                },
                ColumnMetadata {
                    name: "shape".into(),
                    type_name: "geometry".into(),
                },
            ],
            rows: vec![ResultRow {
                fields: vec![("id".into(), CellValue::Int(1)), ("shape".into(), cell)],
            }],
            truncated: false,
        }
    }

    #[test]
    fn sampled_geometry() {
        let result = sample(CellValue::Geometry(GeometryCell {
            geometry_type: Some(GeometryType::Polygon),
            srid: Some(2056),
            ewkb: vec![],
        }));

        assert_eq!(
            infer_from_sample(&result, None),
            Ok(GeometryMetadata {
                column: "shape".into(),
                geometry_type: GeometryType::Polygon,
                srid: 2056,
            })
        );
    }

    #[test]
    fn sampled_null_or_without_srid() {
        assert_eq!(
            infer_from_sample(&sample(CellValue::Null), None),
            Err(InferenceError::NoSampleValue("shape".into()))
        );

        let no_srid = sample(CellValue::Geometry(GeometryCell {
            geometry_type: Some(GeometryType::Point),
            srid: None,
            ewkb: vec![],
        }));
        assert_eq!(
            infer_from_sample(&no_srid, Some("shape")),
            Err(InferenceError::UnknownSrid("shape".into()))
        );
    }

    #[test]
    fn probe_wraps_statement() {
        assert_eq!(
            probe_sql("SELECT * FROM \"public\".\"countries\" LIMIT 1000"),
            r#"SELECT * FROM (SELECT * FROM "public"."countries" LIMIT 1000) AS "geoview_probe" LIMIT 1"#
        );
        assert!(
            !Validator::default()
                .validate(
                    &probe_sql("SELECT * FROM \"public\".\"countries\" LIMIT 1000"),
                    None
                )
                .is_rejected()
        );
    }
}
