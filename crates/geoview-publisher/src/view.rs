// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use geoview_sql::{GeometryMetadata, ValidatedStatement, sanitize_identifier};
use serde::{Deserialize, Serialize};

use crate::{
    PublishError,
    parameters::{ViewParameter, parameterize},
};

/// Where a view lives on the serving component
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewIdentity {
    pub workspace: String,
    pub datastore: String,
    /// The layer name
    pub name: String,
}

impl ViewIdentity {
    pub fn new(
        workspace: impl Into<String>,
        datastore: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let identity = Self {
            workspace: workspace.into(),
            datastore: datastore.into(),
            name: name.into(),
        };

        for part in [&identity.workspace, &identity.datastore, &identity.name] {
            // Quoted names would need escaping in REST paths and layer references
            if part.starts_with('"') || sanitize_identifier(part).is_none() {
                return Err(PublishError::InvalidView(format!(
                    "'{part}' is not a valid workspace, datastore or layer name"
                )));
            }
        }

        Ok(identity)
    }

    /// The qualified layer name, `workspace:name`
    pub fn layer_name(&self) -> String {
        format!("{}:{}", self.workspace, self.name)
    }
}

impl Display for ViewIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.workspace, self.datastore, self.name)
    }
}

/// A SQL view as the serving component stores it.
///
/// Built from a [`ValidatedStatement`] only, so the SQL a view serves has always passed the
/// validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedView {
    identity: ViewIdentity,
    /// SQL with `%pN%` parameter references in place of bound values
    sql: String,
    parameters: Vec<ViewParameter>,
    geometry: GeometryMetadata,
    /// Column the serving component uses as the feature id
    #[serde(skip_serializing_if = "Option::is_none")]
    key_column: Option<String>,
}

impl PublishedView {
    pub fn new(
        identity: ViewIdentity,
        statement: &ValidatedStatement,
        geometry: Option<GeometryMetadata>,
    ) -> Result<Self, PublishError> {
        let geometry = geometry.ok_or(PublishError::MissingGeometry)?;
        let (sql, parameters) = parameterize(statement.sql(), statement.parameters())?;

        Ok(Self {
            identity,
            sql,
            parameters,
            geometry,
            key_column: None,
        })
    }

    /// A view as read back from the serving component
    pub(crate) fn from_remote(
        identity: ViewIdentity,
        sql: String,
        parameters: Vec<ViewParameter>,
        geometry: GeometryMetadata,
        key_column: Option<String>,
    ) -> Self {
        Self {
            identity,
            sql,
            parameters,
            geometry,
            key_column,
        }
    }

    pub fn identity(&self) -> &ViewIdentity {
        &self.identity
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[ViewParameter] {
        &self.parameters
    }

    pub fn geometry(&self) -> &GeometryMetadata {
        &self.geometry
    }

    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }

    pub fn with_key_column(self, key_column: Option<String>) -> Self {
        Self { key_column, ..self }
    }

    /// Whether republishing `other` would change nothing. The server may reformat surrounding
    /// whitespace.
    pub fn same_definition(&self, other: &PublishedView) -> bool {
        self.identity == other.identity
            && self.sql.trim() == other.sql.trim()
            && self.parameters == other.parameters
            && self.geometry == other.geometry
            && self.key_column == other.key_column
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoints {
    pub layer: String,
    pub wms_endpoint: String,
    pub wfs_endpoint: String,
}

#[cfg(test)]
mod tests {
    use geoview_sql::{CompiledStatement, GeometryType, SqlValue, Validator};

    use super::*;

    fn geometry() -> GeometryMetadata {
        GeometryMetadata {
            column: "geom".into(),
            geometry_type: GeometryType::MultiPolygon,
            srid: 4326,
        }
    }

    #[test]
    fn identity_names() {
        let identity = ViewIdentity::new("atlas", "postgis", "countries").unwrap();
        assert_eq!(identity.layer_name(), "atlas:countries");

        assert!(ViewIdentity::new("atlas", "postgis", "../countries").is_err());
        assert!(ViewIdentity::new("atlas", "\"postgis\"", "countries").is_err());
    }

    #[test]
    fn view_from_statement() {
        let statement = Validator::default()
            .validate_statement(CompiledStatement::from_text(
                r#"SELECT "name", "geom" FROM "public"."countries" WHERE "population" > $1"#,
                vec![SqlValue::Int(1_000_000)],
            ))
            .unwrap();
        let identity = ViewIdentity::new("atlas", "postgis", "big_countries").unwrap();

        let view = PublishedView::new(identity.clone(), &statement, Some(geometry())).unwrap();
        assert_eq!(
            view.sql,
            r#"SELECT "name", "geom" FROM "public"."countries" WHERE "population" > (%p1%) LIMIT 1000"#
        );
        assert_eq!(view.parameters[0].default_value, "1000000");

        let mut reformatted = view.clone();
        reformatted.sql = format!("{}\n", view.sql);
        assert!(view.same_definition(&reformatted));

        assert!(matches!(
            PublishedView::new(identity, &statement, None),
            Err(PublishError::MissingGeometry)
        ));
    }

    #[test]
    fn views_serve_the_validated_sql() {
        // The validator's rewrite, not the submitted text, is what gets published
        let statement = Validator::default()
            .validate_statement(CompiledStatement::from_text(
                r#"SELECT "geom" FROM "public"."rivers""#,
                vec![],
            ))
            .unwrap();
        let identity = ViewIdentity::new("atlas", "postgis", "rivers").unwrap();

        let view = PublishedView::new(identity, &statement, Some(geometry()))
            .unwrap()
            .with_key_column(Some("id".into()));

        assert_eq!(view.sql(), r#"SELECT "geom" FROM "public"."rivers" LIMIT 1000"#);
        assert!(view.parameters().is_empty());
        assert_eq!(view.key_column(), Some("id"));
        assert_eq!(view.identity().layer_name(), "atlas:rivers");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["keyColumn"], "id");
        assert_eq!(json["geometry"]["srid"], 4326);
    }
}
