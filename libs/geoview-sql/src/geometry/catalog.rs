// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use tokio_postgres::Client;

use crate::{compiler::RelationRef, database_error::DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: String,
    /// The type as `format_type` reports it, such as `geometry(Point,4326)`
    pub declared_type: String,
}

/// Declared column types, by relation
pub trait ColumnCatalog: Send + Sync {
    /// The relation's columns in declaration order, or `None` if the relation is unknown
    fn columns(&self, relation: &RelationRef) -> Option<&[CatalogColumn]>;

    fn declared_type(&self, relation: &RelationRef, column: &str) -> Option<&str> {
        self.columns(relation)?
            .iter()
            .find(|candidate| candidate.name == column)
            .map(|candidate| candidate.declared_type.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    relations: HashMap<RelationRef, Vec<CatalogColumn>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relation: RelationRef, columns: Vec<CatalogColumn>) {
        self.relations.insert(relation, columns);
    }

    /// Builder-style [`StaticCatalog::insert`] taking `(name, declared type)` pairs
    pub fn with_relation<'a>(
        mut self,
        schema: &str,
        table: &str,
        columns: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.insert(
            RelationRef {
                schema: schema.to_string(),
                table: table.to_string(),
            },
            columns
                .into_iter()
                .map(|(name, declared_type)| CatalogColumn {
                    name: name.to_string(),
                    declared_type: declared_type.to_string(),
                })
                .collect(),
        );
        self
    }
}

impl ColumnCatalog for StaticCatalog {
    fn columns(&self, relation: &RelationRef) -> Option<&[CatalogColumn]> {
        self.relations.get(relation).map(Vec::as_slice)
    }
}

/// Read the declared column types of the given relations from `pg_attribute`. Relations that
/// don't exist are left out of the catalog.
pub async fn load_catalog(
    client: &Client,
    relations: &[RelationRef],
) -> Result<StaticCatalog, DatabaseError> {
    let query = "
        SELECT a.attname::text AS name, format_type(a.atttypid, a.atttypmod) AS format_type
        FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
        ORDER BY a.attnum";

    let mut catalog = StaticCatalog::new();

    for relation in relations {
        let rows = client
            .query(query, &[&relation.schema, &relation.table])
            .await
            .map_err(|e| {
                DatabaseError::Delegate(e).with_context(format!(
                    "Failed to read columns of {}.{}",
                    relation.schema, relation.table
                ))
            })?;

        if rows.is_empty() {
            continue;
        }

        let columns = rows
            .iter()
            .map(|row| {
                Ok(CatalogColumn {
                    name: row.try_get("name")?,
                    declared_type: row.try_get("format_type")?,
                })
            })
            .collect::<Result<Vec<_>, tokio_postgres::Error>>()?;

        catalog.insert(relation.clone(), columns);
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_type_lookup() {
        let catalog = StaticCatalog::new().with_relation(
            "public",
            "countries",
            [("name", "text"), ("geom", "geometry(MultiPolygon,4326)")],
        );
        let countries = RelationRef {
            schema: "public".into(),
            table: "countries".into(),
        };

        assert_eq!(
            catalog.declared_type(&countries, "geom"),
            Some("geometry(MultiPolygon,4326)")
        );
        assert_eq!(catalog.declared_type(&countries, "area"), None);
        assert!(
            catalog
                .columns(&RelationRef {
                    schema: "public".into(),
                    table: "rivers".into()
                })
                .is_none()
        );
    }
}
