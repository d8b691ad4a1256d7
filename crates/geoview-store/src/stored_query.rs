// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Utc};
use geoview_sql::QueryDefinition;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Names are unique per relation: the same name may be used for queries over different tables
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub schema: String,
    pub table: String,
    pub name: String,
}

impl QueryKey {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
        }
    }

    pub fn of(definition: &QueryDefinition) -> Result<Self, StoreError> {
        match definition.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(Self::new(
                definition.schema.clone(),
                definition.table.clone(),
                name,
            )),
            _ => Err(StoreError::Unnamed),
        }
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}/{}", self.schema, self.table, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuery {
    pub key: QueryKey,
    pub definition: QueryDefinition,
    /// Starts at 1 and grows with every overwrite
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

/// The stored queries of one store, in key order
#[derive(Debug, Clone, Default)]
pub(crate) struct Queries(BTreeMap<QueryKey, StoredQuery>);

impl Queries {
    pub(crate) fn from_list(queries: Vec<StoredQuery>) -> Self {
        Self(
            queries
                .into_iter()
                .map(|query| (query.key.clone(), query))
                .collect(),
        )
    }

    pub(crate) fn to_list(&self) -> Vec<StoredQuery> {
        self.0.values().cloned().collect()
    }

    /// Insert or overwrite (last write wins)
    pub(crate) fn save(&mut self, definition: QueryDefinition) -> Result<StoredQuery, StoreError> {
        let key = QueryKey::of(&definition)?;
        let revision = self.0.get(&key).map_or(1, |existing| existing.revision + 1);

        let stored = StoredQuery {
            key: key.clone(),
            definition,
            revision,
            saved_at: Utc::now(),
        };
        self.0.insert(key, stored.clone());

        Ok(stored)
    }

    pub(crate) fn list(&self, schema: Option<&str>) -> Vec<StoredQuery> {
        self.0
            .values()
            .filter(|query| schema.is_none_or(|schema| query.key.schema == schema))
            .cloned()
            .collect()
    }

    pub(crate) fn get(&self, key: &QueryKey) -> Option<StoredQuery> {
        self.0.get(key).cloned()
    }

    pub(crate) fn delete(&mut self, key: &QueryKey) -> bool {
        self.0.remove(key).is_some()
    }
}
