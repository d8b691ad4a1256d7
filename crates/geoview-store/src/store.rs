// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use geoview_sql::QueryDefinition;

use crate::{QueryKey, StoreError, StoredQuery};

/// Persistence for query definitions. The definition is stored, never the SQL compiled from it.
pub trait QueryStore: Send + Sync {
    /// Save a named definition, replacing any query with the same key
    fn save(&self, definition: QueryDefinition) -> Result<StoredQuery, StoreError>;

    /// All queries, or those over relations in `schema`
    fn list(&self, schema: Option<&str>) -> Result<Vec<StoredQuery>, StoreError>;

    fn get(&self, key: &QueryKey) -> Result<Option<StoredQuery>, StoreError>;

    /// Returns whether a query was removed
    fn delete(&self, key: &QueryKey) -> Result<bool, StoreError>;
}
