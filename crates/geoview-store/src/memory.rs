// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::{Mutex, MutexGuard};

use geoview_sql::QueryDefinition;

use crate::{QueryKey, QueryStore, StoreError, StoredQuery, stored_query::Queries};

#[derive(Debug, Default)]
pub struct MemoryQueryStore {
    queries: Mutex<Queries>,
}

impl MemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn queries(&self) -> MutexGuard<'_, Queries> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl QueryStore for MemoryQueryStore {
    fn save(&self, definition: QueryDefinition) -> Result<StoredQuery, StoreError> {
        self.queries().save(definition)
    }

    fn list(&self, schema: Option<&str>) -> Result<Vec<StoredQuery>, StoreError> {
        Ok(self.queries().list(schema))
    }

    fn get(&self, key: &QueryKey) -> Result<Option<StoredQuery>, StoreError> {
        Ok(self.queries().get(key))
    }

    fn delete(&self, key: &QueryKey) -> Result<bool, StoreError> {
        Ok(self.queries().delete(key))
    }
}
