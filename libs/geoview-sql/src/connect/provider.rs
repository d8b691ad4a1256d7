// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::database_error::DatabaseError;

use super::{database_client::DatabaseClient, database_pool::DatabasePool};

/// Hands out live database clients by connection id
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn client(&self, connection_id: &str) -> Result<DatabaseClient, DatabaseError>;
}

/// Connection pools keyed by connection id
#[derive(Default)]
pub struct PoolRegistry {
    pools: DashMap<String, Arc<DatabasePool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool, replacing any pool previously registered under the same id
    pub fn register(&self, connection_id: impl Into<String>, pool: DatabasePool) {
        self.pools.insert(connection_id.into(), Arc::new(pool));
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.pools.contains_key(connection_id)
    }
}

#[async_trait]
impl ConnectionProvider for PoolRegistry {
    async fn client(&self, connection_id: &str) -> Result<DatabaseClient, DatabaseError> {
        // Don't hold the map guard across the await
        let pool = self
            .pools
            .get(connection_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DatabaseError::UnknownConnection(connection_id.to_string()))?;

        pool.get_client().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::TransactionMode;

    #[tokio::test]
    async fn unknown_connection() {
        let registry = PoolRegistry::new();
        registry.register(
            "main",
            DatabasePool::from_db_url("postgres://localhost/gis", 1, TransactionMode::ReadOnly)
                .unwrap(),
        );

        assert!(registry.contains("main"));
        assert!(matches!(
            registry.client("other").await,
            Err(DatabaseError::UnknownConnection(id)) if id == "other"
        ));
    }
}
