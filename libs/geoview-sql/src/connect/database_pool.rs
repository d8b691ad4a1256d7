// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::str::FromStr;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config, NoTls};

use crate::database_error::DatabaseError;

use super::database_client::DatabaseClient;

pub const DEFAULT_POOL_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

impl TransactionMode {
    pub fn update_config(self, config: &mut Config) {
        tracing::debug!("Setting database transaction mode to {:?}", self);
        if self == TransactionMode::ReadOnly {
            let read_only_options = "-c default_transaction_read_only=on";
            match config.get_options() {
                Some(options) => {
                    config.options(format!("{options} {read_only_options}"));
                }
                None => {
                    config.options(read_only_options);
                }
            }
        }
    }
}

/// A pool of connections to one database. Connections are opened lazily, so creating a pool never
/// touches the network.
pub struct DatabasePool {
    pool: Pool,
}

impl DatabasePool {
    pub fn from_db_url(
        url: &str,
        pool_size: usize,
        transaction_mode: TransactionMode,
    ) -> Result<Self, DatabaseError> {
        let mut config = Config::from_str(url).map_err(|e| {
            DatabaseError::Delegate(e)
                .with_context("Failed to parse PostgreSQL connection string".into())
        })?;
        transaction_mode.update_config(&mut config);

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = Manager::from_config(config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(pool_size)
            .build()
            .map_err(|e| DatabaseError::Config(format!("Failed to create DB pool: {e}")))?;

        Ok(Self { pool })
    }

    pub async fn get_client(&self) -> Result<DatabaseClient, DatabaseError> {
        Ok(DatabaseClient(self.pool.get().await?))
    }

    pub fn max_size(&self) -> usize {
        self.pool.status().max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_option_is_appended() {
        let mut config = Config::from_str("postgres://localhost/db?options=-c%20search_path%3Dgeo")
            .unwrap();
        TransactionMode::ReadOnly.update_config(&mut config);

        assert_eq!(
            config.get_options(),
            Some("-c search_path=geo -c default_transaction_read_only=on")
        );
    }

    #[test]
    fn pool_creation_is_lazy() {
        let pool =
            DatabasePool::from_db_url("postgres://nobody@127.0.0.1:1/none", 3, TransactionMode::ReadOnly)
                .unwrap();
        assert_eq!(pool.max_size(), 3);

        assert!(
            DatabasePool::from_db_url("not a url", 3, TransactionMode::ReadOnly).is_err()
        );
    }
}
