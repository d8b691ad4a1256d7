// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{
    connect::DEFAULT_POOL_SIZE,
    env::{EnvError, Environment},
    executor::{DEFAULT_MAX_ROWS, DEFAULT_STATEMENT_TIMEOUT, ExecuteOptions},
    validator::{AllowList, ValidatorPolicy},
};

pub const POSTGRES_URL_PARAM: &str = "GEOVIEW_POSTGRES_URL";
pub const CONNECTION_POOL_SIZE_PARAM: &str = "GEOVIEW_CONNECTION_POOL_SIZE";
pub const DEFAULT_LIMIT_PARAM: &str = "GEOVIEW_DEFAULT_LIMIT";
pub const MAX_LIMIT_PARAM: &str = "GEOVIEW_MAX_LIMIT";
pub const MAX_ROWS_PARAM: &str = "GEOVIEW_MAX_ROWS";
pub const STATEMENT_TIMEOUT_PARAM: &str = "GEOVIEW_STATEMENT_TIMEOUT_MS";
pub const ALLOW_UNION_PARAM: &str = "GEOVIEW_ALLOW_UNION";
pub const ALLOWED_RELATIONS_PARAM: &str = "GEOVIEW_ALLOWED_RELATIONS";
pub const QUERY_STORE_PARAM: &str = "GEOVIEW_QUERY_STORE";
pub const GEOSERVER_URL_PARAM: &str = "GEOSERVER_URL";
pub const GEOSERVER_USER_PARAM: &str = "GEOSERVER_USER";
pub const GEOSERVER_PASSWORD_PARAM: &str = "GEOSERVER_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Env(_) => "InvalidEnvironment",
            ConfigError::Invalid { .. } => "InvalidConfig",
            ConfigError::Missing(_) => "MissingConfig",
        }
    }
}

/// Where to reach the GeoServer REST API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoServerSettings {
    pub url: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoviewConfig {
    pub postgres_url: Option<String>,
    pub pool_size: usize,
    pub policy: ValidatorPolicy,
    pub max_rows: usize,
    pub statement_timeout: Duration,
    pub query_store: Option<PathBuf>,
    pub geoserver: Option<GeoServerSettings>,
}

impl GeoviewConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, ConfigError> {
        let pool_size = positive(env, CONNECTION_POOL_SIZE_PARAM)?.unwrap_or(DEFAULT_POOL_SIZE);
        let max_rows = positive(env, MAX_ROWS_PARAM)?.unwrap_or(DEFAULT_MAX_ROWS);
        let statement_timeout = positive(env, STATEMENT_TIMEOUT_PARAM)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STATEMENT_TIMEOUT);

        let default_policy = ValidatorPolicy::default();
        let default_limit = positive(env, DEFAULT_LIMIT_PARAM)?.unwrap_or(default_policy.default_limit);
        let max_limit = positive(env, MAX_LIMIT_PARAM)?;

        let allowed_relations = env.get_list(ALLOWED_RELATIONS_PARAM, vec![]);
        let policy = ValidatorPolicy {
            default_limit,
            max_limit,
            allow_union: env.enabled(ALLOW_UNION_PARAM, false)?,
            allowed_relations: (!allowed_relations.is_empty())
                .then(|| AllowList::new(allowed_relations)),
            ..default_policy
        };

        let geoserver = match env.get(GEOSERVER_URL_PARAM) {
            Some(url) => Some(GeoServerSettings {
                url,
                user: env
                    .get(GEOSERVER_USER_PARAM)
                    .ok_or(ConfigError::Missing(GEOSERVER_USER_PARAM))?,
                password: env
                    .get(GEOSERVER_PASSWORD_PARAM)
                    .ok_or(ConfigError::Missing(GEOSERVER_PASSWORD_PARAM))?,
            }),
            None => None,
        };

        Ok(Self {
            postgres_url: env.get(POSTGRES_URL_PARAM),
            pool_size,
            policy,
            max_rows,
            statement_timeout,
            query_store: env.get(QUERY_STORE_PARAM).map(PathBuf::from),
            geoserver,
        })
    }

    pub fn postgres_url(&self) -> Result<&str, ConfigError> {
        self.postgres_url
            .as_deref()
            .ok_or(ConfigError::Missing(POSTGRES_URL_PARAM))
    }

    /// Execution options with a fresh cancellation token
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            max_rows: self.max_rows,
            timeout: self.statement_timeout,
            ..ExecuteOptions::default()
        }
    }
}

fn positive<T>(env: &dyn Environment, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    match env.get_parsed::<T>(key)? {
        Some(value) if value <= T::default() => Err(ConfigError::Invalid {
            key,
            message: "must be greater than zero".to_string(),
        }),
        value => Ok(value),
    }
}
