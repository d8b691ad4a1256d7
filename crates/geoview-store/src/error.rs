// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A query needs a name to be saved")]
    Unnamed,

    #[error("Query store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed query store: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unnamed => "Unnamed",
            StoreError::Io(_) => "Io",
            StoreError::Serde(_) => "Serde",
        }
    }
}
