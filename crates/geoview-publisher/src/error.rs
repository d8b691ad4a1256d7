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
pub enum PublishError {
    #[error("Geometry metadata is required to publish a view")]
    MissingGeometry,

    /// The serving component refused the request. The message is its own.
    #[error("Server responded with {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("View '{0}' is not published")]
    NotFound(String),

    #[error("Failed to reach the server: {0}")]
    Transport(String),

    #[error("Invalid view: {0}")]
    InvalidView(String),
}

impl PublishError {
    pub fn code(&self) -> &'static str {
        match self {
            PublishError::MissingGeometry => "MissingGeometry",
            PublishError::Remote { .. } => "Remote",
            PublishError::NotFound(_) => "NotFound",
            PublishError::Transport(_) => "Transport",
            PublishError::InvalidView(_) => "InvalidView",
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(error: reqwest::Error) -> Self {
        PublishError::Transport(error.to_string())
    }
}
