// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use thiserror::Error;

/// Machine-readable reason a query definition could not be compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedCode {
    EmptyTable,
    InvalidIdentifier,
    UngroupedColumn,
    WildcardWithAggregate,
    InvalidConditionValue,
    MissingJoinCondition,
}

impl MalformedCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedCode::EmptyTable => "EmptyTable",
            MalformedCode::InvalidIdentifier => "InvalidIdentifier",
            MalformedCode::UngroupedColumn => "UngroupedColumn",
            MalformedCode::WildcardWithAggregate => "WildcardWithAggregate",
            MalformedCode::InvalidConditionValue => "InvalidConditionValue",
            MalformedCode::MissingJoinCondition => "MissingJoinCondition",
        }
    }
}

impl Display for MalformedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("Malformed query ({code}): {message}")]
    MalformedQuery {
        code: MalformedCode,
        message: String,
    },
}

impl CompileError {
    pub(crate) fn malformed(code: MalformedCode, message: impl Into<String>) -> Self {
        CompileError::MalformedQuery {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_identifier(what: &str, identifier: &str) -> Self {
        Self::malformed(
            MalformedCode::InvalidIdentifier,
            format!("Invalid {what} identifier '{identifier}'"),
        )
    }

    pub fn code(&self) -> MalformedCode {
        match self {
            CompileError::MalformedQuery { code, .. } => *code,
        }
    }
}
