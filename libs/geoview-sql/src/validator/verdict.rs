// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;

use crate::{compiler::OutputColumn, sql::SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Accept,
    Reject,
    Rewrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReasonCode {
    EmptyStatement,
    WriteOperationBlocked,
    InjectionPatternDetected,
    SchemaNotAllowed,
    ParameterMismatch,
    LimitInjected,
    LimitClamped,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::EmptyStatement => "EmptyStatement",
            ReasonCode::WriteOperationBlocked => "WriteOperationBlocked",
            ReasonCode::InjectionPatternDetected => "InjectionPatternDetected",
            ReasonCode::SchemaNotAllowed => "SchemaNotAllowed",
            ReasonCode::ParameterMismatch => "ParameterMismatch",
            ReasonCode::LimitInjected => "LimitInjected",
            ReasonCode::LimitClamped => "LimitClamped",
        }
    }
}

impl Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerdictReason {
    pub code: ReasonCode,
    pub message: String,
}

impl VerdictReason {
    pub(super) fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The result of validating one piece of SQL text. Produced fresh by every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    pub outcome: Outcome,
    pub reasons: Vec<VerdictReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_sql: Option<String>,
}

impl ValidationVerdict {
    pub(super) fn accept() -> Self {
        Self {
            outcome: Outcome::Accept,
            reasons: vec![],
            rewritten_sql: None,
        }
    }

    pub(super) fn reject(reason: VerdictReason) -> Self {
        Self {
            outcome: Outcome::Reject,
            reasons: vec![reason],
            rewritten_sql: None,
        }
    }

    pub(super) fn rewrite(sql: String, reason: VerdictReason) -> Self {
        Self {
            outcome: Outcome::Rewrite,
            reasons: vec![reason],
            rewritten_sql: Some(sql),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.outcome == Outcome::Reject
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("SQL rejected ({code}): {message}")]
pub struct ValidationRejected {
    pub code: ReasonCode,
    pub message: String,
}

impl From<VerdictReason> for ValidationRejected {
    fn from(reason: VerdictReason) -> Self {
        Self {
            code: reason.code,
            message: reason.message,
        }
    }
}

/// A statement that passed the validator, with any rewrite already applied.
///
/// Only [`super::Validator`] can create one, which makes it the proof of validation the executor
/// and the view publisher ask for.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStatement {
    sql: String,
    parameters: Vec<SqlValue>,
    output_columns: Vec<OutputColumn>,
    verdict: ValidationVerdict,
}

impl ValidatedStatement {
    pub(super) fn new(
        sql: String,
        parameters: Vec<SqlValue>,
        output_columns: Vec<OutputColumn>,
        verdict: ValidationVerdict,
    ) -> Self {
        Self {
            sql,
            parameters,
            output_columns,
            verdict,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[SqlValue] {
        &self.parameters
    }

    pub fn output_columns(&self) -> &[OutputColumn] {
        &self.output_columns
    }

    pub fn verdict(&self) -> &ValidationVerdict {
        &self.verdict
    }
}
