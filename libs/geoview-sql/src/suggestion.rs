// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Candidate SQL from a natural-language provider, admitted only through the validator.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    compiler::CompiledStatement,
    validator::{ValidatedStatement, ValidationRejected, Validator},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SqlSuggestion {
    pub sql: String,
    /// The provider's own confidence, between 0 and 1
    pub confidence: f64,
}

/// A natural-language-to-SQL provider
#[async_trait]
pub trait SqlSuggester: Send + Sync {
    async fn suggest(
        &self,
        question: &str,
        schema_context: &str,
    ) -> Result<SqlSuggestion, SuggestionError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum SuggestionError {
    #[error("Suggestion provider failed: {0}")]
    Provider(String),

    #[error(transparent)]
    Rejected(#[from] ValidationRejected),

    #[error("Suggestion confidence {confidence} is below {threshold}")]
    LowConfidence { confidence: f64, threshold: f64 },
}

impl SuggestionError {
    pub fn code(&self) -> &'static str {
        match self {
            SuggestionError::Provider(_) => "ProviderFailed",
            SuggestionError::Rejected(rejected) => rejected.code.as_str(),
            SuggestionError::LowConfidence { .. } => "LowConfidence",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatedSuggestion {
    pub statement: ValidatedStatement,
    pub confidence: f64,
}

/// Validates every suggestion exactly like hand-written SQL
pub struct SuggestionGate {
    suggester: Arc<dyn SqlSuggester>,
    validator: Validator,
    min_confidence: f64,
}

impl SuggestionGate {
    pub fn new(suggester: Arc<dyn SqlSuggester>, validator: Validator) -> Self {
        Self {
            suggester,
            validator,
            min_confidence: 0.0,
        }
    }

    /// Drop suggestions the provider is less confident about than `min_confidence`
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub async fn suggest(
        &self,
        question: &str,
        schema_context: &str,
    ) -> Result<GatedSuggestion, SuggestionError> {
        let SqlSuggestion { sql, confidence } =
            self.suggester.suggest(question, schema_context).await?;
        debug!(%sql, confidence, "Received SQL suggestion");

        if confidence < self.min_confidence {
            return Err(SuggestionError::LowConfidence {
                confidence,
                threshold: self.min_confidence,
            });
        }

        let statement = self
            .validator
            .validate_statement(CompiledStatement::from_text(sql, vec![]))
            .inspect_err(|e| warn!(question, "Suggested SQL rejected: {e}"))?;

        Ok(GatedSuggestion {
            statement,
            confidence,
        })
    }
}
