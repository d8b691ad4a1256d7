// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::Serialize;

use crate::{query::AggregateFunction, sql::SqlValue};

/// SQL text with `$n` placeholders and the values bound to them, in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledStatement {
    pub sql: String,
    pub parameters: Vec<SqlValue>,
    /// What each output column is made of. Empty for statements that didn't come from a query
    /// definition.
    pub output_columns: Vec<OutputColumn>,
}

impl CompiledStatement {
    /// A statement from free-form SQL text, with no known output columns
    pub fn from_text(sql: impl Into<String>, parameters: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
            output_columns: vec![],
        }
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.parameters)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelationRef {
    pub schema: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OutputColumn {
    /// A single output column
    Single {
        /// The name the column has in the result set
        name: String,
        relation: RelationRef,
        /// `None` for `COUNT(*)`
        column: Option<String>,
        aggregate: AggregateFunction,
    },
    /// All columns of a relation (from `*` or `relation.*`)
    AllOf { relation: RelationRef },
}
