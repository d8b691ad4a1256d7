// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use super::condition::Condition;

pub const DEFAULT_SCHEMA: &str = "public";

pub(crate) fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// Structured description of a query, as produced by the visual builder or loaded from the query
/// store. It isn't SQL yet: [`crate::compile`] turns it into a [`crate::CompiledStatement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    /// Alias for the base table, usable as a qualifier in column references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub columns: Vec<SelectColumn>,
    #[serde(default)]
    pub joins: Vec<JoinDefinition>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<OrderByItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default)]
    pub distinct: bool,
}

impl QueryDefinition {
    /// A definition selecting everything from `public.<table>`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            name: None,
            schema: default_schema(),
            table: table.into(),
            alias: None,
            columns: vec![],
            joins: vec![],
            conditions: vec![],
            group_by: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
            distinct: false,
        }
    }

    pub fn has_aggregate(&self) -> bool {
        self.columns
            .iter()
            .any(|column| column.aggregate_function != AggregateFunction::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectColumn {
    /// `column`, `relation.column`, `*` or `relation.*`
    pub source_column: String,
    #[serde(default)]
    pub aggregate_function: AggregateFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn plain(source_column: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            aggregate_function: AggregateFunction::None,
            alias: None,
        }
    }

    pub fn aggregated(
        source_column: impl Into<String>,
        aggregate_function: AggregateFunction,
        alias: Option<&str>,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            aggregate_function,
            alias: alias.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateFunction {
    #[default]
    None,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    StExtent,
    StUnion,
    StCollect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDefinition {
    pub join_type: JoinType,
    pub table: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Column reference on the left of the join condition. Unused for cross joins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_expr: Option<String>,
    #[serde(default)]
    pub operator: JoinOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    FullOuter,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinOperator {
    #[default]
    #[serde(alias = "=")]
    Equals,
    #[serde(alias = "<>", alias = "!=")]
    NotEquals,
    #[serde(alias = "<")]
    LessThan,
    #[serde(alias = "<=")]
    LessThanOrEqual,
    #[serde(alias = ">")]
    GreaterThan,
    #[serde(alias = ">=")]
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderByItem {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub nulls_position: NullsPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullsPosition {
    #[default]
    Default,
    First,
    Last,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_uses_defaults() {
        let definition: QueryDefinition = serde_json::from_str(r#"{"table": "countries"}"#).unwrap();
        assert_eq!(definition, QueryDefinition::new("countries"));
    }

    #[test]
    fn full_json() {
        let definition: QueryDefinition = serde_json::from_str(
            r#"{
                "name": "big-countries",
                "schema": "geo",
                "table": "countries",
                "columns": [
                    {"sourceColumn": "name"},
                    {"sourceColumn": "population", "aggregateFunction": "SUM", "alias": "total_pop"}
                ],
                "joins": [
                    {"joinType": "LEFT", "table": "capitals", "leftExpr": "countries.id",
                     "rightExpr": "capitals.country_id", "operator": "="}
                ],
                "groupBy": ["name"],
                "orderBy": [{"column": "total_pop", "direction": "DESC", "nullsPosition": "LAST"}],
                "limit": 100,
                "distinct": true
            }"#,
        )
        .unwrap();

        assert_eq!(definition.schema, "geo");
        assert_eq!(
            definition.columns[1].aggregate_function,
            AggregateFunction::Sum
        );
        assert_eq!(definition.joins[0].schema, "public");
        assert_eq!(definition.joins[0].operator, JoinOperator::Equals);
        assert_eq!(definition.order_by[0].nulls_position, NullsPosition::Last);
        assert!(definition.has_aggregate());
        assert!(definition.distinct);
    }
}
