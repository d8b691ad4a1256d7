// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

/// A single filter. Conditions are combined strictly left to right by their connective; the
/// connective of the first condition is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub column: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: ConditionValue,
    #[serde(default)]
    pub connective: Connective,
}

impl Condition {
    pub fn new(
        column: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            connective: Connective::And,
        }
    }

    pub fn with_connective(mut self, connective: Connective) -> Self {
        self.connective = connective;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Connective {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    // Comparison
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Text match
    Like,
    #[serde(rename = "ILIKE")]
    ILike,
    NotLike,
    StartsWith,
    EndsWith,
    Contains,

    // Null check
    IsNull,
    IsNotNull,

    // Set membership
    In,
    NotIn,

    // Range
    Between,
    NotBetween,

    // Spatial
    #[serde(rename = "ST_INTERSECTS")]
    StIntersects,
    #[serde(rename = "ST_CONTAINS")]
    StContains,
    #[serde(rename = "ST_WITHIN")]
    StWithin,
    #[serde(rename = "ST_DWITHIN")]
    StDWithin,
    #[serde(rename = "ST_EQUALS")]
    StEquals,
    #[serde(rename = "ST_TOUCHES")]
    StTouches,
    #[serde(rename = "ST_OVERLAPS")]
    StOverlaps,
    #[serde(rename = "ST_CROSSES")]
    StCrosses,
}

/// The right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Operands of `IN`, `NOT IN` (any length) and `BETWEEN` (exactly two)
    List(Vec<ConditionValue>),
    Geometry(GeometryValue),
}

/// A geometry literal for spatial operators. `distance` is required by `ST_DWITHIN` and ignored by
/// the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryValue {
    pub wkt: String,
    pub srid: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        ConditionValue::Bool(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Integer(value)
    }
}

impl From<i32> for ConditionValue {
    fn from(value: i32) -> Self {
        ConditionValue::Integer(value.into())
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        ConditionValue::Float(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        ConditionValue::Text(value)
    }
}

impl<T: Into<ConditionValue>> From<Vec<T>> for ConditionValue {
    fn from(values: Vec<T>) -> Self {
        ConditionValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<GeometryValue> for ConditionValue {
    fn from(value: GeometryValue) -> Self {
        ConditionValue::Geometry(value)
    }
}
