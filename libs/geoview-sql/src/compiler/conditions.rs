// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    query::{Condition, ConditionOperator, ConditionValue, Connective, GeometryValue},
    sql::{CaseSensitivity, Operand, Predicate, SpatialRelation, SqlValue},
};

use super::{
    column_ref,
    error::{CompileError, MalformedCode},
    scope::Scope,
};

/// Fold conditions left to right by their connective. `a AND b OR c` compiles to
/// `((a AND b) OR c)` regardless of the usual SQL precedence.
pub(super) fn compile_conditions(
    conditions: &[Condition],
    scope: &Scope,
) -> Result<Predicate, CompileError> {
    conditions
        .iter()
        .enumerate()
        .try_fold(Predicate::True, |acc, (index, condition)| {
            let predicate = compile_condition(condition, scope)?;

            Ok(if index == 0 {
                predicate
            } else {
                match condition.connective {
                    Connective::And => Predicate::and(acc, predicate),
                    Connective::Or => Predicate::or(acc, predicate),
                }
            })
        })
}

fn compile_condition(condition: &Condition, scope: &Scope) -> Result<Predicate, CompileError> {
    use ConditionOperator::*;

    let column = column_operand(&condition.column, scope)?;

    Ok(match condition.operator {
        Equals => Predicate::Eq(column, nullable_operand(condition)?),
        NotEquals => Predicate::Neq(column, nullable_operand(condition)?),
        LessThan => Predicate::Lt(column, scalar_operand(condition, &condition.value)?),
        LessThanOrEqual => Predicate::Lte(column, scalar_operand(condition, &condition.value)?),
        GreaterThan => Predicate::Gt(column, scalar_operand(condition, &condition.value)?),
        GreaterThanOrEqual => {
            Predicate::Gte(column, scalar_operand(condition, &condition.value)?)
        }

        Like => Predicate::StringLike(
            column,
            text_operand(condition)?,
            CaseSensitivity::Sensitive,
        ),
        ILike => Predicate::StringLike(
            column,
            text_operand(condition)?,
            CaseSensitivity::Insensitive,
        ),
        NotLike => Predicate::StringNotLike(column, text_operand(condition)?),
        StartsWith => Predicate::StringStartsWith(column, text_operand(condition)?),
        EndsWith => Predicate::StringEndsWith(column, text_operand(condition)?),
        Contains => Predicate::StringContains(column, text_operand(condition)?),

        IsNull => Predicate::Eq(column, Operand::Null),
        IsNotNull => Predicate::Neq(column, Operand::Null),

        In => Predicate::In(column, list_operands(condition)?),
        NotIn => Predicate::NotIn(column, list_operands(condition)?),

        Between => {
            let (low, high) = range_operands(condition)?;
            Predicate::Between(column, low, high)
        }
        NotBetween => {
            let (low, high) = range_operands(condition)?;
            Predicate::NotBetween(column, low, high)
        }

        StIntersects => spatial(SpatialRelation::Intersects, column, condition)?,
        StContains => spatial(SpatialRelation::Contains, column, condition)?,
        StWithin => spatial(SpatialRelation::Within, column, condition)?,
        StEquals => spatial(SpatialRelation::Equals, column, condition)?,
        StTouches => spatial(SpatialRelation::Touches, column, condition)?,
        StOverlaps => spatial(SpatialRelation::Overlaps, column, condition)?,
        StCrosses => spatial(SpatialRelation::Crosses, column, condition)?,
        StDWithin => {
            let geometry = geometry_value(condition)?;
            let distance = geometry.distance.ok_or_else(|| {
                invalid_value(condition, "ST_DWITHIN requires a distance")
            })?;
            Predicate::DWithin(
                column,
                geometry_operand(geometry),
                Operand::Param(SqlValue::Float(distance)),
            )
        }
    })
}

pub(super) fn column_operand(raw: &str, scope: &Scope) -> Result<Operand, CompileError> {
    column_ref(raw, scope).map(Operand::Column)
}

fn invalid_value(condition: &Condition, message: &str) -> CompileError {
    CompileError::malformed(
        MalformedCode::InvalidConditionValue,
        format!(
            "Condition on '{}' ({:?}): {message}",
            condition.column, condition.operator
        ),
    )
}

fn scalar_value(value: &ConditionValue) -> Option<SqlValue> {
    match value {
        ConditionValue::Bool(v) => Some(SqlValue::Bool(*v)),
        ConditionValue::Integer(v) => Some(SqlValue::Int(*v)),
        ConditionValue::Float(v) => Some(SqlValue::Float(*v)),
        ConditionValue::Text(v) => Some(SqlValue::Text(v.clone())),
        ConditionValue::Null | ConditionValue::List(_) | ConditionValue::Geometry(_) => None,
    }
}

fn scalar_operand(condition: &Condition, value: &ConditionValue) -> Result<Operand, CompileError> {
    scalar_value(value)
        .map(Operand::Param)
        .ok_or_else(|| invalid_value(condition, "expected a single non-null value"))
}

/// Equality also accepts null, compiled to `IS NULL`/`IS NOT NULL`
fn nullable_operand(condition: &Condition) -> Result<Operand, CompileError> {
    match &condition.value {
        ConditionValue::Null => Ok(Operand::Null),
        value => scalar_operand(condition, value),
    }
}

fn text_operand(condition: &Condition) -> Result<Operand, CompileError> {
    match &condition.value {
        ConditionValue::Text(v) => Ok(Operand::Param(SqlValue::Text(v.clone()))),
        _ => Err(invalid_value(condition, "expected a text value")),
    }
}

fn list_operands(condition: &Condition) -> Result<Vec<Operand>, CompileError> {
    match &condition.value {
        ConditionValue::List(values) if !values.is_empty() => values
            .iter()
            .map(|value| scalar_operand(condition, value))
            .collect(),
        ConditionValue::List(_) => Err(invalid_value(condition, "the list must not be empty")),
        _ => Err(invalid_value(condition, "expected a list of values")),
    }
}

fn range_operands(condition: &Condition) -> Result<(Operand, Operand), CompileError> {
    match &condition.value {
        ConditionValue::List(values) if values.len() == 2 => Ok((
            scalar_operand(condition, &values[0])?,
            scalar_operand(condition, &values[1])?,
        )),
        _ => Err(invalid_value(condition, "expected exactly two values")),
    }
}

fn geometry_value(condition: &Condition) -> Result<&GeometryValue, CompileError> {
    match &condition.value {
        ConditionValue::Geometry(geometry) if !geometry.wkt.trim().is_empty() => Ok(geometry),
        _ => Err(invalid_value(condition, "expected a geometry {wkt, srid}")),
    }
}

fn geometry_operand(geometry: &GeometryValue) -> Operand {
    Operand::Geometry {
        wkt: SqlValue::Text(geometry.wkt.clone()),
        srid: SqlValue::Int(geometry.srid.into()),
    }
}

fn spatial(
    relation: SpatialRelation,
    column: Operand,
    condition: &Condition,
) -> Result<Predicate, CompileError> {
    let geometry = geometry_value(condition)?;
    Ok(Predicate::Spatial(relation, column, geometry_operand(geometry)))
}
