// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Translation of a [`QueryDefinition`] into SQL text with bound parameters.
//!
//! Clause order is fixed: SELECT, FROM, JOIN*, WHERE, GROUP BY, ORDER BY, LIMIT, OFFSET. Tables are
//! always schema-qualified and every identifier is validated and quoted. Condition values only ever
//! appear as parameters.

mod columns;
mod conditions;
mod error;
mod scope;
mod statement;

use tracing::debug;

use crate::{
    query::{JoinDefinition, JoinOperator, JoinType, NullsPosition, QueryDefinition, SortDirection},
    sql::{
        ColumnRef, ExpressionBuilder, Join, JoinKind, Limit, NullsOrder, Offset, OrderBy,
        OrderByElement, Ordering, Predicate, Relation, Select, sanitize_identifier,
    },
};

pub use error::{CompileError, MalformedCode};
pub use statement::{CompiledStatement, OutputColumn, RelationRef};

use columns::compile_columns;
use conditions::{column_operand, compile_conditions};
use scope::Scope;

/// Compile a query definition. Pure: identical definitions produce byte-identical SQL and the same
/// parameter order.
pub fn compile(definition: &QueryDefinition) -> Result<CompiledStatement, CompileError> {
    let from = relation(
        &definition.schema,
        &definition.table,
        definition.alias.as_deref(),
    )?;

    let join_relations = definition
        .joins
        .iter()
        .map(|join| relation(&join.schema, &join.table, join.alias.as_deref()))
        .collect::<Result<Vec<_>, _>>()?;

    let relations: Vec<Relation> = std::iter::once(from.clone())
        .chain(join_relations.iter().cloned())
        .collect();

    // A join condition sees the base table and the relations joined so far, itself included
    let joins = definition
        .joins
        .iter()
        .zip(join_relations)
        .enumerate()
        .map(|(index, (join, relation))| {
            compile_join(join, relation, &Scope::new(relations[..index + 2].to_vec()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scope = Scope::new(relations);

    let group_by = definition
        .group_by
        .iter()
        .map(|raw| column_ref(raw, &scope))
        .collect::<Result<Vec<_>, _>>()?;

    let columns = compile_columns(definition, &group_by, &scope)?;
    let predicate = compile_conditions(&definition.conditions, &scope)?;

    let order_by = definition
        .order_by
        .iter()
        .map(|item| {
            Ok(OrderByElement {
                column: column_ref(&item.column, &scope)?,
                ordering: match item.direction {
                    SortDirection::Asc => Ordering::Asc,
                    SortDirection::Desc => Ordering::Desc,
                },
                nulls: match item.nulls_position {
                    NullsPosition::Default => NullsOrder::Default,
                    NullsPosition::First => NullsOrder::First,
                    NullsPosition::Last => NullsOrder::Last,
                },
            })
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let select = Select {
        distinct: definition.distinct,
        items: columns.items,
        from,
        joins,
        predicate,
        group_by,
        order_by: OrderBy(order_by),
        limit: definition.limit.map(Limit),
        offset: definition.offset.map(Offset),
    };

    let (sql, parameters) = select.to_sql();
    debug!(%sql, parameter_count = parameters.len(), "Compiled query definition");

    Ok(CompiledStatement {
        sql,
        parameters,
        output_columns: columns.output_columns,
    })
}

fn relation(schema: &str, table: &str, alias: Option<&str>) -> Result<Relation, CompileError> {
    if table.trim().is_empty() {
        return Err(CompileError::malformed(
            MalformedCode::EmptyTable,
            "A table name is required",
        ));
    }

    let schema =
        sanitize_identifier(schema).ok_or_else(|| CompileError::invalid_identifier("schema", schema))?;
    let table =
        sanitize_identifier(table).ok_or_else(|| CompileError::invalid_identifier("table", table))?;
    let alias = alias
        .map(|alias| {
            sanitize_identifier(alias)
                .map(str::to_string)
                .ok_or_else(|| CompileError::invalid_identifier("alias", alias))
        })
        .transpose()?;

    Ok(Relation::new(schema, table).with_alias(alias))
}

/// A column reference that must name a single column of a relation in scope
fn column_ref(raw: &str, scope: &Scope) -> Result<ColumnRef, CompileError> {
    let column =
        ColumnRef::parse(raw).map_err(|part| CompileError::invalid_identifier("column", &part))?;

    if column.is_wildcard() {
        return Err(CompileError::invalid_identifier("column", raw));
    }

    scope.resolve(&column)?;
    Ok(column)
}

fn compile_join(
    join: &JoinDefinition,
    relation: Relation,
    scope: &Scope,
) -> Result<Join, CompileError> {
    let kind = match join.join_type {
        JoinType::Inner => JoinKind::Inner,
        JoinType::Left => JoinKind::Left,
        JoinType::Right => JoinKind::Right,
        JoinType::FullOuter => JoinKind::FullOuter,
        JoinType::Cross => JoinKind::Cross,
    };

    let predicate = match kind {
        JoinKind::Cross => None,
        _ => {
            let (Some(left), Some(right)) = (&join.left_expr, &join.right_expr) else {
                return Err(CompileError::malformed(
                    MalformedCode::MissingJoinCondition,
                    format!("Join on '{}' needs both sides of its condition", join.table),
                ));
            };

            let left = column_operand(left, scope)?;
            let right = column_operand(right, scope)?;

            Some(match join.operator {
                JoinOperator::Equals => Predicate::Eq(left, right),
                JoinOperator::NotEquals => Predicate::Neq(left, right),
                JoinOperator::LessThan => Predicate::Lt(left, right),
                JoinOperator::LessThanOrEqual => Predicate::Lte(left, right),
                JoinOperator::GreaterThan => Predicate::Gt(left, right),
                JoinOperator::GreaterThanOrEqual => Predicate::Gte(left, right),
            })
        }
    };

    Ok(Join {
        kind,
        relation,
        predicate,
    })
}
