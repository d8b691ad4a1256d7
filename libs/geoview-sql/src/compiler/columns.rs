// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    query::{AggregateFunction, QueryDefinition},
    sql::{Aggregate, ColumnRef, SelectItem, sanitize_identifier},
};

use super::{
    error::{CompileError, MalformedCode},
    scope::Scope,
    statement::OutputColumn,
};

pub(super) struct CompiledColumns {
    pub items: Vec<SelectItem>,
    pub output_columns: Vec<OutputColumn>,
}

/// Compile the select list. When any column is aggregated, every other column must be aggregated
/// too or appear in `group_by`.
pub(super) fn compile_columns(
    definition: &QueryDefinition,
    group_by: &[ColumnRef],
    scope: &Scope,
) -> Result<CompiledColumns, CompileError> {
    if definition.columns.is_empty() {
        return Ok(CompiledColumns {
            items: vec![],
            output_columns: scope
                .all()
                .map(|relation| OutputColumn::AllOf { relation })
                .collect(),
        });
    }

    let aggregated = definition.has_aggregate();
    let mut items = Vec::with_capacity(definition.columns.len());
    let mut output_columns = Vec::with_capacity(definition.columns.len());

    for column in &definition.columns {
        let column_ref = ColumnRef::parse(&column.source_column)
            .map_err(|part| CompileError::invalid_identifier("column", &part))?;
        let alias = column
            .alias
            .as_deref()
            .map(|alias| {
                sanitize_identifier(alias)
                    .map(str::to_string)
                    .ok_or_else(|| CompileError::invalid_identifier("alias", alias))
            })
            .transpose()?;

        let aggregate = sql_aggregate(column.aggregate_function);

        match aggregate {
            Some(Aggregate::Count) | None => {}
            Some(other) if column_ref.is_wildcard() => {
                return Err(CompileError::malformed(
                    MalformedCode::WildcardWithAggregate,
                    format!(
                        "{} can't be applied to '{}'",
                        other.function_name(),
                        column.source_column
                    ),
                ));
            }
            Some(_) => {}
        }

        if aggregated && aggregate.is_none() {
            if column_ref.is_wildcard() {
                return Err(CompileError::malformed(
                    MalformedCode::WildcardWithAggregate,
                    format!(
                        "'{}' can't be selected alongside aggregated columns",
                        column.source_column
                    ),
                ));
            }
            if !is_grouped(&column_ref, alias.as_deref(), group_by) {
                return Err(CompileError::malformed(
                    MalformedCode::UngroupedColumn,
                    format!(
                        "Column '{}' must be aggregated or appear in groupBy",
                        column.source_column
                    ),
                ));
            }
        }

        output_columns.extend(output_column(
            &column_ref,
            alias.as_deref(),
            column.aggregate_function,
            scope,
        )?);

        items.push(SelectItem {
            column: column_ref,
            aggregate,
            alias,
        });
    }

    Ok(CompiledColumns {
        items,
        output_columns,
    })
}

fn sql_aggregate(function: AggregateFunction) -> Option<Aggregate> {
    match function {
        AggregateFunction::None => None,
        AggregateFunction::Count => Some(Aggregate::Count),
        AggregateFunction::Sum => Some(Aggregate::Sum),
        AggregateFunction::Avg => Some(Aggregate::Avg),
        AggregateFunction::Min => Some(Aggregate::Min),
        AggregateFunction::Max => Some(Aggregate::Max),
        AggregateFunction::StExtent => Some(Aggregate::StExtent),
        AggregateFunction::StUnion => Some(Aggregate::StUnion),
        AggregateFunction::StCollect => Some(Aggregate::StCollect),
    }
}

/// A group-by entry covers a column if it is the same reference, names the column without a
/// qualifier, or names the column's alias.
fn is_grouped(column: &ColumnRef, alias: Option<&str>, group_by: &[ColumnRef]) -> bool {
    group_by.iter().any(|group| {
        group == column
            || (group.qualifier.is_empty()
                && (group.name() == column.name()
                    || alias.is_some_and(|alias| group.name() == Some(alias))))
    })
}

fn output_column(
    column: &ColumnRef,
    alias: Option<&str>,
    aggregate: AggregateFunction,
    scope: &Scope,
) -> Result<Vec<OutputColumn>, CompileError> {
    if column.is_wildcard() && aggregate == AggregateFunction::None {
        return Ok(if column.qualifier.is_empty() {
            scope
                .all()
                .map(|relation| OutputColumn::AllOf { relation })
                .collect()
        } else {
            vec![OutputColumn::AllOf {
                relation: scope.resolve(column)?,
            }]
        });
    }

    // Unaliased aggregates are named after the function, in lower case
    let name = match (alias, sql_aggregate(aggregate), column.name()) {
        (Some(alias), _, _) => alias.to_string(),
        (None, Some(aggregate), _) => aggregate.function_name().to_lowercase(),
        (None, None, Some(name)) => name.to_string(),
        (None, None, None) => unreachable!("plain wildcards are handled above"),
    };

    Ok(vec![OutputColumn::Single {
        name,
        relation: scope.resolve(column)?,
        column: column.name().map(str::to_string),
        aggregate,
    }])
}
