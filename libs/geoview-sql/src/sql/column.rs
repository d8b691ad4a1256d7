// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ColumnRef, ExpressionBuilder, SqlBuilder};

/// Aggregate function applied to a selected column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    StExtent,
    StUnion,
    StCollect,
}

impl Aggregate {
    pub fn function_name(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::StExtent => "ST_Extent",
            Aggregate::StUnion => "ST_Union",
            Aggregate::StCollect => "ST_Collect",
        }
    }
}

/// An item in the select list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub column: ColumnRef,
    pub aggregate: Option<Aggregate>,
    pub alias: Option<String>,
}

impl ExpressionBuilder for SelectItem {
    /// Build `"col"`, `COUNT(*)`, `SUM("col") AS "alias"` etc.
    fn build(&self, builder: &mut SqlBuilder) {
        match self.aggregate {
            Some(aggregate) => {
                builder.push_str(aggregate.function_name());
                builder.push('(');
                self.column.build(builder);
                builder.push(')');
            }
            None => self.column.build(builder),
        }

        if let Some(alias) = &self.alias {
            builder.push_str(" AS ");
            builder.push_identifier(alias);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(column: &str, aggregate: Option<Aggregate>, alias: Option<&str>) -> SelectItem {
        SelectItem {
            column: ColumnRef::parse(column).unwrap(),
            aggregate,
            alias: alias.map(str::to_string),
        }
    }

    #[test]
    fn plain_and_aggregated() {
        assert_binding!(item("name", None, None).to_sql(), r#""name""#);
        assert_binding!(
            item("population", Some(Aggregate::Sum), Some("total_pop")).to_sql(),
            r#"SUM("population") AS "total_pop""#
        );
        assert_binding!(
            item("*", Some(Aggregate::Count), None).to_sql(),
            "COUNT(*)"
        );
        assert_binding!(
            item("c.geom", Some(Aggregate::StExtent), Some("bbox")).to_sql(),
            r#"ST_Extent("c"."geom") AS "bbox""#
        );
    }
}
