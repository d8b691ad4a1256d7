// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{
    ColumnRef, ExpressionBuilder, SqlBuilder,
    column::SelectItem,
    join::Join,
    order::OrderBy,
    pagination::{Limit, Offset},
    predicate::Predicate,
    relation::Relation,
};

/// A select statement
#[derive(Debug, PartialEq)]
pub struct Select {
    pub distinct: bool,
    /// The columns to select. Empty selects `*`.
    pub items: Vec<SelectItem>,
    /// The relation to select from
    pub from: Relation,
    /// Joins onto `from`, in declaration order
    pub joins: Vec<Join>,
    /// The predicate to filter the rows
    pub predicate: Predicate,
    pub group_by: Vec<ColumnRef>,
    pub order_by: OrderBy,
    pub limit: Option<Limit>,
    pub offset: Option<Offset>,
}

impl ExpressionBuilder for Select {
    fn build(&self, builder: &mut SqlBuilder) {
        builder.push_str("SELECT ");
        if self.distinct {
            builder.push_str("DISTINCT ");
        }

        if self.items.is_empty() {
            builder.push('*');
        } else {
            builder.push_elems(&self.items, ", ");
        }

        builder.push_str(" FROM ");
        self.from.build(builder);

        for join in &self.joins {
            builder.push_space();
            join.build(builder);
        }

        // Avoid correct, but inelegant "WHERE TRUE" clause
        if self.predicate != Predicate::True {
            builder.push_str(" WHERE ");
            self.predicate.build(builder);
        }
        if !self.group_by.is_empty() {
            builder.push_str(" GROUP BY ");
            builder.push_elems(&self.group_by, ", ");
        }
        if !self.order_by.0.is_empty() {
            builder.push_space();
            self.order_by.build(builder);
        }
        if let Some(limit) = &self.limit {
            builder.push_space();
            limit.build(builder);
        }
        if let Some(offset) = &self.offset {
            builder.push_space();
            offset.build(builder);
        }
    }
}
