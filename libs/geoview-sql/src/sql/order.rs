// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ColumnRef, ExpressionBuilder, SqlBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    /// Leave it to the database (nulls last for ascending, first for descending)
    Default,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub column: ColumnRef,
    pub ordering: Ordering,
    pub nulls: NullsOrder,
}

/// The `ORDER BY` clause. An empty list renders nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBy(pub Vec<OrderByElement>);

impl ExpressionBuilder for OrderByElement {
    fn build(&self, builder: &mut SqlBuilder) {
        self.column.build(builder);
        builder.push_str(match self.ordering {
            Ordering::Asc => " ASC",
            Ordering::Desc => " DESC",
        });
        match self.nulls {
            NullsOrder::Default => {}
            NullsOrder::First => builder.push_str(" NULLS FIRST"),
            NullsOrder::Last => builder.push_str(" NULLS LAST"),
        }
    }
}

impl ExpressionBuilder for OrderBy {
    /// Build expression of the form `ORDER BY <elem1>, <elem2>, ...`
    fn build(&self, builder: &mut SqlBuilder) {
        if self.0.is_empty() {
            return;
        }
        builder.push_str("ORDER BY ");
        builder.push_elems(&self.0, ", ");
    }
}
