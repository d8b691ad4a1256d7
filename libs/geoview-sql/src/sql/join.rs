// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, Relation, SqlBuilder, predicate::Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    FullOuter,
    Cross,
}

impl JoinKind {
    fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// A join onto the accumulated FROM clause. Joins are rendered in the order they are declared, so
/// each one can refer to any relation introduced before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub relation: Relation,
    /// The join predicate such as `"concerts"."venue_id" = "venues"."id"`. Always `None` for cross
    /// joins.
    pub predicate: Option<Predicate>,
}

impl ExpressionBuilder for Join {
    /// Build expression of the form `<kind> <relation> ON <predicate>`.
    fn build(&self, builder: &mut SqlBuilder) {
        builder.push_str(self.kind.keyword());
        builder.push_space();
        self.relation.build(builder);
        if let Some(predicate) = &self.predicate {
            builder.push_str(" ON ");
            predicate.build(builder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{ColumnRef, predicate::Operand};

    #[test]
    fn basic_join() {
        let join = Join {
            kind: JoinKind::Left,
            relation: Relation::new("public", "venues"),
            predicate: Some(Predicate::Eq(
                Operand::Column(ColumnRef::parse("concerts.venue_id").unwrap()),
                Operand::Column(ColumnRef::parse("venues.id").unwrap()),
            )),
        };

        assert_binding!(
            join.to_sql(),
            r#"LEFT JOIN "public"."venues" ON "concerts"."venue_id" = "venues"."id""#
        );
    }

    #[test]
    fn cross_join() {
        let join = Join {
            kind: JoinKind::Cross,
            relation: Relation::new("public", "grid"),
            predicate: None,
        };

        assert_binding!(join.to_sql(), r#"CROSS JOIN "public"."grid""#);
    }
}
