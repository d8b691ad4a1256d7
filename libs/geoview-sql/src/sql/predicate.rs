// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ColumnRef, ExpressionBuilder, SqlBuilder, SqlValue};

/// Case sensitivity for string predicates.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

/// Two-argument PostGIS relationship functions
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum SpatialRelation {
    Intersects,
    Contains,
    Within,
    Equals,
    Touches,
    Overlaps,
    Crosses,
}

impl SpatialRelation {
    pub fn function_name(&self) -> &'static str {
        match self {
            SpatialRelation::Intersects => "ST_Intersects",
            SpatialRelation::Contains => "ST_Contains",
            SpatialRelation::Within => "ST_Within",
            SpatialRelation::Equals => "ST_Equals",
            SpatialRelation::Touches => "ST_Touches",
            SpatialRelation::Overlaps => "ST_Overlaps",
            SpatialRelation::Crosses => "ST_Crosses",
        }
    }
}

/// One side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Param(SqlValue),
    Null,
    /// `ST_GeomFromText(<wkt>, <srid>)` with both arguments bound
    Geometry { wkt: SqlValue, srid: SqlValue },
}

impl ExpressionBuilder for Operand {
    fn build(&self, builder: &mut SqlBuilder) {
        match self {
            Operand::Column(column) => column.build(builder),
            Operand::Param(value) => builder.push_param(value.clone()),
            Operand::Null => builder.push_str("NULL"),
            Operand::Geometry { wkt, srid } => {
                builder.push_str("ST_GeomFromText(");
                builder.push_param(wkt.clone());
                builder.push_str(", ");
                builder.push_param(srid.clone());
                builder.push(')');
            }
        }
    }
}

/// A predicate is a boolean expression that can be used in a WHERE or a JOIN ... ON clause.
#[derive(Debug, PartialEq, Clone)]
pub enum Predicate {
    True,
    False,
    Eq(Operand, Operand),
    Neq(Operand, Operand),
    Lt(Operand, Operand),
    Lte(Operand, Operand),
    Gt(Operand, Operand),
    Gte(Operand, Operand),
    In(Operand, Vec<Operand>),
    NotIn(Operand, Vec<Operand>),
    Between(Operand, Operand, Operand),
    NotBetween(Operand, Operand, Operand),

    // string predicates
    StringLike(Operand, Operand, CaseSensitivity),
    StringNotLike(Operand, Operand),
    StringStartsWith(Operand, Operand),
    StringEndsWith(Operand, Operand),
    StringContains(Operand, Operand),

    // spatial predicates
    Spatial(SpatialRelation, Operand, Operand),
    /// `ST_DWithin(<geometry>, <geometry>, <distance>)`
    DWithin(Operand, Operand, Operand),

    // Prefer Predicate::and(), which simplifies the clause
    And(Box<Predicate>, Box<Predicate>),
    // Prefer Predicate::or(), which simplifies the clause
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// Logical and of two predicates, reducing to a simpler predicate if possible.
    pub fn and(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::False, _) | (_, Predicate::False) => Predicate::False,
            (Predicate::True, rhs) => rhs,
            (lhs, Predicate::True) => lhs,
            (lhs, rhs) if lhs == rhs => lhs,
            (lhs, rhs) => Predicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Logical or of two predicates, reducing to a simpler predicate if possible.
    pub fn or(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (Predicate::False, rhs) => rhs,
            (lhs, Predicate::False) => lhs,
            (lhs, rhs) if lhs == rhs => lhs,
            (lhs, rhs) => Predicate::Or(Box::new(lhs), Box::new(rhs)),
        }
    }
}

impl ExpressionBuilder for Predicate {
    /// Build a predicate into a SQL string.
    fn build(&self, builder: &mut SqlBuilder) {
        match self {
            Predicate::True => builder.push_str("TRUE"),
            Predicate::False => builder.push_str("FALSE"),
            Predicate::Eq(lhs, rhs) => {
                if rhs == &Operand::Null {
                    lhs.build(builder);
                    builder.push_str(" IS NULL");
                } else {
                    relational_combine(lhs, rhs, "=", builder)
                }
            }
            Predicate::Neq(lhs, rhs) => {
                if rhs == &Operand::Null {
                    lhs.build(builder);
                    builder.push_str(" IS NOT NULL");
                } else {
                    relational_combine(lhs, rhs, "<>", builder)
                }
            }
            Predicate::Lt(lhs, rhs) => relational_combine(lhs, rhs, "<", builder),
            Predicate::Lte(lhs, rhs) => relational_combine(lhs, rhs, "<=", builder),
            Predicate::Gt(lhs, rhs) => relational_combine(lhs, rhs, ">", builder),
            Predicate::Gte(lhs, rhs) => relational_combine(lhs, rhs, ">=", builder),
            Predicate::In(lhs, elems) => set_combine(lhs, elems, "IN", builder),
            Predicate::NotIn(lhs, elems) => set_combine(lhs, elems, "NOT IN", builder),
            Predicate::Between(value, low, high) => {
                range_combine(value, low, high, "BETWEEN", builder)
            }
            Predicate::NotBetween(value, low, high) => {
                range_combine(value, low, high, "NOT BETWEEN", builder)
            }
            Predicate::StringLike(lhs, rhs, case_sensitivity) => relational_combine(
                lhs,
                rhs,
                if *case_sensitivity == CaseSensitivity::Insensitive {
                    "ILIKE"
                } else {
                    "LIKE"
                },
                builder,
            ),
            Predicate::StringNotLike(lhs, rhs) => relational_combine(lhs, rhs, "NOT LIKE", builder),
            // we use the postgres concat operator (||) in order to handle both literals and column references
            Predicate::StringStartsWith(lhs, rhs) => {
                lhs.build(builder);
                builder.push_str(" LIKE ");
                rhs.build(builder);
                builder.push_str(" || '%'");
            }
            Predicate::StringEndsWith(lhs, rhs) => {
                lhs.build(builder);
                builder.push_str(" LIKE '%' || ");
                rhs.build(builder);
            }
            Predicate::StringContains(lhs, rhs) => {
                lhs.build(builder);
                builder.push_str(" LIKE '%' || ");
                rhs.build(builder);
                builder.push_str(" || '%'");
            }
            Predicate::Spatial(relation, lhs, rhs) => {
                builder.push_str(relation.function_name());
                builder.push('(');
                lhs.build(builder);
                builder.push_str(", ");
                rhs.build(builder);
                builder.push(')');
            }
            Predicate::DWithin(lhs, rhs, distance) => {
                builder.push_str("ST_DWithin(");
                lhs.build(builder);
                builder.push_str(", ");
                rhs.build(builder);
                builder.push_str(", ");
                distance.build(builder);
                builder.push(')');
            }
            Predicate::And(lhs, rhs) => logical_combine(lhs, rhs, "AND", builder),
            Predicate::Or(lhs, rhs) => logical_combine(lhs, rhs, "OR", builder),
        }
    }
}

/// Combine two expressions with a relational operator.
fn relational_combine<E1: ExpressionBuilder, E2: ExpressionBuilder>(
    left: &E1,
    right: &E2,
    op: &'static str,
    builder: &mut SqlBuilder,
) {
    left.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_space();
    right.build(builder);
}

fn set_combine(left: &Operand, elems: &[Operand], op: &'static str, builder: &mut SqlBuilder) {
    left.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_str(" (");
    builder.push_elems(elems, ", ");
    builder.push(')');
}

fn range_combine(
    value: &Operand,
    low: &Operand,
    high: &Operand,
    op: &'static str,
    builder: &mut SqlBuilder,
) {
    value.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_space();
    low.build(builder);
    builder.push_str(" AND ");
    high.build(builder);
}

/// Combine two expressions with a logical binary operator. The parentheses make the evaluation
/// order explicit, so a left fold of conditions evaluates strictly left to right.
fn logical_combine<E1: ExpressionBuilder, E2: ExpressionBuilder>(
    left: &E1,
    right: &E2,
    op: &'static str,
    builder: &mut SqlBuilder,
) {
    builder.push('(');
    left.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_space();
    right.build(builder);
    builder.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Operand {
        Operand::Column(ColumnRef::parse(name).unwrap())
    }

    fn param(value: impl Into<SqlValue>) -> Operand {
        Operand::Param(value.into())
    }

    #[test]
    fn true_predicate() {
        assert_binding!(Predicate::True.to_sql(), "TRUE");
    }

    #[test]
    fn eq_predicate() {
        let predicate = Predicate::Eq(column("age"), param(5));
        assert_binding!(predicate.to_sql(), r#""age" = $1"#, 5);
    }

    #[test]
    fn null_comparisons() {
        assert_binding!(
            Predicate::Eq(column("name"), Operand::Null).to_sql(),
            r#""name" IS NULL"#
        );
        assert_binding!(
            Predicate::Neq(column("name"), Operand::Null).to_sql(),
            r#""name" IS NOT NULL"#
        );
    }

    #[test]
    fn and_predicate() {
        let predicate = Predicate::and(
            Predicate::Eq(column("name"), param("foo")),
            Predicate::Eq(column("age"), param(5)),
        );

        assert_binding!(
            predicate.to_sql(),
            r#"("name" = $1 AND "age" = $2)"#,
            "foo",
            5
        );
    }

    #[test]
    fn simplification() {
        let eq = Predicate::Eq(column("age"), param(5));
        assert_eq!(Predicate::and(Predicate::True, eq.clone()), eq);
        assert_eq!(Predicate::or(eq.clone(), Predicate::True), Predicate::True);
        assert_eq!(Predicate::and(eq.clone(), eq.clone()), eq);
    }

    #[test]
    fn set_and_range_predicates() {
        assert_binding!(
            Predicate::In(column("code"), vec![param("FR"), param("DE")]).to_sql(),
            r#""code" IN ($1, $2)"#,
            "FR",
            "DE"
        );
        assert_binding!(
            Predicate::NotBetween(column("pop"), param(10), param(20)).to_sql(),
            r#""pop" NOT BETWEEN $1 AND $2"#,
            10,
            20
        );
    }

    #[test]
    fn string_predicates() {
        assert_binding!(
            Predicate::StringLike(column("title"), param("uta%"), CaseSensitivity::Insensitive)
                .to_sql(),
            r#""title" ILIKE $1"#,
            "uta%"
        );
        assert_binding!(
            Predicate::StringStartsWith(column("title"), param("uta")).to_sql(),
            r#""title" LIKE $1 || '%'"#,
            "uta"
        );
        assert_binding!(
            Predicate::StringContains(column("title"), param("wak")).to_sql(),
            r#""title" LIKE '%' || $1 || '%'"#,
            "wak"
        );
    }

    #[test]
    fn spatial_predicates() {
        let area = Operand::Geometry {
            wkt: SqlValue::from("POINT(1 2)"),
            srid: SqlValue::from(4326),
        };

        assert_binding!(
            Predicate::Spatial(SpatialRelation::Within, column("geom"), area.clone()).to_sql(),
            r#"ST_Within("geom", ST_GeomFromText($1, $2))"#,
            "POINT(1 2)",
            4326
        );
        assert_binding!(
            Predicate::DWithin(column("geom"), area, param(100.0)).to_sql(),
            r#"ST_DWithin("geom", ST_GeomFromText($1, $2), $3)"#,
            "POINT(1 2)",
            4326,
            100.0
        );
    }
}
