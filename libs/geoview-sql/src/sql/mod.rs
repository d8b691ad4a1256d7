// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Building blocks for SQL text with bound parameters.
//!
//! Every fragment implements [`ExpressionBuilder`], and a [`SqlBuilder`] collects the text along with
//! the parameters in placeholder order.

#[macro_use]
mod test_util;

mod column;
mod expression_builder;
mod identifier;
mod join;
pub(crate) mod numeric;
mod order;
mod pagination;
mod predicate;
mod relation;
mod select;
mod sql_builder;
mod sql_value;

pub use column::{Aggregate, SelectItem};
pub use expression_builder::ExpressionBuilder;
pub use identifier::{ColumnName, ColumnRef, sanitize_identifier};
pub use join::{Join, JoinKind};
pub use order::{NullsOrder, OrderBy, OrderByElement, Ordering};
pub use pagination::{Limit, Offset};
pub use predicate::{CaseSensitivity, Operand, Predicate, SpatialRelation};
pub use relation::Relation;
pub use select::Select;
pub use sql_builder::SqlBuilder;
pub use sql_value::SqlValue;
