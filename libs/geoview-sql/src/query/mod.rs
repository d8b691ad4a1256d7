// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod condition;
mod definition;

pub use condition::{Condition, ConditionOperator, ConditionValue, Connective, GeometryValue};
pub use definition::{
    AggregateFunction, DEFAULT_SCHEMA, JoinDefinition, JoinOperator, JoinType, NullsPosition,
    OrderByItem, QueryDefinition, SelectColumn, SortDirection,
};
pub(crate) use definition::default_schema;
