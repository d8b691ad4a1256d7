// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::sql::{ColumnRef, Relation};

use super::{
    error::CompileError,
    statement::RelationRef,
};

/// The relations a query definition brings into scope: the base table followed by each joined
/// table, in declaration order.
pub(super) struct Scope {
    relations: Vec<Relation>,
}

impl Scope {
    pub(super) fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    pub(super) fn all(&self) -> impl Iterator<Item = RelationRef> + '_ {
        self.relations.iter().map(relation_ref)
    }

    /// Find the relation a column reference belongs to. Unqualified references resolve to the
    /// base table. A qualifier names an alias, or the table name if the relation has no alias.
    pub(super) fn resolve(&self, column: &ColumnRef) -> Result<RelationRef, CompileError> {
        let found = match column.qualifier.as_slice() {
            [] => self.relations.first(),
            [name] => self.relations.iter().find(|relation| match &relation.alias {
                Some(alias) => alias == name,
                None => &relation.name == name,
            }),
            [schema, name] => self.relations.iter().find(|relation| {
                relation.alias.is_none() && &relation.schema == schema && &relation.name == name
            }),
            _ => None,
        };

        found.map(relation_ref).ok_or_else(|| {
            CompileError::invalid_identifier("relation", &column.qualifier.join("."))
        })
    }
}

fn relation_ref(relation: &Relation) -> RelationRef {
    RelationRef {
        schema: relation.schema.clone(),
        table: relation.name.clone(),
    }
}
