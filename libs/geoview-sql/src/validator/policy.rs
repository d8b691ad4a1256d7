// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{compiler::RelationRef, query::default_schema};

pub const DEFAULT_LIMIT: u64 = 1000;

/// What the validator enforces beyond the fixed read-only rules
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorPolicy {
    /// Appended as `LIMIT n` to statements without a top-level limit
    pub default_limit: u64,
    /// Literal limits above this are lowered to it
    pub max_limit: Option<u64>,
    pub allow_union: bool,
    /// When set, every relation a statement reads must be allowed by this list
    pub allowed_relations: Option<AllowList>,
    /// Schema assumed for unqualified relation names
    pub default_schema: String,
}

impl Default for ValidatorPolicy {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: None,
            allow_union: false,
            allowed_relations: None,
            default_schema: default_schema(),
        }
    }
}

impl ValidatorPolicy {
    /// The limit to inject, which never exceeds `max_limit`
    pub(super) fn effective_default_limit(&self) -> u64 {
        match self.max_limit {
            Some(max) => self.default_limit.min(max),
            None => self.default_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AllowEntry {
    Schema(String),
    Relation(RelationRef),
}

/// Schemas (`geo`) and relations (`public.countries`) a statement may read from. Entries are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowList {
    entries: Vec<AllowEntry>,
}

impl AllowList {
    pub fn new<S: AsRef<str>>(entries: impl IntoIterator<Item = S>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|entry| {
                let entry = entry.as_ref().trim().to_lowercase();
                match entry.split_once('.') {
                    _ if entry.is_empty() => None,
                    Some((schema, table)) => Some(AllowEntry::Relation(RelationRef {
                        schema: schema.to_string(),
                        table: table.to_string(),
                    })),
                    None => Some(AllowEntry::Schema(entry)),
                }
            })
            .collect();

        Self { entries }
    }

    pub fn allows(&self, relation: &RelationRef) -> bool {
        let schema = relation.schema.to_lowercase();
        let table = relation.table.to_lowercase();

        self.entries.iter().any(|entry| match entry {
            AllowEntry::Schema(allowed) => *allowed == schema,
            AllowEntry::Relation(allowed) => allowed.schema == schema && allowed.table == table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(schema: &str, table: &str) -> RelationRef {
        RelationRef {
            schema: schema.into(),
            table: table.into(),
        }
    }

    #[test]
    fn schema_and_relation_entries() {
        let allow_list = AllowList::new(["geo", " public.Countries ", ""]);

        assert!(allow_list.allows(&relation("geo", "anything")));
        assert!(allow_list.allows(&relation("public", "countries")));
        assert!(!allow_list.allows(&relation("public", "users")));
        assert!(!allow_list.allows(&relation("pg_catalog", "pg_user")));
    }

    #[test]
    fn default_limit_respects_max() {
        let policy = ValidatorPolicy {
            max_limit: Some(500),
            ..Default::default()
        };
        assert_eq!(policy.effective_default_limit(), 500);
        assert_eq!(ValidatorPolicy::default().effective_default_limit(), 1000);
    }
}
