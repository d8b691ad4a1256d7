// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::LazyLock;

use regex::Regex;

use super::{ExpressionBuilder, SqlBuilder};

static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Validate a single identifier (schema, table, column or alias name) and return it without any
/// surrounding double quotes.
///
/// Accepts `name` and `"name"`; the name itself must consist of letters, digits and underscores and
/// must not start with a digit. Returns `None` for anything else.
pub fn sanitize_identifier(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unquoted = match trimmed.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"')?,
        None => trimmed,
    };

    IDENTIFIER_REGEX.is_match(unquoted).then_some(unquoted)
}

/// A reference to a column as it appears in a query definition: `column`, `relation.column`,
/// `schema.relation.column`, `*` or `relation.*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: Vec<String>,
    pub column: ColumnName,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnName {
    Named(String),
    Wildcard,
}

impl ColumnRef {
    /// Parse a column reference. Returns the offending part when one of the parts isn't a valid
    /// identifier.
    pub fn parse(raw: &str) -> Result<ColumnRef, String> {
        let parts: Vec<&str> = raw.trim().split('.').collect();

        if parts.len() > 3 {
            return Err(raw.to_string());
        }

        let (last, qualifier) = parts.split_last().ok_or_else(|| raw.to_string())?;

        let qualifier = qualifier
            .iter()
            .map(|part| {
                sanitize_identifier(part)
                    .map(str::to_string)
                    .ok_or_else(|| part.to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let column = if last.trim() == "*" {
            ColumnName::Wildcard
        } else {
            ColumnName::Named(
                sanitize_identifier(last)
                    .ok_or_else(|| last.to_string())?
                    .to_string(),
            )
        };

        Ok(ColumnRef { qualifier, column })
    }

    pub fn is_wildcard(&self) -> bool {
        self.column == ColumnName::Wildcard
    }

    /// The bare column name, if this isn't a wildcard
    pub fn name(&self) -> Option<&str> {
        match &self.column {
            ColumnName::Named(name) => Some(name),
            ColumnName::Wildcard => None,
        }
    }

    /// The relation (last qualifier part), if the reference is qualified
    pub fn relation(&self) -> Option<&str> {
        self.qualifier.last().map(String::as_str)
    }
}

impl ExpressionBuilder for ColumnRef {
    /// Build `"relation"."column"`, `"column"` or `"relation".*`
    fn build(&self, builder: &mut SqlBuilder) {
        for part in &self.qualifier {
            builder.push_identifier(part);
            builder.push('.');
        }
        match &self.column {
            ColumnName::Named(name) => builder.push_identifier(name),
            ColumnName::Wildcard => builder.push('*'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_quoted_identifiers() {
        assert_eq!(sanitize_identifier("countries"), Some("countries"));
        assert_eq!(sanitize_identifier("\"Countries\""), Some("Countries"));
        assert_eq!(sanitize_identifier("_tmp1"), Some("_tmp1"));
    }

    #[test]
    fn unsafe_identifiers_are_rejected() {
        assert_eq!(sanitize_identifier("1abc"), None);
        assert_eq!(sanitize_identifier("name; DROP TABLE x"), None);
        assert_eq!(sanitize_identifier("\"a\"\"b\""), None);
        assert_eq!(sanitize_identifier("\"unterminated"), None);
        assert_eq!(sanitize_identifier(""), None);
    }

    #[test]
    fn column_references() {
        assert_binding!(ColumnRef::parse("name").unwrap().to_sql(), r#""name""#);
        assert_binding!(
            ColumnRef::parse("c.name").unwrap().to_sql(),
            r#""c"."name""#
        );
        assert_binding!(ColumnRef::parse("c.*").unwrap().to_sql(), r#""c".*"#);
        assert_binding!(ColumnRef::parse("*").unwrap().to_sql(), "*");

        assert_eq!(ColumnRef::parse("a.b.c.d"), Err("a.b.c.d".to_string()));
        assert_eq!(ColumnRef::parse("c.na-me"), Err("na-me".to_string()));
    }
}
