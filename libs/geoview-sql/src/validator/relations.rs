// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Heuristic discovery of the relations a statement reads from.

use std::ops::Range;

use crate::compiler::RelationRef;

use super::scanner::{Token, TokenKind};

/// Words that end a relation in a FROM list rather than alias it
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "join", "inner", "left", "right", "full", "cross", "natural", "on", "using", "group",
    "order", "limit", "offset", "union", "intersect", "except", "window", "having", "fetch", "for",
    "tablesample", "with",
];

/// Relations named after `FROM` and `JOIN`, and by `TABLE name`, anywhere in the statement
/// (including subqueries and CTE bodies). CTE names are skipped where they are in scope, as are
/// set-returning function calls; unqualified names are placed in `default_schema`.
///
/// `tokens` must not contain comments.
pub(super) fn referenced_relations(tokens: &[Token], default_schema: &str) -> Vec<RelationRef> {
    let ctes = cte_scopes(tokens);
    let mut relations = vec![];
    let mut report = |parts: Vec<String>, at: usize| {
        relations.extend(to_relation(parts, at, &ctes, default_schema))
    };

    // Whether a SELECT has been seen at each parenthesis depth. A FROM only introduces relations
    // in a query; inside `EXTRACT(year FROM ts)` it doesn't.
    let mut in_query = vec![false];

    for (index, token) in tokens.iter().enumerate() {
        if token.is_punct('(') {
            in_query.push(false);
        } else if token.is_punct(')') {
            if in_query.len() > 1 {
                in_query.pop();
            }
        } else if token.is_keyword("SELECT") {
            if let Some(top) = in_query.last_mut() {
                *top = true;
            }
        } else if token.is_keyword("FROM") {
            if in_query.last() == Some(&true) && !is_distinct_from(tokens, index) {
                read_relation_list(tokens, index + 1, true, &mut report);
            }
        } else if token.is_keyword("JOIN") || token.is_keyword("TABLE") {
            // `TABLE name` is shorthand for `SELECT * FROM name`
            read_relation_list(tokens, index + 1, false, &mut report);
        }
    }

    relations
}

fn to_relation(
    mut parts: Vec<String>,
    at: usize,
    ctes: &[CteScope],
    default_schema: &str,
) -> Option<RelationRef> {
    let table = parts.pop()?;
    match parts.pop() {
        Some(schema) => Some(RelationRef { schema, table }),
        None if ctes.iter().any(|cte| cte.name == table && cte.visible.contains(&at)) => None,
        None => Some(RelationRef {
            schema: default_schema.to_string(),
            table,
        }),
    }
}

/// `a IS [NOT] DISTINCT FROM b`
fn is_distinct_from(tokens: &[Token], from_index: usize) -> bool {
    from_index >= 2
        && tokens[from_index - 1].is_keyword("DISTINCT")
        && (tokens[from_index - 2].is_keyword("IS") || tokens[from_index - 2].is_keyword("NOT"))
}

/// Read `rel [AS alias [(cols)]] [, rel ...]` starting at `index`, reporting each relation's
/// name parts. Subqueries are skipped here; the caller's scan reaches their own FROM clauses.
fn read_relation_list(
    tokens: &[Token],
    mut index: usize,
    allow_comma_list: bool,
    on_relation: &mut dyn FnMut(Vec<String>, usize),
) {
    loop {
        while tokens
            .get(index)
            .is_some_and(|token| token.is_keyword("LATERAL") || token.is_keyword("ONLY"))
        {
            index += 1;
        }

        let Some(token) = tokens.get(index) else {
            return;
        };

        if token.is_punct('(') {
            index = skip_group(tokens, index);
        } else if let Some(first) = token.identifier() {
            let at = index;
            let mut parts = vec![first];
            index += 1;

            while tokens.get(index).is_some_and(|token| token.is_punct('.')) {
                match tokens.get(index + 1).and_then(Token::identifier) {
                    Some(part) => {
                        parts.push(part);
                        index += 2;
                    }
                    None => break,
                }
            }

            if tokens.get(index).is_some_and(|token| token.is_punct('(')) {
                // A function call such as `generate_series(1, 10)`
                index = skip_group(tokens, index);
            } else {
                on_relation(parts, at);
            }
        } else {
            return;
        }

        if tokens.get(index).is_some_and(|token| token.is_keyword("AS")) {
            index += 1;
        }
        if tokens.get(index).is_some_and(is_alias) {
            index += 1;
            if tokens.get(index).is_some_and(|token| token.is_punct('(')) {
                index = skip_group(tokens, index);
            }
        }

        if allow_comma_list && tokens.get(index).is_some_and(|token| token.is_punct(',')) {
            index += 1;
        } else {
            return;
        }
    }
}

fn is_alias(token: &Token) -> bool {
    match token.kind {
        TokenKind::QuotedIdentifier => true,
        TokenKind::Word => !CLAUSE_KEYWORDS
            .iter()
            .any(|keyword| token.text.eq_ignore_ascii_case(keyword)),
        _ => false,
    }
}

/// Index just past the parenthesis matching the one at `open`
fn skip_group(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return index + 1;
            }
        }
    }
    tokens.len()
}

/// A CTE name and the token range in which it hides a relation of the same name
struct CteScope {
    name: String,
    visible: Range<usize>,
}

/// CTEs defined by `WITH [RECURSIVE] name [(cols)] AS [[NOT] MATERIALIZED] (...) [, ...]`.
///
/// A CTE is visible from the end of its own definition (from its name, under `RECURSIVE`) to the
/// end of the query that carries the `WITH`.
fn cte_scopes(tokens: &[Token]) -> Vec<CteScope> {
    let mut scopes = vec![];

    for (with_index, _) in tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| token.is_keyword("WITH"))
    {
        let query_end = enclosing_group_end(tokens, with_index);
        let mut index = with_index + 1;
        let recursive = tokens.get(index).is_some_and(|token| token.is_keyword("RECURSIVE"));
        if recursive {
            index += 1;
        }

        loop {
            let name_index = index;
            let Some(name) = tokens.get(index).and_then(Token::identifier) else {
                break;
            };
            index += 1;

            if tokens.get(index).is_some_and(|token| token.is_punct('(')) {
                index = skip_group(tokens, index);
            }
            if !tokens.get(index).is_some_and(|token| token.is_keyword("AS")) {
                break;
            }
            index += 1;
            if tokens.get(index).is_some_and(|token| token.is_keyword("NOT")) {
                index += 1;
            }
            if tokens
                .get(index)
                .is_some_and(|token| token.is_keyword("MATERIALIZED"))
            {
                index += 1;
            }
            if !tokens.get(index).is_some_and(|token| token.is_punct('(')) {
                break;
            }

            index = skip_group(tokens, index);
            let visible_from = if recursive { name_index } else { index };
            scopes.push(CteScope {
                name,
                visible: visible_from..query_end,
            });

            if tokens.get(index).is_some_and(|token| token.is_punct(',')) {
                index += 1;
            } else {
                break;
            }
        }
    }

    scopes
}

/// Index of the `)` closing the group that contains `index`, or the end of the statement
fn enclosing_group_end(tokens: &[Token], index: usize) -> usize {
    let mut depth = 0usize;
    for (position, token) in tokens.iter().enumerate().skip(index) {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            if depth == 0 {
                return position;
            }
            depth -= 1;
        }
    }
    tokens.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::scanner::scan;

    fn relations(sql: &str) -> Vec<String> {
        referenced_relations(&scan(sql).tokens, "public")
            .into_iter()
            .map(|relation| format!("{}.{}", relation.schema, relation.table))
            .collect()
    }

    #[test]
    fn from_and_joins() {
        assert_eq!(
            relations(
                r#"SELECT * FROM "public"."countries" AS c JOIN geo.cities ci ON ci.cid = c.id LEFT JOIN rivers USING (id)"#
            ),
            vec!["public.countries", "geo.cities", "public.rivers"]
        );
    }

    #[test]
    fn comma_lists_and_subqueries() {
        assert_eq!(
            relations(
                "SELECT * FROM a, (SELECT id FROM geo.b) AS sub (x), c WHERE a.id IN (SELECT id FROM d)"
            ),
            vec!["public.a", "public.c", "geo.b", "public.d"]
        );
    }

    #[test]
    fn ctes_and_functions_are_not_relations() {
        assert_eq!(
            relations(
                "WITH big AS (SELECT * FROM countries), nums (n) AS MATERIALIZED (SELECT 1) SELECT * FROM big, generate_series(1, 3) g, nums"
            ),
            vec!["public.countries"]
        );
    }

    #[test]
    fn non_query_from() {
        assert_eq!(
            relations(
                "SELECT EXTRACT(year FROM created_at), SUBSTRING(name FROM 1 FOR 3) FROM events WHERE a IS DISTINCT FROM b"
            ),
            vec!["public.events"]
        );
    }

    #[test]
    fn case_folding() {
        assert_eq!(
            relations(r#"SELECT * FROM Geo.Countries, "Geo"."Countries""#),
            vec!["geo.countries", "Geo.Countries"]
        );
    }

    #[test]
    fn table_shorthand() {
        assert_eq!(
            relations("SELECT * FROM countries WHERE id IN (TABLE private.secrets)"),
            vec!["public.countries", "private.secrets"]
        );
        assert_eq!(
            relations("WITH big AS (SELECT * FROM countries) TABLE big"),
            vec!["public.countries"]
        );
    }

    #[test]
    fn cte_names_are_scoped() {
        // The inner `users` CTE ends with its subquery; the outer `users` is the real table
        assert_eq!(
            relations(
                "SELECT * FROM countries, (WITH users AS (SELECT 1) SELECT * FROM users) AS s, users"
            ),
            vec!["public.countries", "public.users"]
        );
        // Without RECURSIVE a CTE can't see itself or later CTEs
        assert_eq!(
            relations("WITH a AS (SELECT * FROM b), b AS (SELECT 1) SELECT * FROM a, b"),
            vec!["public.b"]
        );
        assert_eq!(
            relations(
                "WITH RECURSIVE t (n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM t) SELECT * FROM t"
            ),
            Vec::<String>::new()
        );
    }
}
