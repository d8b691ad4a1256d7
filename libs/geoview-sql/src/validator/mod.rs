// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The safety gate every SQL statement passes before it is executed or published.
//!
//! Checks run in a fixed order and the first failure decides the verdict:
//!
//! 1. The statement begins with `SELECT` or `WITH` (ignoring leading comments).
//! 2. No injection patterns: stacked statements, comments after the statement starts,
//!    unterminated literals, `UNION` (unless allowed, and even then never against system catalogs).
//! 3. No write or locking keywords and no side-effecting functions anywhere.
//! 4. Placeholders agree with the supplied parameters.
//! 5. Every relation read is on the allow-list, if one is configured.
//! 6. A top-level limit exists and is a literal within bounds, otherwise the statement is rewritten
//!    (a computed limit is bounded by wrapping the statement in an outer `LIMIT`).

mod policy;
mod relations;
pub mod scanner;
mod verdict;

use tracing::{debug, warn};

use crate::{compiler::CompiledStatement, sql::SqlValue};

pub use policy::{AllowList, DEFAULT_LIMIT, ValidatorPolicy};
pub use verdict::{
    Outcome, ReasonCode, ValidatedStatement, ValidationRejected, ValidationVerdict, VerdictReason,
};

use relations::referenced_relations;
use scanner::{Scan, Token, TokenKind, scan};

const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "DROP", "TRUNCATE", "ALTER", "GRANT", "REVOKE",
    "CREATE", "COPY", "EXECUTE", "CALL",
];

/// Functions that change server state even when called from a SELECT
const SIDE_EFFECT_FUNCTIONS: &[&str] = &[
    "pg_terminate_backend",
    "pg_cancel_backend",
    "pg_reload_conf",
    "pg_rotate_logfile",
    "set_config",
    "nextval",
    "setval",
    "lo_import",
    "lo_export",
    "lo_unlink",
    "pg_read_file",
    "pg_read_binary_file",
    "pg_ls_dir",
    "dblink",
    "dblink_exec",
];

#[derive(Debug, Clone, Default)]
pub struct Validator {
    policy: ValidatorPolicy,
}

/// A verdict along with the statement text to run when it isn't a rejection
struct Assessment {
    verdict: ValidationVerdict,
    sql: String,
}

impl Validator {
    pub fn new(policy: ValidatorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidatorPolicy {
        &self.policy
    }

    /// Validate SQL text. When `parameters` is supplied, placeholders are checked against it.
    pub fn validate(&self, sql: &str, parameters: Option<&[SqlValue]>) -> ValidationVerdict {
        self.assess(sql, parameters).verdict
    }

    /// Validate a compiled statement, producing the form accepted by the executor and publisher.
    pub fn validate_statement(
        &self,
        statement: CompiledStatement,
    ) -> Result<ValidatedStatement, ValidationRejected> {
        let Assessment { verdict, sql } =
            self.assess(&statement.sql, Some(statement.parameters.as_slice()));

        if let Some(reason) = verdict.reasons.first().filter(|_| verdict.is_rejected()) {
            return Err(reason.clone().into());
        }

        Ok(ValidatedStatement::new(
            sql,
            statement.parameters,
            statement.output_columns,
            verdict,
        ))
    }

    fn assess(&self, sql: &str, parameters: Option<&[SqlValue]>) -> Assessment {
        match self.check(sql, parameters) {
            Ok(assessment) => {
                if let Some(rewritten) = &assessment.verdict.rewritten_sql {
                    debug!(%sql, %rewritten, "Rewrote SQL statement");
                }
                assessment
            }
            Err(reason) => {
                warn!(code = %reason.code, message = %reason.message, "Rejected SQL statement");
                Assessment {
                    verdict: ValidationVerdict::reject(reason),
                    sql: sql.to_string(),
                }
            }
        }
    }

    fn check(&self, sql: &str, parameters: Option<&[SqlValue]>) -> Result<Assessment, VerdictReason> {
        let Scan {
            tokens,
            unterminated,
        } = scan(sql);

        // Leading comments are harmless; anything from the first real token on is the statement
        let Some(start) = tokens
            .iter()
            .position(|token| !token.is_comment() && !token.is_punct(';'))
        else {
            return Err(VerdictReason::new(
                ReasonCode::EmptyStatement,
                "The statement is empty",
            ));
        };
        let tokens = &tokens[start..];

        let verb = &tokens[0];
        if !(verb.is_keyword("SELECT") || verb.is_keyword("WITH")) {
            return Err(VerdictReason::new(
                ReasonCode::WriteOperationBlocked,
                format!(
                    "Only SELECT statements are allowed, found '{}'",
                    verb.text.to_uppercase()
                ),
            ));
        }

        if let Some(unterminated) = unterminated {
            return Err(VerdictReason::new(
                ReasonCode::InjectionPatternDetected,
                format!(
                    "Unterminated {} at offset {}",
                    unterminated.what, unterminated.offset
                ),
            ));
        }

        if let Some(comment) = tokens.iter().find(|token| token.is_comment()) {
            return Err(VerdictReason::new(
                ReasonCode::InjectionPatternDetected,
                format!(
                    "Comments are not allowed within a statement (offset {})",
                    comment.span.start
                ),
            ));
        }

        let tokens = match tokens.iter().position(|token| token.is_punct(';')) {
            Some(semicolon) if semicolon + 1 < tokens.len() => {
                return Err(VerdictReason::new(
                    ReasonCode::InjectionPatternDetected,
                    "Multiple statements are not allowed",
                ));
            }
            Some(semicolon) => &tokens[..semicolon],
            None => tokens,
        };

        self.check_union(tokens)?;
        check_writes(tokens)?;
        check_parameters(tokens, parameters)?;
        self.check_relations(tokens)?;

        let statement_start = tokens[0].span.start;
        let statement_end = tokens.last().map_or(statement_start, |token| token.span.end);

        Ok(self.apply_limit(&sql[statement_start..statement_end], statement_start, tokens))
    }

    fn check_union(&self, tokens: &[Token]) -> Result<(), VerdictReason> {
        for (index, token) in tokens.iter().enumerate() {
            if !token.is_keyword("UNION") {
                continue;
            }

            if !self.policy.allow_union {
                return Err(VerdictReason::new(
                    ReasonCode::InjectionPatternDetected,
                    "UNION is not allowed",
                ));
            }

            if let Some(catalog) = tokens[index + 1..]
                .iter()
                .filter_map(Token::identifier)
                .find(|identifier| is_system_catalog(identifier))
            {
                return Err(VerdictReason::new(
                    ReasonCode::InjectionPatternDetected,
                    format!("UNION reads from system catalog '{catalog}'"),
                ));
            }
        }

        Ok(())
    }

    fn check_relations(&self, tokens: &[Token]) -> Result<(), VerdictReason> {
        let Some(allow_list) = &self.policy.allowed_relations else {
            return Ok(());
        };

        match referenced_relations(tokens, &self.policy.default_schema)
            .into_iter()
            .find(|relation| !allow_list.allows(relation))
        {
            Some(relation) => Err(VerdictReason::new(
                ReasonCode::SchemaNotAllowed,
                format!(
                    "Relation '{}.{}' is not allowed",
                    relation.schema, relation.table
                ),
            )),
            None => Ok(()),
        }
    }

    /// `statement` is the statement text, which starts at `offset` in the scanned input.
    fn apply_limit(&self, statement: &str, offset: usize, tokens: &[Token]) -> Assessment {
        let default_limit = self.policy.effective_default_limit();

        let replace = |token: &Token, replacement: u64| {
            let span = token.span.start - offset..token.span.end - offset;
            let mut sql = statement.to_string();
            sql.replace_range(span, &replacement.to_string());
            sql
        };

        let count_token = match top_level_limit(tokens) {
            None => {
                let sql = format!("{statement} LIMIT {default_limit}");
                return Assessment {
                    verdict: ValidationVerdict::rewrite(
                        sql.clone(),
                        VerdictReason::new(
                            ReasonCode::LimitInjected,
                            format!("Appended LIMIT {default_limit}"),
                        ),
                    ),
                    sql,
                };
            }
            Some(LimitCount::All(token)) => {
                let sql = replace(token, default_limit);
                return Assessment {
                    verdict: ValidationVerdict::rewrite(
                        sql.clone(),
                        VerdictReason::new(
                            ReasonCode::LimitInjected,
                            format!(
                                "Replaced LIMIT {} with LIMIT {default_limit}",
                                token.text.to_uppercase()
                            ),
                        ),
                    ),
                    sql,
                };
            }
            Some(LimitCount::Literal(token)) => token,
            Some(LimitCount::SingleRow) => {
                return Assessment {
                    verdict: ValidationVerdict::accept(),
                    sql: statement.to_string(),
                };
            }
            Some(LimitCount::Expression) => {
                // The count is only known at run time, so bound the whole statement
                let bound = self.policy.max_limit.unwrap_or(default_limit);
                let sql =
                    format!(r#"SELECT * FROM ({statement}) AS "geoview_limited" LIMIT {bound}"#);
                return Assessment {
                    verdict: ValidationVerdict::rewrite(
                        sql.clone(),
                        VerdictReason::new(
                            ReasonCode::LimitInjected,
                            format!("Bounded a computed limit with LIMIT {bound}"),
                        ),
                    ),
                    sql,
                };
            }
        };

        match (count_token.text.parse::<u64>(), self.policy.max_limit) {
            (Ok(count), Some(max)) if count > max => {
                let sql = replace(count_token, max);
                Assessment {
                    verdict: ValidationVerdict::rewrite(
                        sql.clone(),
                        VerdictReason::new(
                            ReasonCode::LimitClamped,
                            format!("Lowered limit {count} to {max}"),
                        ),
                    ),
                    sql,
                }
            }
            _ => Assessment {
                verdict: ValidationVerdict::accept(),
                sql: statement.to_string(),
            },
        }
    }
}

fn is_system_catalog(identifier: &str) -> bool {
    identifier == "pg_catalog" || identifier == "information_schema" || identifier.starts_with("pg_")
}

fn check_writes(tokens: &[Token]) -> Result<(), VerdictReason> {
    let blocked = |message: String| Err(VerdictReason::new(ReasonCode::WriteOperationBlocked, message));

    for (index, token) in tokens.iter().enumerate() {
        let next = tokens.get(index + 1);

        // `"set_config"(...)` calls the same function as `set_config(...)`
        if let Some(function) = token
            .identifier()
            .filter(|_| next.is_some_and(|next| next.is_punct('(')))
            .filter(|name| SIDE_EFFECT_FUNCTIONS.contains(&name.as_str()))
        {
            return blocked(format!("Function '{function}' is not allowed"));
        }

        if token.kind != TokenKind::Word {
            continue;
        }

        if let Some(keyword) = WRITE_KEYWORDS
            .iter()
            .find(|keyword| token.is_keyword(keyword))
        {
            return blocked(format!("'{keyword}' is not allowed"));
        }
        if token.is_keyword("INTO") {
            return blocked("SELECT ... INTO is not allowed".to_string());
        }
        // Row locks: FOR SHARE, FOR KEY SHARE, FOR NO KEY UPDATE (FOR UPDATE is caught above)
        if token.is_keyword("FOR")
            && next.is_some_and(|next| {
                next.is_keyword("SHARE") || next.is_keyword("KEY") || next.is_keyword("NO")
            })
        {
            return blocked("Row locking clauses are not allowed".to_string());
        }
    }

    Ok(())
}

fn check_parameters(tokens: &[Token], parameters: Option<&[SqlValue]>) -> Result<(), VerdictReason> {
    let Some(parameters) = parameters else {
        return Ok(());
    };

    let placeholders: Vec<usize> = tokens
        .iter()
        .filter_map(|token| match token.kind {
            TokenKind::Placeholder(index) => Some(index),
            _ => None,
        })
        .collect();

    let highest = placeholders.iter().copied().max().unwrap_or(0);

    if placeholders.contains(&0) || highest != parameters.len() {
        return Err(VerdictReason::new(
            ReasonCode::ParameterMismatch,
            format!(
                "The statement uses {highest} parameter(s) but {} were supplied",
                parameters.len()
            ),
        ));
    }

    Ok(())
}

enum LimitCount<'t, 'a> {
    /// `LIMIT ALL` or `LIMIT NULL`
    All(&'t Token<'a>),
    /// `LIMIT 10`, `FETCH FIRST 10 ROWS ONLY`
    Literal(&'t Token<'a>),
    /// `FETCH FIRST ROW ONLY`
    SingleRow,
    /// A parameter, subquery or other expression
    Expression,
}

/// The row count of the top-level `LIMIT` or `FETCH` clause, if there is one
fn top_level_limit<'t, 'a>(tokens: &'t [Token<'a>]) -> Option<LimitCount<'t, 'a>> {
    let mut depth = 0usize;

    for (index, token) in tokens.iter().enumerate() {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_keyword("LIMIT") {
            return Some(match (tokens.get(index + 1), tokens.get(index + 2)) {
                (Some(count), _) if count.is_keyword("ALL") || count.is_keyword("NULL") => {
                    LimitCount::All(count)
                }
                (Some(count), next) if count.kind == TokenKind::Number && ends_count(next) => {
                    LimitCount::Literal(count)
                }
                _ => LimitCount::Expression,
            });
        } else if depth == 0 && token.is_keyword("FETCH") {
            // FETCH { FIRST | NEXT } [ count ] { ROW | ROWS } { ONLY | WITH TIES }
            return Some(match tokens.get(index + 2) {
                Some(count) if count.is_keyword("ROW") || count.is_keyword("ROWS") => {
                    LimitCount::SingleRow
                }
                Some(count)
                    if count.kind == TokenKind::Number
                        && tokens
                            .get(index + 3)
                            .is_some_and(|next| next.is_keyword("ROW") || next.is_keyword("ROWS")) =>
                {
                    LimitCount::Literal(count)
                }
                _ => LimitCount::Expression,
            });
        }
    }

    None
}

/// Whether the token after a literal count ends the count (`LIMIT 10 + $1` doesn't)
fn ends_count(next: Option<&Token>) -> bool {
    next.is_none_or(|next| next.is_keyword("OFFSET") || next.is_keyword("FOR") || next.is_punct(')'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::default()
    }

    fn rejection(sql: &str) -> ReasonCode {
        let verdict = validator().validate(sql, None);
        assert_eq!(verdict.outcome, Outcome::Reject, "{sql}");
        verdict.reasons[0].code
    }

    #[test]
    fn accepts_bounded_select() {
        let verdict = validator().validate("SELECT * FROM countries LIMIT 10", None);
        assert_eq!(verdict, ValidationVerdict::accept());
    }

    #[test]
    fn non_select_statements() {
        assert_eq!(
            rejection("DROP TABLE countries;"),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection("  /* hi */ -- there\n delete from countries"),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection("explain analyze select 1"),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(rejection("   "), ReasonCode::EmptyStatement);
        assert_eq!(rejection("-- only a comment"), ReasonCode::EmptyStatement);
    }

    #[test]
    fn stacked_statements() {
        assert_eq!(
            rejection("SELECT * FROM countries; DELETE FROM countries"),
            ReasonCode::InjectionPatternDetected
        );
        assert_eq!(
            rejection("SELECT 1;;"),
            ReasonCode::InjectionPatternDetected
        );
    }

    #[test]
    fn semicolons_in_literals_are_text() {
        let verdict = validator().validate("SELECT 'a;b' AS x LIMIT 1", None);
        assert_eq!(verdict.outcome, Outcome::Accept);
    }

    #[test]
    fn trailing_semicolon_is_stripped() {
        let validated = validator()
            .validate_statement(CompiledStatement::from_text(
                "SELECT * FROM countries LIMIT 5;  ",
                vec![],
            ))
            .unwrap();

        assert_eq!(validated.sql(), "SELECT * FROM countries LIMIT 5");
        assert_eq!(validated.verdict().outcome, Outcome::Accept);
    }

    #[test]
    fn comments_and_unterminated_input() {
        assert_eq!(
            rejection("SELECT * FROM users WHERE name = 'x' -- AND active"),
            ReasonCode::InjectionPatternDetected
        );
        assert_eq!(
            rejection("SELECT * FROM users /* WHERE id = 1 */ LIMIT 1"),
            ReasonCode::InjectionPatternDetected
        );
        assert_eq!(
            rejection("SELECT * FROM users WHERE name = 'x"),
            ReasonCode::InjectionPatternDetected
        );
    }

    #[test]
    fn union_probing() {
        assert_eq!(
            rejection("SELECT name FROM countries UNION SELECT usename FROM pg_user"),
            ReasonCode::InjectionPatternDetected
        );

        let permissive = Validator::new(ValidatorPolicy {
            allow_union: true,
            ..Default::default()
        });
        assert_eq!(
            permissive
                .validate(
                    "SELECT name FROM countries UNION SELECT table_name FROM information_schema.tables LIMIT 5",
                    None
                )
                .reasons[0]
                .code,
            ReasonCode::InjectionPatternDetected
        );
        assert_eq!(
            permissive
                .validate(
                    "SELECT name FROM countries UNION SELECT name FROM cities LIMIT 5",
                    None
                )
                .outcome,
            Outcome::Accept
        );
    }

    #[test]
    fn writes_hidden_inside_selects() {
        assert_eq!(
            rejection("WITH gone AS (DELETE FROM countries RETURNING *) SELECT * FROM gone"),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection("SELECT * INTO backup FROM countries"),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection("SELECT * FROM countries FOR UPDATE"),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection("SELECT * FROM countries FOR KEY SHARE"),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection("SELECT pg_terminate_backend(42)"),
            ReasonCode::WriteOperationBlocked
        );
    }

    #[test]
    fn quoted_function_names_are_blocked() {
        assert_eq!(
            rejection(r#"SELECT "set_config"('a', 'b', false) LIMIT 1"#),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection(r#"SELECT pg_catalog."pg_terminate_backend"(1) LIMIT 1"#),
            ReasonCode::WriteOperationBlocked
        );
        assert_eq!(
            rejection("SELECT PG_TERMINATE_BACKEND (1) LIMIT 1"),
            ReasonCode::WriteOperationBlocked
        );
        // Quoted names keep their case, so this is a different (user-defined) function
        assert_eq!(
            validator()
                .validate(r#"SELECT "Set_Config"('a') LIMIT 1"#, None)
                .outcome,
            Outcome::Accept
        );
    }

    #[test]
    fn keywords_in_literals_and_identifiers_are_fine() {
        let verdict = validator().validate(
            r#"SELECT "update", 'DROP TABLE x' FROM logs WHERE note = $$delete$$ LIMIT 3"#,
            None,
        );
        assert_eq!(verdict.outcome, Outcome::Accept);
    }

    #[test]
    fn parameter_counts() {
        let validate = |sql: &str, parameters: Vec<SqlValue>| {
            validator().validate(sql, Some(parameters.as_slice()))
        };

        assert_eq!(
            validate("SELECT * FROM t WHERE a = $1 AND b = $2 LIMIT 1", vec![1.into(), 2.into()])
                .outcome,
            Outcome::Accept
        );
        assert_eq!(
            validate("SELECT * FROM t WHERE a = $2 LIMIT 1", vec![1.into()]).reasons[0].code,
            ReasonCode::ParameterMismatch
        );
        assert_eq!(
            validate("SELECT * FROM t LIMIT 1", vec![1.into()]).reasons[0].code,
            ReasonCode::ParameterMismatch
        );
    }

    #[test]
    fn allow_list() {
        let restricted = Validator::new(ValidatorPolicy {
            allowed_relations: Some(AllowList::new(["public.countries", "geo"])),
            ..Default::default()
        });

        let outcome = |sql: &str| restricted.validate(sql, None);

        assert_eq!(
            outcome("SELECT * FROM countries c JOIN geo.cities ci ON ci.cid = c.id LIMIT 1")
                .outcome,
            Outcome::Accept
        );
        assert_eq!(
            outcome("SELECT * FROM countries WHERE id IN (SELECT uid FROM users)").reasons[0]
                .code,
            ReasonCode::SchemaNotAllowed
        );
        let table_shorthand =
            outcome("SELECT * FROM countries WHERE id IN (TABLE private.secrets) LIMIT 1");
        assert_eq!(table_shorthand.reasons[0].code, ReasonCode::SchemaNotAllowed);

        // A CTE named `users` inside a subquery doesn't hide the real table outside it
        let shadowed = outcome(
            "SELECT * FROM countries, (WITH users AS (SELECT 1) SELECT * FROM users) AS u, users LIMIT 1",
        );
        assert_eq!(shadowed.reasons[0].code, ReasonCode::SchemaNotAllowed);

        // Rejection dominates the missing limit rewrite
        assert_eq!(
            outcome("SELECT * FROM private.secrets").outcome,
            Outcome::Reject
        );
    }

    #[test]
    fn missing_limit_is_injected() {
        let verdict = validator().validate("SELECT * FROM countries WHERE id = $1", None);

        assert_eq!(verdict.outcome, Outcome::Rewrite);
        assert_eq!(verdict.reasons[0].code, ReasonCode::LimitInjected);

        let rewritten = verdict.rewritten_sql.unwrap();
        assert_eq!(rewritten, "SELECT * FROM countries WHERE id = $1 LIMIT 1000");
        assert_eq!(
            validator().validate(&rewritten, None).outcome,
            Outcome::Accept
        );
    }

    #[test]
    fn nested_limits_dont_count() {
        let verdict = validator().validate(
            "SELECT * FROM (SELECT * FROM countries LIMIT 5) AS c",
            None,
        );
        assert_eq!(
            verdict.rewritten_sql.as_deref(),
            Some("SELECT * FROM (SELECT * FROM countries LIMIT 5) AS c LIMIT 1000")
        );
    }

    #[test]
    fn limit_all_and_clamping() {
        let clamping = Validator::new(ValidatorPolicy {
            default_limit: 100,
            max_limit: Some(500),
            ..Default::default()
        });

        assert_eq!(
            clamping
                .validate("SELECT * FROM countries LIMIT ALL OFFSET 5", None)
                .rewritten_sql
                .as_deref(),
            Some("SELECT * FROM countries LIMIT 100 OFFSET 5")
        );

        let verdict = clamping.validate("SELECT * FROM countries LIMIT 100000", None);
        assert_eq!(verdict.reasons[0].code, ReasonCode::LimitClamped);
        assert_eq!(
            verdict.rewritten_sql.as_deref(),
            Some("SELECT * FROM countries LIMIT 500")
        );

        assert_eq!(
            clamping
                .validate("SELECT * FROM countries FETCH FIRST 900 ROWS ONLY", None)
                .rewritten_sql
                .as_deref(),
            Some("SELECT * FROM countries FETCH FIRST 500 ROWS ONLY")
        );

        assert_eq!(
            clamping
                .validate("SELECT * FROM countries LIMIT NULL", None)
                .rewritten_sql
                .as_deref(),
            Some("SELECT * FROM countries LIMIT 100")
        );
        assert_eq!(
            clamping
                .validate("SELECT * FROM countries FETCH FIRST ROW ONLY", None)
                .outcome,
            Outcome::Accept
        );
    }

    #[test]
    fn computed_limits_are_bounded() {
        let clamping = Validator::new(ValidatorPolicy {
            max_limit: Some(500),
            ..Default::default()
        });

        let verdict = clamping.validate(
            "SELECT * FROM countries LIMIT $1",
            Some(&[SqlValue::Int(10)][..]),
        );
        assert_eq!(verdict.reasons[0].code, ReasonCode::LimitInjected);
        assert_eq!(
            verdict.rewritten_sql.as_deref(),
            Some(r#"SELECT * FROM (SELECT * FROM countries LIMIT $1) AS "geoview_limited" LIMIT 500"#)
        );

        let rewritten = clamping
            .validate("SELECT * FROM countries LIMIT (SELECT count(*) FROM cities)", None)
            .rewritten_sql
            .unwrap();
        assert!(rewritten.ends_with(r#") AS "geoview_limited" LIMIT 500"#));
        assert_eq!(clamping.validate(&rewritten, None).outcome, Outcome::Accept);

        // Without a maximum the default limit bounds the statement
        assert_eq!(
            validator()
                .validate("SELECT * FROM countries LIMIT 10 * 1000", None)
                .rewritten_sql
                .as_deref(),
            Some(r#"SELECT * FROM (SELECT * FROM countries LIMIT 10 * 1000) AS "geoview_limited" LIMIT 1000"#)
        );
    }

    #[test]
    fn validated_statement_keeps_parameters() {
        let validated = validator()
            .validate_statement(CompiledStatement::from_text(
                r#"SELECT "name" FROM "public"."countries" WHERE "id" = $1"#,
                vec![7.into()],
            ))
            .unwrap();

        assert_eq!(
            validated.sql(),
            r#"SELECT "name" FROM "public"."countries" WHERE "id" = $1 LIMIT 1000"#
        );
        assert_eq!(validated.parameters(), &[SqlValue::Int(7)]);
        assert_eq!(validated.verdict().outcome, Outcome::Rewrite);

        let rejected = validator()
            .validate_statement(CompiledStatement::from_text("DELETE FROM t", vec![]))
            .unwrap_err();
        assert_eq!(rejected.code, ReasonCode::WriteOperationBlocked);
    }
}
