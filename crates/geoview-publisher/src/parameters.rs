// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Turning `$n` placeholders into view parameters, so that bound values never become part of the
//! published SQL text.

use std::sync::LazyLock;

use geoview_sql::{
    SqlValue,
    validator::scanner::{TokenKind, scan},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::PublishError;

const BOOLEAN_VALIDATOR: &str = r"^(true|false)$";
const INTEGER_VALIDATOR: &str = r"^-?\d+$";
const FLOAT_VALIDATOR: &str = r"^-?\d+(\.\d+)?([eE][-+]?\d+)?$";
/// Text values are substituted inside a quoted literal, so they may not close it
const TEXT_VALIDATOR: &str = r"^[^'\\]*$";

static BOOLEAN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(BOOLEAN_VALIDATOR).unwrap());
static INTEGER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(INTEGER_VALIDATOR).unwrap());
static FLOAT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(FLOAT_VALIDATOR).unwrap());
static TEXT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(TEXT_VALIDATOR).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterType {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ParameterType {
    fn of(value: &SqlValue) -> Self {
        match value {
            SqlValue::Bool(_) => ParameterType::Boolean,
            SqlValue::Int(_) => ParameterType::Integer,
            SqlValue::Float(_) => ParameterType::Float,
            SqlValue::Text(_) => ParameterType::Text,
        }
    }

    /// The regular expression the serving component checks supplied values against
    pub fn validator(&self) -> &'static str {
        match self {
            ParameterType::Boolean => BOOLEAN_VALIDATOR,
            ParameterType::Integer => INTEGER_VALIDATOR,
            ParameterType::Float => FLOAT_VALIDATOR,
            ParameterType::Text => TEXT_VALIDATOR,
        }
    }

    /// The type whose validator this is. Unknown validators are treated as text.
    pub fn from_validator(validator: &str) -> Self {
        [
            ParameterType::Boolean,
            ParameterType::Integer,
            ParameterType::Float,
        ]
        .into_iter()
        .find(|parameter_type| parameter_type.validator() == validator)
        .unwrap_or(ParameterType::Text)
    }

    fn accepts(&self, value: &str) -> bool {
        let regex = match self {
            ParameterType::Boolean => &BOOLEAN_REGEX,
            ParameterType::Integer => &INTEGER_REGEX,
            ParameterType::Float => &FLOAT_REGEX,
            ParameterType::Text => &TEXT_REGEX,
        };
        regex.is_match(value)
    }
}

/// A view parameter, referenced as `%name%` in the view SQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewParameter {
    pub name: String,
    pub value_type: ParameterType,
    pub validator: String,
    pub default_value: String,
}

/// Replace each `$n` with `%pn%` (quoted for text values, parenthesized for numbers) and describe
/// the parameters, with the bound values as defaults.
pub(crate) fn parameterize(
    sql: &str,
    values: &[SqlValue],
) -> Result<(String, Vec<ViewParameter>), PublishError> {
    let scanned = scan(sql);
    if let Some(unterminated) = scanned.unterminated {
        return Err(PublishError::InvalidView(format!(
            "Unterminated {} at offset {}",
            unterminated.what, unterminated.offset
        )));
    }

    let parameters = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let value_type = ParameterType::of(value);
            let default_value = value.as_text();

            if !value_type.accepts(&default_value) {
                return Err(PublishError::InvalidView(format!(
                    "Value {value} for ${} can't be published as a view parameter",
                    index + 1
                )));
            }

            Ok(ViewParameter {
                name: parameter_name(index + 1),
                value_type,
                validator: value_type.validator().to_string(),
                default_value,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut view_sql = String::with_capacity(sql.len());
    let mut copied_up_to = 0;

    for token in &scanned.tokens {
        match token.kind {
            TokenKind::Placeholder(number) => {
                let parameter = number
                    .checked_sub(1)
                    .and_then(|index| parameters.get(index))
                    .ok_or_else(|| {
                        PublishError::InvalidView(format!("No value bound to ${number}"))
                    })?;

                view_sql.push_str(&sql[copied_up_to..token.span.start]);
                // Numbers are parenthesized so that `5-$1` with `-1` can't become `5--1`
                match parameter.value_type {
                    ParameterType::Text => {
                        view_sql.push_str(&format!("'%{}%'", parameter.name))
                    }
                    ParameterType::Integer | ParameterType::Float => {
                        view_sql.push_str(&format!("(%{}%)", parameter.name))
                    }
                    ParameterType::Boolean => view_sql.push_str(&format!("%{}%", parameter.name)),
                }
                copied_up_to = token.span.end;
            }
            TokenKind::StringLiteral | TokenKind::QuotedIdentifier => {
                // The server would substitute into these too
                if let Some(parameter) = parameters
                    .iter()
                    .find(|parameter| token.text.contains(&format!("%{}%", parameter.name)))
                {
                    return Err(PublishError::InvalidView(format!(
                        "{} contains the parameter reference %{}%",
                        token.text, parameter.name
                    )));
                }
            }
            _ => {}
        }
    }
    view_sql.push_str(&sql[copied_up_to..]);

    Ok((view_sql, parameters))
}

fn parameter_name(number: usize) -> String {
    format!("p{number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_become_parameters() {
        let (sql, parameters) = parameterize(
            r#"SELECT * FROM "roads" WHERE "lanes" >= $1 AND "name" = $2 LIMIT 1000"#,
            &[SqlValue::Int(2), SqlValue::Text("Main Street".into())],
        )
        .unwrap();

        assert_eq!(
            sql,
            r#"SELECT * FROM "roads" WHERE "lanes" >= (%p1%) AND "name" = '%p2%' LIMIT 1000"#
        );
        assert_eq!(
            parameters,
            vec![
                ViewParameter {
                    name: "p1".into(),
                    value_type: ParameterType::Integer,
                    validator: INTEGER_VALIDATOR.into(),
                    default_value: "2".into(),
                },
                ViewParameter {
                    name: "p2".into(),
                    value_type: ParameterType::Text,
                    validator: TEXT_VALIDATOR.into(),
                    default_value: "Main Street".into(),
                },
            ]
        );
    }

    #[test]
    fn placeholders_in_literals_are_left_alone() {
        let (sql, parameters) =
            parameterize("SELECT '$1' AS label, $1 AS value FROM t", &[SqlValue::Float(1.5)])
                .unwrap();

        assert_eq!(sql, "SELECT '$1' AS label, (%p1%) AS value FROM t");
        assert_eq!(parameters[0].default_value, "1.5");
    }

    #[test]
    fn negative_values_cant_start_a_comment() {
        let (sql, parameters) = parameterize(
            "SELECT * FROM t WHERE depth = 5-$1 AND active = $2 LIMIT 10",
            &[SqlValue::Int(-1), SqlValue::Bool(true)],
        )
        .unwrap();

        assert_eq!(
            sql,
            "SELECT * FROM t WHERE depth = 5-(%p1%) AND active = %p2% LIMIT 10"
        );
        assert!(ParameterType::Integer.accepts(&parameters[0].default_value));

        // What the server runs once it substitutes the value
        let substituted = sql.replace("%p1%", "-1").replace("%p2%", "true");
        assert!(!substituted.contains("--"));
        assert!(substituted.ends_with("LIMIT 10"));
    }

    #[test]
    fn values_failing_their_validator() {
        let error = parameterize(
            "SELECT * FROM t WHERE name = $1",
            &[SqlValue::Text("O'Brien".into())],
        )
        .unwrap_err();

        assert_eq!(error.code(), "InvalidView");
    }

    #[test]
    fn literal_colliding_with_parameter_name() {
        let error = parameterize(
            "SELECT * FROM t WHERE code LIKE '%p1%' AND id = $1",
            &[SqlValue::Int(1)],
        )
        .unwrap_err();

        assert_eq!(error.code(), "InvalidView");
    }

    #[test]
    fn validators_map_back_to_types() {
        for parameter_type in [
            ParameterType::Boolean,
            ParameterType::Integer,
            ParameterType::Float,
            ParameterType::Text,
        ] {
            assert_eq!(
                ParameterType::from_validator(parameter_type.validator()),
                parameter_type
            );
        }
        assert!(ParameterType::Float.accepts("-3.25"));
        assert!(!ParameterType::Integer.accepts("3; DROP TABLE t"));
    }
}
