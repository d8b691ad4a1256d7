// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

use super::numeric::encode_numeric;

/// A value bound to a `$n` placeholder.
///
/// Condition values supplied by users only ever reach the database in this form. The value adapts
/// to the parameter type the server inferred for the placeholder (for example, an integer compared
/// against an `int4` column is sent as `int4`, while the same integer compared against a `numeric`
/// column is sent as `numeric`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// The value as text, as used when handing the value to a component that substitutes it into SQL
    /// text itself (see the view publisher).
    pub fn as_text(&self) -> String {
        match self {
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(v) => v.clone(),
        }
    }
}

impl Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Text(v) => write!(f, "'{v}'"),
            other => write!(f, "{}", other.as_text()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

type ToSqlResult = Result<IsNull, Box<dyn std::error::Error + Sync + Send>>;

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> ToSqlResult {
        match self {
            SqlValue::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::INT8 => v.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => {
                    encode_numeric(&v.to_string(), out)?;
                    Ok(IsNull::No)
                }
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::NUMERIC => {
                    encode_numeric(&v.to_string(), out)?;
                    Ok(IsNull::No)
                }
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Text(v) => text_to_sql(v, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // The actual check happens in `to_sql`, where we know the value
        true
    }

    to_sql_checked!();
}

/// Text values are the most common form for values typed into a builder, so we parse them into the
/// inferred parameter type where there is an unambiguous textual form.
fn text_to_sql(v: &str, ty: &Type, out: &mut BytesMut) -> ToSqlResult {
    match *ty {
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            v.to_sql(&Type::TEXT, out)
        }
        Type::INT2 => v.trim().parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => v.trim().parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => v.trim().parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => v.trim().parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => v.trim().parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => {
            encode_numeric(v, out)?;
            Ok(IsNull::No)
        }
        Type::BOOL => v.trim().parse::<bool>()?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(v.trim())?.to_sql(ty, out),
        Type::DATE => chrono::NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIMESTAMP => {
            chrono::NaiveDateTime::parse_from_str(v.trim(), "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(v.trim(), "%Y-%m-%d %H:%M:%S%.f"))?
                .to_sql(ty, out)
        }
        Type::TIMESTAMPTZ => chrono::DateTime::parse_from_rfc3339(v.trim())?
            .with_timezone(&chrono::Utc)
            .to_sql(ty, out),
        Type::JSON | Type::JSONB => {
            serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
        }
        _ => Err(mismatch(&SqlValue::Text(v.to_string()), ty)),
    }
}

fn mismatch(value: &SqlValue, ty: &Type) -> Box<dyn std::error::Error + Sync + Send> {
    format!("Cannot bind {value} to a parameter of type {ty}").into()
}
