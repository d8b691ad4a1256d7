// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use tokio_postgres::{
    Row,
    types::{FromSql, Type},
};

use crate::{
    geometry::{GeometryType, ewkb},
    sql::numeric::decode_numeric,
};

use super::ExecutionError;

/// A decoded result value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// `numeric` as a decimal string, without loss of precision
    Numeric(String),
    Text(String),
    Json(serde_json::Value),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Geometry(GeometryCell),
    Bytes(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
    /// A value of a type we don't decode, in its binary wire form
    #[serde(rename_all = "camelCase")]
    Opaque {
        type_name: String,
        #[serde(serialize_with = "serialize_hex")]
        raw: Vec<u8>,
    },
}

/// A `geometry` or `geography` value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryCell {
    /// `None` if the EWKB header couldn't be read
    pub geometry_type: Option<GeometryType>,
    pub srid: Option<i32>,
    #[serde(serialize_with = "serialize_hex")]
    pub ewkb: Vec<u8>,
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ewkb::to_hex(bytes))
}

/// The bytes of any value, whatever its type
struct RawValue<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawValue<'a> {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawValue(raw))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

pub(super) fn is_spatial_type(ty: &Type) -> bool {
    matches!(ty.name(), "geometry" | "geography")
}

pub(super) fn decode_cell(row: &Row, index: usize) -> Result<CellValue, ExecutionError> {
    let column = &row.columns()[index];
    let ty = column.type_();

    let failed = |message: String| ExecutionError::DecodeFailed {
        column: column.name().to_string(),
        type_name: ty.name().to_string(),
        message,
    };

    fn get<'a, T: FromSql<'a>>(
        row: &'a Row,
        index: usize,
    ) -> Result<Option<T>, tokio_postgres::Error> {
        row.try_get::<_, Option<T>>(index)
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, index).map(|v| v.map(CellValue::Bool)),
        Type::INT2 => get::<i16>(row, index).map(|v| v.map(|v| CellValue::Int(v.into()))),
        Type::INT4 => get::<i32>(row, index).map(|v| v.map(|v| CellValue::Int(v.into()))),
        Type::INT8 => get::<i64>(row, index).map(|v| v.map(CellValue::Int)),
        Type::FLOAT4 => get::<f32>(row, index).map(|v| v.map(|v| CellValue::Float(v.into()))),
        Type::FLOAT8 => get::<f64>(row, index).map(|v| v.map(CellValue::Float)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            get::<String>(row, index).map(|v| v.map(CellValue::Text))
        }
        Type::JSON | Type::JSONB => {
            get::<serde_json::Value>(row, index).map(|v| v.map(CellValue::Json))
        }
        Type::UUID => get::<uuid::Uuid>(row, index).map(|v| v.map(CellValue::Uuid)),
        Type::DATE => get::<NaiveDate>(row, index).map(|v| v.map(CellValue::Date)),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, index).map(|v| v.map(CellValue::Timestamp)),
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>>(row, index).map(|v| v.map(CellValue::TimestampTz))
        }
        Type::BYTEA => get::<Vec<u8>>(row, index).map(|v| v.map(CellValue::Bytes)),
        Type::NUMERIC => {
            return match get::<RawValue>(row, index).map_err(|e| failed(e.to_string()))? {
                Some(RawValue(raw)) => decode_numeric(raw)
                    .map(CellValue::Numeric)
                    .map_err(|e| failed(e.to_string())),
                None => Ok(CellValue::Null),
            };
        }
        _ => get::<RawValue>(row, index).map(|v| {
            v.map(|RawValue(raw)| {
                if is_spatial_type(ty) {
                    let header = ewkb::parse_header(raw);
                    CellValue::Geometry(GeometryCell {
                        geometry_type: header.map(|header| header.geometry_type),
                        srid: header.and_then(|header| header.srid),
                        ewkb: raw.to_vec(),
                    })
                } else {
                    CellValue::Opaque {
                        type_name: ty.name().to_string(),
                        raw: raw.to_vec(),
                    }
                }
            })
        }),
    };

    value
        .map(|value| value.unwrap_or(CellValue::Null))
        .map_err(|e| failed(e.to_string()))
}
