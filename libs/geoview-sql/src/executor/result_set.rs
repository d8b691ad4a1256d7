// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Serialize, Serializer, ser::SerializeMap};

use super::CellValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    /// The declared type name as the server reports it (`int4`, `geometry`, ...)
    pub type_name: String,
}

/// One record. Field order follows the select list; serialized as a JSON object in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub fields: Vec<(String, CellValue)>,
}

impl ResultRow {
    /// The first field with the given name
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<ResultRow>,
    /// More rows were available than the row cap allowed
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_access_and_json() {
        let row = ResultRow {
            fields: vec![
                ("name".into(), CellValue::Text("Finland".into())),
                ("population".into(), CellValue::Int(5_500_000)),
            ],
        };

        assert_eq!(row.get("population"), Some(&CellValue::Int(5_500_000)));
        assert_eq!(row.get("area"), None);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"name":"Finland","population":5500000}"#
        );
    }
}
