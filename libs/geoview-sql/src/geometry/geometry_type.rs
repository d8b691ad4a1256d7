// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// The OGC geometry types a layer can declare. Dimension suffixes (`Z`, `M`, `ZM`) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

const ALL: [GeometryType; 8] = [
    GeometryType::Geometry,
    GeometryType::Point,
    GeometryType::LineString,
    GeometryType::Polygon,
    GeometryType::MultiPoint,
    GeometryType::MultiLineString,
    GeometryType::MultiPolygon,
    GeometryType::GeometryCollection,
];

impl GeometryType {
    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::Geometry => "Geometry",
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::GeometryCollection => "GeometryCollection",
        }
    }

    /// Parse a type name such as `MULTIPOLYGON`, `PointZ` or `LineString M`
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        let find = |candidate: &str| {
            ALL.into_iter()
                .find(|geometry_type| geometry_type.name().eq_ignore_ascii_case(candidate))
        };

        find(normalized.as_str()).or_else(|| {
            ["ZM", "Z", "M"]
                .iter()
                .find_map(|suffix| normalized.strip_suffix(suffix).and_then(find))
        })
    }

    /// The type for a WKB geometry code (1 = Point ... 7 = GeometryCollection)
    pub fn from_wkb_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(GeometryType::Geometry),
            1 => Some(GeometryType::Point),
            2 => Some(GeometryType::LineString),
            3 => Some(GeometryType::Polygon),
            4 => Some(GeometryType::MultiPoint),
            5 => Some(GeometryType::MultiLineString),
            6 => Some(GeometryType::MultiPolygon),
            7 => Some(GeometryType::GeometryCollection),
            _ => None,
        }
    }

    /// The type `ST_Collect` produces from values of this type
    pub fn collected(&self) -> Self {
        match self {
            GeometryType::Point | GeometryType::MultiPoint => GeometryType::MultiPoint,
            GeometryType::LineString | GeometryType::MultiLineString => {
                GeometryType::MultiLineString
            }
            GeometryType::Polygon | GeometryType::MultiPolygon => GeometryType::MultiPolygon,
            GeometryType::Geometry | GeometryType::GeometryCollection => {
                GeometryType::GeometryCollection
            }
        }
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown geometry type '{s}'"))
    }
}

/// Whether a column is declared as `geometry` or `geography`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialKind {
    Geometry,
    Geography,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredGeometry {
    pub kind: SpatialKind,
    pub geometry_type: GeometryType,
    /// `None` when the declaration has no type modifier or uses SRID 0
    pub srid: Option<i32>,
}

/// SRID of a geography column without an explicit one
const GEOGRAPHY_DEFAULT_SRID: i32 = 4326;

/// Parse a declared column type, as reported by `format_type`: `geometry`,
/// `geometry(MultiPolygon,4326)`, `public.geography(Point)` and so on. Returns `None` for
/// non-spatial types.
pub fn parse_declared_type(declared: &str) -> Option<DeclaredGeometry> {
    let declared = declared.trim();
    let (name, modifier) = match declared.split_once('(') {
        Some((name, rest)) => (name.trim(), Some(rest.strip_suffix(')')?)),
        None => (declared, None),
    };
    // Drop a schema qualifier
    let name = name.rsplit('.').next().unwrap_or(name).trim_matches('"');

    let kind = if name.eq_ignore_ascii_case("geometry") {
        SpatialKind::Geometry
    } else if name.eq_ignore_ascii_case("geography") {
        SpatialKind::Geography
    } else {
        return None;
    };

    let (geometry_type, srid) = match modifier {
        Some(modifier) => {
            let mut parts = modifier.split(',').map(str::trim);
            let geometry_type = GeometryType::parse(parts.next()?)?;
            let srid = match parts.next() {
                Some(srid) => Some(srid.parse::<i32>().ok()?),
                None => None,
            };
            (geometry_type, srid)
        }
        None => (GeometryType::Geometry, None),
    };

    let srid = match (kind, srid) {
        (_, Some(0)) => None,
        (SpatialKind::Geography, None) => Some(GEOGRAPHY_DEFAULT_SRID),
        (_, srid) => srid,
    };

    Some(DeclaredGeometry {
        kind,
        geometry_type,
        srid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(GeometryType::parse("MULTIPOLYGON"), Some(GeometryType::MultiPolygon));
        assert_eq!(GeometryType::parse("PointZ"), Some(GeometryType::Point));
        assert_eq!(GeometryType::parse("LineString M"), Some(GeometryType::LineString));
        assert_eq!(GeometryType::parse("polygonzm"), Some(GeometryType::Polygon));
        assert_eq!(GeometryType::parse("geometry"), Some(GeometryType::Geometry));
        assert_eq!(GeometryType::parse("circle"), None);
    }

    #[test]
    fn declared_types() {
        assert_eq!(
            parse_declared_type("geometry(MultiPolygon,4326)"),
            Some(DeclaredGeometry {
                kind: SpatialKind::Geometry,
                geometry_type: GeometryType::MultiPolygon,
                srid: Some(4326),
            })
        );
        assert_eq!(
            parse_declared_type("public.geometry(PointZ, 3857)")
                .map(|declared| (declared.geometry_type, declared.srid)),
            Some((GeometryType::Point, Some(3857)))
        );
        assert_eq!(
            parse_declared_type("geometry").map(|declared| declared.srid),
            Some(None)
        );
        assert_eq!(
            parse_declared_type("geometry(Polygon,0)").map(|declared| declared.srid),
            Some(None)
        );
        assert_eq!(
            parse_declared_type("geography(Point)").map(|declared| declared.srid),
            Some(Some(4326))
        );
        assert_eq!(parse_declared_type("integer"), None);
        assert_eq!(parse_declared_type("character varying(20)"), None);
    }
}
