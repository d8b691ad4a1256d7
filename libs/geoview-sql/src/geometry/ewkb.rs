// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Reading the header of (E)WKB values, as PostGIS sends geometries in binary results.

use bytes::Buf;

use super::GeometryType;

const WKB_Z: u32 = 0x8000_0000;
const WKB_M: u32 = 0x4000_0000;
const WKB_SRID: u32 = 0x2000_0000;
const WKB_TYPE_MASK: u32 = 0x0FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EwkbHeader {
    pub geometry_type: GeometryType,
    /// `None` when the value carries no SRID or SRID 0
    pub srid: Option<i32>,
    pub has_z: bool,
    pub has_m: bool,
}

/// Parse the byte-order marker, type word and optional SRID at the start of an EWKB value. Both
/// the PostGIS flag bits and ISO type codes (1000s for Z, 2000s for M, 3000s for ZM) are
/// understood.
pub fn parse_header(mut bytes: &[u8]) -> Option<EwkbHeader> {
    if bytes.len() < 5 {
        return None;
    }

    let little_endian = match bytes.get_u8() {
        0 => false,
        1 => true,
        _ => return None,
    };
    let read_u32 = |bytes: &mut &[u8]| {
        if little_endian {
            bytes.get_u32_le()
        } else {
            bytes.get_u32()
        }
    };

    let type_word = read_u32(&mut bytes);
    let base = type_word & WKB_TYPE_MASK;
    let iso_dimensions = base / 1000;

    let geometry_type = GeometryType::from_wkb_code(base % 1000)?;

    let srid = if type_word & WKB_SRID != 0 {
        if bytes.len() < 4 {
            return None;
        }
        Some(read_u32(&mut bytes) as i32).filter(|srid| *srid != 0)
    } else {
        None
    };

    Some(EwkbHeader {
        geometry_type,
        srid,
        has_z: type_word & WKB_Z != 0 || matches!(iso_dimensions, 1 | 3),
        has_m: type_word & WKB_M != 0 || matches!(iso_dimensions, 2 | 3),
    })
}

/// Upper-case hex, the form PostGIS uses for EWKB text
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_hex(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn point_with_srid() {
        // SRID=4326;POINT(1 2)
        let bytes = from_hex("0101000020E6100000000000000000F03F0000000000000040");

        assert_eq!(
            parse_header(&bytes),
            Some(EwkbHeader {
                geometry_type: GeometryType::Point,
                srid: Some(4326),
                has_z: false,
                has_m: false,
            })
        );
        assert_eq!(
            to_hex(&bytes),
            "0101000020E6100000000000000000F03F0000000000000040"
        );
    }

    #[test]
    fn big_endian_multipolygon_z() {
        let mut bytes = vec![0u8];
        bytes.extend((6 | WKB_Z | WKB_SRID).to_be_bytes());
        bytes.extend(3857i32.to_be_bytes());
        bytes.extend(0u32.to_be_bytes());

        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.geometry_type, GeometryType::MultiPolygon);
        assert_eq!(header.srid, Some(3857));
        assert!(header.has_z);
    }

    #[test]
    fn iso_codes_and_missing_srid() {
        // ISO LineString M, no SRID
        let mut bytes = vec![1u8];
        bytes.extend(2002u32.to_le_bytes());

        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.geometry_type, GeometryType::LineString);
        assert_eq!(header.srid, None);
        assert!(header.has_m && !header.has_z);
    }

    #[test]
    fn garbage() {
        assert_eq!(parse_header(&[]), None);
        assert_eq!(parse_header(&[7, 1, 0, 0, 0]), None);
        assert_eq!(parse_header(&[1, 42, 0, 0, 0]), None);
        // SRID flag without the SRID
        assert_eq!(parse_header(&[1, 1, 0, 0, 0x20]), None);
    }
}
