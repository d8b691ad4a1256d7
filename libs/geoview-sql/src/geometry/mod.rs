// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Finding the geometry column, type and SRID of a query result.

mod catalog;
pub mod ewkb;
mod geometry_type;
mod inference;

pub use catalog::{CatalogColumn, ColumnCatalog, StaticCatalog, load_catalog};
pub use geometry_type::{DeclaredGeometry, GeometryType, SpatialKind, parse_declared_type};
pub use inference::{
    GeometryInference, GeometryMetadata, InferenceError, infer_from_sample, infer_static,
    is_geometry_like_name,
};
