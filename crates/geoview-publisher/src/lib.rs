// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Publishing validated statements as SQL views on a geospatial server, so that they can be
//! served as WMS/WFS layers.

mod error;
mod geoserver;
mod parameters;
mod publisher;
mod service;
mod view;

pub use error::PublishError;
pub use geoserver::GeoServerClient;
pub use parameters::{ParameterType, ViewParameter};
pub use publisher::ViewPublisher;
pub use service::ViewService;
pub use view::{PublishedView, ServiceEndpoints, ViewIdentity};
