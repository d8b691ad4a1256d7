// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;

use crate::{PublishError, PublishedView, ServiceEndpoints, ViewIdentity};

/// The geospatial serving component, reduced to the operations on SQL views
#[async_trait]
pub trait ViewService: Send + Sync {
    async fn create(&self, view: &PublishedView) -> Result<ServiceEndpoints, PublishError>;

    /// Replace the definition of an existing view
    async fn update(&self, view: &PublishedView) -> Result<ServiceEndpoints, PublishError>;

    async fn delete(&self, identity: &ViewIdentity) -> Result<(), PublishError>;

    /// The current remote definition, or `None` if the view doesn't exist
    async fn fetch(&self, identity: &ViewIdentity) -> Result<Option<PublishedView>, PublishError>;

    fn endpoints(&self, identity: &ViewIdentity) -> ServiceEndpoints;
}
