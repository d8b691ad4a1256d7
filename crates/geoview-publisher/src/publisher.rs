// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use dashmap::DashMap;
use geoview_sql::{GeometryMetadata, ValidatedStatement};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{PublishError, PublishedView, ServiceEndpoints, ViewIdentity, ViewService};

/// Publishes views through a [`ViewService`]. Operations on the same identity run one at a time;
/// operations on different identities run concurrently.
pub struct ViewPublisher {
    service: Arc<dyn ViewService>,
    locks: DashMap<ViewIdentity, Arc<Mutex<()>>>,
}

impl ViewPublisher {
    pub fn new(service: Arc<dyn ViewService>) -> Self {
        Self {
            service,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, identity: &ViewIdentity) -> Arc<Mutex<()>> {
        self.locks.entry(identity.clone()).or_default().clone()
    }

    pub async fn publish(&self, view: PublishedView) -> Result<ServiceEndpoints, PublishError> {
        let lock = self.lock_for(view.identity());
        let _guard = lock.lock().await;

        let endpoints = self.service.create(&view).await?;
        info!(layer = %endpoints.layer, "Published view");
        Ok(endpoints)
    }

    /// Point an existing view at a new statement. Nothing is sent when the remote definition is
    /// already the same.
    pub async fn update(
        &self,
        identity: &ViewIdentity,
        statement: &ValidatedStatement,
        geometry: Option<GeometryMetadata>,
    ) -> Result<ServiceEndpoints, PublishError> {
        let view = PublishedView::new(identity.clone(), statement, geometry)?;

        let lock = self.lock_for(identity);
        let _guard = lock.lock().await;

        let remote = self
            .service
            .fetch(identity)
            .await?
            .ok_or_else(|| PublishError::NotFound(identity.to_string()))?;
        let view = view.with_key_column(remote.key_column().map(str::to_string));

        if remote.same_definition(&view) {
            debug!(%identity, "View is unchanged");
            return Ok(self.service.endpoints(identity));
        }

        let endpoints = self.service.update(&view).await?;
        info!(layer = %endpoints.layer, "Updated view");
        Ok(endpoints)
    }

    pub async fn unpublish(&self, identity: &ViewIdentity) -> Result<(), PublishError> {
        let lock = self.lock_for(identity);
        let result = {
            let _guard = lock.lock().await;
            self.service.delete(identity).await
        };
        drop(lock);
        self.release(identity);

        result?;
        info!(%identity, "Unpublished view");
        Ok(())
    }

    /// Forget the lock of an identity nobody else is waiting on
    fn release(&self, identity: &ViewIdentity) {
        self.locks
            .remove_if(identity, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            Mutex as StdMutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use geoview_sql::{CompiledStatement, GeometryType, SqlValue, Validator};

    use super::*;

    /// Keeps views in memory and records how the publisher drives it
    #[derive(Default)]
    struct InMemoryViewService {
        views: StdMutex<HashMap<ViewIdentity, PublishedView>>,
        updates: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl InMemoryViewService {
        async fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ViewService for InMemoryViewService {
        async fn create(&self, view: &PublishedView) -> Result<ServiceEndpoints, PublishError> {
            self.enter().await;
            let mut views = self.views.lock().unwrap();
            if views.contains_key(view.identity()) {
                return Err(PublishError::Remote {
                    status: 500,
                    message: format!("Resource named '{}' already exists", view.identity().name),
                });
            }
            views.insert(view.identity().clone(), view.clone());
            Ok(self.endpoints(view.identity()))
        }

        async fn update(&self, view: &PublishedView) -> Result<ServiceEndpoints, PublishError> {
            self.enter().await;
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.views
                .lock()
                .unwrap()
                .insert(view.identity().clone(), view.clone());
            Ok(self.endpoints(view.identity()))
        }

        async fn delete(&self, identity: &ViewIdentity) -> Result<(), PublishError> {
            self.enter().await;
            self.views
                .lock()
                .unwrap()
                .remove(identity)
                .map(|_| ())
                .ok_or_else(|| PublishError::NotFound(identity.to_string()))
        }

        async fn fetch(
            &self,
            identity: &ViewIdentity,
        ) -> Result<Option<PublishedView>, PublishError> {
            self.enter().await;
            Ok(self.views.lock().unwrap().get(identity).cloned())
        }

        fn endpoints(&self, identity: &ViewIdentity) -> ServiceEndpoints {
            ServiceEndpoints {
                layer: identity.layer_name(),
                wms_endpoint: format!("memory://{}/wms", identity.workspace),
                wfs_endpoint: format!("memory://{}/wfs", identity.workspace),
            }
        }
    }

    fn identity(name: &str) -> ViewIdentity {
        ViewIdentity::new("atlas", "postgis", name).unwrap()
    }

    fn geometry() -> Option<GeometryMetadata> {
        Some(GeometryMetadata {
            column: "geom".into(),
            geometry_type: GeometryType::MultiPolygon,
            srid: 4326,
        })
    }

    fn statement(min_population: i64) -> ValidatedStatement {
        Validator::default()
            .validate_statement(CompiledStatement::from_text(
                r#"SELECT * FROM "public"."countries" WHERE "population" > $1"#,
                vec![SqlValue::Int(min_population)],
            ))
            .unwrap()
    }

    fn view(name: &str, min_population: i64) -> PublishedView {
        PublishedView::new(identity(name), &statement(min_population), geometry()).unwrap()
    }

    #[tokio::test]
    async fn publish_update_unpublish() {
        let service = Arc::new(InMemoryViewService::default());
        let publisher = ViewPublisher::new(service.clone());

        let endpoints = publisher.publish(view("big", 1_000_000)).await.unwrap();
        assert_eq!(endpoints.layer, "atlas:big");
        assert_eq!(endpoints.wms_endpoint, "memory://atlas/wms");

        publisher
            .update(&identity("big"), &statement(5_000_000), geometry())
            .await
            .unwrap();
        assert_eq!(service.updates.load(Ordering::SeqCst), 1);
        assert_eq!(
            service.views.lock().unwrap()[&identity("big")].parameters()[0].default_value,
            "5000000"
        );

        publisher.unpublish(&identity("big")).await.unwrap();
        assert!(service.views.lock().unwrap().is_empty());

        let error = publisher.unpublish(&identity("big")).await.unwrap_err();
        assert_eq!(error.code(), "NotFound");
    }

    #[tokio::test]
    async fn unpublish_releases_unused_locks() {
        let publisher = ViewPublisher::new(Arc::new(InMemoryViewService::default()));
        publisher.publish(view("a", 1)).await.unwrap();
        publisher.publish(view("b", 1)).await.unwrap();
        assert_eq!(publisher.locks.len(), 2);

        publisher.unpublish(&identity("a")).await.unwrap();
        assert!(!publisher.locks.contains_key(&identity("a")));

        // A lock another operation still holds stays in place
        let pending = publisher.lock_for(&identity("b"));
        publisher.unpublish(&identity("b")).await.unwrap();
        assert!(publisher.locks.contains_key(&identity("b")));
        drop(pending);

        // Failed unpublishing releases the lock too
        publisher.unpublish(&identity("b")).await.unwrap_err();
        assert!(publisher.locks.is_empty());
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let service = Arc::new(InMemoryViewService::default());
        let publisher = ViewPublisher::new(service.clone());
        publisher.publish(view("big", 1_000_000)).await.unwrap();

        for _ in 0..3 {
            publisher
                .update(&identity("big"), &statement(1_000_000), geometry())
                .await
                .unwrap();
        }

        assert_eq!(service.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_keeps_the_key_column() {
        let service = Arc::new(InMemoryViewService::default());
        let publisher = ViewPublisher::new(service.clone());
        publisher
            .publish(view("big", 1_000_000).with_key_column(Some("id".into())))
            .await
            .unwrap();

        publisher
            .update(&identity("big"), &statement(1_000_000), geometry())
            .await
            .unwrap();
        assert_eq!(service.updates.load(Ordering::SeqCst), 0);

        publisher
            .update(&identity("big"), &statement(2_000_000), geometry())
            .await
            .unwrap();
        let stored = service.views.lock().unwrap()[&identity("big")].clone();
        assert_eq!(stored.key_column(), Some("id"));
    }

    #[tokio::test]
    async fn update_needs_geometry_and_an_existing_view() {
        let publisher = ViewPublisher::new(Arc::new(InMemoryViewService::default()));

        let error = publisher
            .update(&identity("big"), &statement(1), None)
            .await
            .unwrap_err();
        assert_eq!(error.code(), "MissingGeometry");

        let error = publisher
            .update(&identity("big"), &statement(1), geometry())
            .await
            .unwrap_err();
        assert_eq!(error.code(), "NotFound");
    }

    #[tokio::test]
    async fn remote_errors_are_passed_through() {
        let publisher = ViewPublisher::new(Arc::new(InMemoryViewService::default()));
        publisher.publish(view("big", 1)).await.unwrap();

        match publisher.publish(view("big", 1)).await {
            Err(PublishError::Remote { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Resource named 'big' already exists");
            }
            other => panic!("Expected a remote error, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn operations_on_one_identity_are_serialized() {
        let service = Arc::new(InMemoryViewService::default());
        let publisher = Arc::new(ViewPublisher::new(service.clone()));
        publisher.publish(view("big", 0)).await.unwrap();

        let tasks: Vec<_> = (1..=8)
            .map(|min_population| {
                let publisher = publisher.clone();
                tokio::spawn(async move {
                    publisher
                        .update(&identity("big"), &statement(min_population), geometry())
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(service.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(service.updates.load(Ordering::SeqCst), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_identities_run_concurrently() {
        let service = Arc::new(InMemoryViewService::default());
        let publisher = Arc::new(ViewPublisher::new(service.clone()));

        let tasks: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| {
                let publisher = publisher.clone();
                tokio::spawn(async move { publisher.publish(view(name, 1)).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(service.views.lock().unwrap().len(), 4);
    }
}
