// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! [`ViewService`] over the GeoServer REST API. Views are feature types whose metadata carries a
//! `JDBC_VIRTUAL_TABLE` entry.

use async_trait::async_trait;
use geoview_sql::{GeometryMetadata, GeometryType};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{
    PublishError, PublishedView, ServiceEndpoints, ViewIdentity, ViewService,
    parameters::{ParameterType, ViewParameter},
};

const VIRTUAL_TABLE_KEY: &str = "JDBC_VIRTUAL_TABLE";

pub struct GeoServerClient {
    client: Client,
    base_url: Url,
    user: String,
    password: String,
}

impl GeoServerClient {
    /// `base_url` is the GeoServer root, such as `http://localhost:8080/geoserver`
    pub fn new(
        base_url: &str,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| PublishError::Transport(format!("Invalid GeoServer URL {base_url}")))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            user: user.into(),
            password: password.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, PublishError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::Transport(format!("Invalid GeoServer URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn feature_types_url(&self, identity: &ViewIdentity) -> Result<Url, PublishError> {
        self.url(&[
            "rest",
            "workspaces",
            &identity.workspace,
            "datastores",
            &identity.datastore,
            "featuretypes",
        ])
    }

    fn feature_type_url(&self, identity: &ViewIdentity) -> Result<Url, PublishError> {
        self.url(&[
            "rest",
            "workspaces",
            &identity.workspace,
            "datastores",
            &identity.datastore,
            "featuretypes",
            &identity.name,
        ])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PublishError> {
        let response = request
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(response)
        } else {
            Err(PublishError::Remote {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl ViewService for GeoServerClient {
    async fn create(&self, view: &PublishedView) -> Result<ServiceEndpoints, PublishError> {
        let url = self.feature_types_url(view.identity())?;
        debug!(%url, "Creating SQL view");

        let response = self
            .send(self.client.post(url).json(&FeatureTypeEnvelope::from(view)))
            .await?;
        not_found_as_error(response, view.identity())?;

        Ok(self.endpoints(view.identity()))
    }

    async fn update(&self, view: &PublishedView) -> Result<ServiceEndpoints, PublishError> {
        let mut url = self.feature_type_url(view.identity())?;
        url.query_pairs_mut()
            .append_pair("recalculate", "nativebbox,latlonbbox");
        debug!(%url, "Updating SQL view");

        let response = self
            .send(self.client.put(url).json(&FeatureTypeEnvelope::from(view)))
            .await?;
        not_found_as_error(response, view.identity())?;

        Ok(self.endpoints(view.identity()))
    }

    async fn delete(&self, identity: &ViewIdentity) -> Result<(), PublishError> {
        let mut url = self.feature_type_url(identity)?;
        url.query_pairs_mut().append_pair("recurse", "true");
        debug!(%url, "Deleting SQL view");

        let response = self.send(self.client.delete(url)).await?;
        not_found_as_error(response, identity)?;

        Ok(())
    }

    async fn fetch(&self, identity: &ViewIdentity) -> Result<Option<PublishedView>, PublishError> {
        let response = self
            .send(self.client.get(self.feature_type_url(identity)?))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: FeatureTypeEnvelope = response.json().await?;
        envelope.into_view(identity).map(Some)
    }

    fn endpoints(&self, identity: &ViewIdentity) -> ServiceEndpoints {
        let service_url = |service: &str| {
            self.url(&[&identity.workspace, service])
                .map(String::from)
                .unwrap_or_default()
        };

        ServiceEndpoints {
            layer: identity.layer_name(),
            wms_endpoint: service_url("wms"),
            wfs_endpoint: service_url("wfs"),
        }
    }
}

fn not_found_as_error(response: Response, identity: &ViewIdentity) -> Result<Response, PublishError> {
    if response.status() == StatusCode::NOT_FOUND {
        Err(PublishError::NotFound(identity.to_string()))
    } else {
        Ok(response)
    }
}

// GeoServer's JSON encoding of feature types. Lists with a single element may come back as a
// bare object.

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureTypeEnvelope {
    feature_type: FeatureType,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureType {
    name: String,
    #[serde(default)]
    native_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    srs: String,
    #[serde(default)]
    enabled: bool,
    metadata: Metadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
    entry: OneOrMany<MetadataEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataEntry {
    #[serde(rename = "@key")]
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    virtual_table: Option<VirtualTable>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VirtualTable {
    name: String,
    sql: String,
    #[serde(default)]
    escape_sql: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_column: Option<String>,
    geometry: VirtualGeometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameter: Option<OneOrMany<VirtualParameter>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VirtualGeometry {
    name: String,
    #[serde(rename = "type")]
    geometry_type: String,
    srid: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VirtualParameter {
    name: String,
    #[serde(default)]
    default_value: String,
    #[serde(default)]
    regexp_validator: String,
}

impl From<&PublishedView> for FeatureTypeEnvelope {
    fn from(view: &PublishedView) -> Self {
        let parameters: Vec<VirtualParameter> = view
            .parameters()
            .iter()
            .map(|parameter| VirtualParameter {
                name: parameter.name.clone(),
                default_value: parameter.default_value.clone(),
                regexp_validator: parameter.validator.clone(),
            })
            .collect();

        FeatureTypeEnvelope {
            feature_type: FeatureType {
                name: view.identity().name.clone(),
                native_name: view.identity().name.clone(),
                title: view.identity().name.clone(),
                srs: format!("EPSG:{}", view.geometry().srid),
                enabled: true,
                metadata: Metadata {
                    entry: OneOrMany::One(MetadataEntry {
                        key: VIRTUAL_TABLE_KEY.to_string(),
                        virtual_table: Some(VirtualTable {
                            name: view.identity().name.clone(),
                            sql: view.sql().to_string(),
                            escape_sql: false,
                            key_column: view.key_column().map(str::to_string),
                            geometry: VirtualGeometry {
                                name: view.geometry().column.clone(),
                                geometry_type: view.geometry().geometry_type.name().to_string(),
                                srid: view.geometry().srid,
                            },
                            parameter: (!parameters.is_empty())
                                .then_some(OneOrMany::Many(parameters)),
                        }),
                    }),
                },
            },
        }
    }
}

impl FeatureTypeEnvelope {
    fn into_view(self, identity: &ViewIdentity) -> Result<PublishedView, PublishError> {
        let virtual_table = self
            .feature_type
            .metadata
            .entry
            .into_vec()
            .into_iter()
            .find(|entry| entry.key == VIRTUAL_TABLE_KEY)
            .and_then(|entry| entry.virtual_table)
            .ok_or_else(|| {
                PublishError::InvalidView(format!("{identity} is not a SQL view"))
            })?;

        let geometry_type = GeometryType::parse(&virtual_table.geometry.geometry_type)
            .ok_or_else(|| {
                PublishError::InvalidView(format!(
                    "Unknown geometry type {}",
                    virtual_table.geometry.geometry_type
                ))
            })?;

        let parameters = virtual_table
            .parameter
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|parameter| ViewParameter {
                value_type: ParameterType::from_validator(&parameter.regexp_validator),
                name: parameter.name,
                validator: parameter.regexp_validator,
                default_value: parameter.default_value,
            })
            .collect();

        Ok(PublishedView::from_remote(
            identity.clone(),
            virtual_table.sql,
            parameters,
            GeometryMetadata {
                column: virtual_table.geometry.name,
                geometry_type,
                srid: virtual_table.geometry.srid,
            },
            virtual_table.key_column,
        ))
    }
}

#[cfg(test)]
mod tests {
    use geoview_sql::{CompiledStatement, SqlValue, Validator};
    use serde_json::json;

    use super::*;

    fn identity() -> ViewIdentity {
        ViewIdentity::new("atlas", "postgis", "big_countries").unwrap()
    }

    fn view() -> PublishedView {
        let statement = Validator::default()
            .validate_statement(CompiledStatement::from_text(
                r#"SELECT * FROM "public"."countries" WHERE "population" > $1"#,
                vec![SqlValue::Int(1_000_000)],
            ))
            .unwrap();
        let geometry = GeometryMetadata {
            column: "geom".into(),
            geometry_type: GeometryType::MultiPolygon,
            srid: 4326,
        };

        PublishedView::new(identity(), &statement, Some(geometry)).unwrap()
    }

    #[test]
    fn request_body() {
        let body = serde_json::to_value(FeatureTypeEnvelope::from(&view())).unwrap();

        assert_eq!(
            body,
            json!({
                "featureType": {
                    "name": "big_countries",
                    "nativeName": "big_countries",
                    "title": "big_countries",
                    "srs": "EPSG:4326",
                    "enabled": true,
                    "metadata": {
                        "entry": {
                            "@key": "JDBC_VIRTUAL_TABLE",
                            "virtualTable": {
                                "name": "big_countries",
                                "sql": r#"SELECT * FROM "public"."countries" WHERE "population" > (%p1%) LIMIT 1000"#,
                                "escapeSql": false,
                                "geometry": {"name": "geom", "type": "MultiPolygon", "srid": 4326},
                                "parameter": [{
                                    "name": "p1",
                                    "defaultValue": "1000000",
                                    "regexpValidator": r"^-?\d+$"
                                }]
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn server_response_is_read_back() {
        // As returned by GeoServer: several metadata entries and a single parameter as an object
        let response = json!({
            "featureType": {
                "name": "big_countries",
                "nativeName": "big_countries",
                "title": "big_countries",
                "srs": "EPSG:4326",
                "enabled": true,
                "metadata": {
                    "entry": [
                        {"@key": "cachingEnabled", "$": "false"},
                        {
                            "@key": "JDBC_VIRTUAL_TABLE",
                            "virtualTable": {
                                "name": "big_countries",
                                "sql": "SELECT * FROM \"public\".\"countries\" WHERE \"population\" > (%p1%) LIMIT 1000\n",
                                "escapeSql": false,
                                "geometry": {"name": "geom", "type": "MultiPolygon", "srid": 4326},
                                "parameter": {
                                    "name": "p1",
                                    "defaultValue": "1000000",
                                    "regexpValidator": "^-?\\d+$"
                                }
                            }
                        }
                    ]
                }
            }
        });

        let envelope: FeatureTypeEnvelope = serde_json::from_value(response).unwrap();
        let fetched = envelope.into_view(&identity()).unwrap();

        assert!(fetched.same_definition(&view()));
    }

    #[test]
    fn endpoints() {
        let client =
            GeoServerClient::new("http://localhost:8080/geoserver/", "admin", "geoserver").unwrap();

        assert_eq!(
            client.endpoints(&identity()),
            ServiceEndpoints {
                layer: "atlas:big_countries".into(),
                wms_endpoint: "http://localhost:8080/geoserver/atlas/wms".into(),
                wfs_endpoint: "http://localhost:8080/geoserver/atlas/wfs".into(),
            }
        );
        assert_eq!(
            client.feature_type_url(&identity()).unwrap().as_str(),
            "http://localhost:8080/geoserver/rest/workspaces/atlas/datastores/postgis/featuretypes/big_countries"
        );
        assert!(GeoServerClient::new("not a url", "admin", "geoserver").is_err());
    }
}
