//! HTTP client for the catalog service.
//!
//! REST listings live under `<url>/rest/2.0` and answer `{ "results": [...] }`;
//! structured queries go to `<url>/graphql/knowledgeGraph/v1`.

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::application::pagination::harvest_all;
use crate::config::CatalogConfig;
use crate::domain::records::{
    AttributeRecord, GroupRecord, NamedRef, RawAsset, RelationRecord, ResourceRef,
    ResponsibilityRecord, UserRecord,
};
use crate::domain::{FilterExpression, Node, NodeKind, ParentRef, Syntax};
use crate::infrastructure::error::{ApiError, ApiResult, InfraError, InfraResult};
use crate::infrastructure::traits::{CatalogApi, Page};

const REST_PATH: &str = "/rest/2.0";
const GRAPH_PATH: &str = "/graphql/knowledgeGraph/v1";
/// Page size for per-asset lookups that are not paged by the caller
const LOOKUP_PAGE: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

#[derive(Deserialize)]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// Community or domain as listed by REST. Domains name their owner `community`.
#[derive(Deserialize)]
struct NodeRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "type")]
    node_type: Option<NamedRef>,
    #[serde(default)]
    parent: Option<ResourceRef>,
    #[serde(default)]
    community: Option<ResourceRef>,
}

impl NodeRecord {
    fn into_node(self, kind: NodeKind) -> Node {
        let owner = match kind {
            NodeKind::Community => self.parent,
            NodeKind::Domain => self.community,
        };
        Node {
            kind,
            id: self.id,
            name: self.name,
            description: self.description,
            type_name: self.node_type.and_then(|t| t.name),
            parent: owner.and_then(|o| {
                o.id.map(|id| ParentRef {
                    id,
                    name: o.name,
                })
            }),
        }
    }
}

#[derive(Serialize)]
struct GraphRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphResponse {
    #[serde(default)]
    data: Option<GraphData>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Deserialize)]
struct GraphData {
    #[serde(default)]
    assets: Vec<RawAsset>,
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
}

/// Catalog client over HTTP with basic auth.
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpCatalogClient {
    /// Creates a client from the catalog section of the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or the HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> InfraResult<Self> {
        if config.url.trim().is_empty() {
            return Err(InfraError::Client {
                message: "catalog.url is not set".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InfraError::Client {
                message: format!("build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => req.basic_auth(username, self.password.as_deref()),
            None => req,
        }
    }

    /// GET `<rest>/<path>?<query>` and decode the `results` array.
    async fn get_results<T: DeserializeOwned>(&self, path: &str, query: &str) -> ApiResult<Vec<T>> {
        let url = if query.is_empty() {
            format!("{}{REST_PATH}{path}", self.base_url)
        } else {
            format!("{}{REST_PATH}{path}?{query}", self.base_url)
        };
        debug!(%url, "GET");

        let response = self.authorized(self.client.get(&url)).send().await?;
        let listing: Listing<T> = decode(response).await?;
        trace!(count = listing.results.len(), "decoded results");
        Ok(listing.results)
    }

    /// Every page of a per-resource lookup.
    async fn get_all_results<T: DeserializeOwned>(&self, path: &str, query: &str) -> ApiResult<Vec<T>> {
        harvest_all(LOOKUP_PAGE, |page| {
            let query = paged(query, page);
            async move { self.get_results(path, &query).await }
        })
        .await
    }
}

/// Check the status and decode the body, keeping the body text on failure.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Query string from a filter plus paging parameters.
fn listing_query(filter: &FilterExpression, extra: &[(&str, String)]) -> ApiResult<String> {
    let mut parts = Vec::new();
    if !filter.is_empty() {
        let params = filter
            .serialize(Syntax::Rest)
            .map_err(|e| ApiError::Query(e.to_string()))?;
        parts.push(params);
    }
    parts.extend(
        extra
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v))),
    );
    Ok(parts.join("&"))
}

fn paged(query: &str, page: Page) -> String {
    format!("{query}&offset={}&limit={}", page.offset, page.limit)
}

fn repeated(key: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn list_nodes(
        &self,
        kind: NodeKind,
        filter: &FilterExpression,
        page: Page,
    ) -> ApiResult<Vec<Node>> {
        let path = match kind {
            NodeKind::Community => "/communities",
            NodeKind::Domain => "/domains",
        };
        let query = listing_query(
            filter,
            &[
                ("offset", page.offset.to_string()),
                ("limit", page.limit.to_string()),
                ("sortField", "NAME".to_string()),
                ("sortOrder", "ASC".to_string()),
                ("excludeMeta", "true".to_string()),
            ],
        )?;
        let records: Vec<NodeRecord> = self.get_results(path, &query).await?;
        Ok(records.into_iter().map(|r| r.into_node(kind)).collect())
    }

    async fn list_assets(&self, filter: &FilterExpression, page: Page) -> ApiResult<Vec<RawAsset>> {
        let query = listing_query(
            filter,
            &[
                ("offset", page.offset.to_string()),
                ("limit", page.limit.to_string()),
            ],
        )?;
        self.get_results("/assets", &query).await
    }

    async fn query_assets(&self, query: &str) -> ApiResult<Vec<RawAsset>> {
        let url = format!("{}{GRAPH_PATH}", self.base_url);
        trace!(%query, "structured query");

        let request = GraphRequest {
            query,
            variables: serde_json::Value::Object(Default::default()),
        };
        let response = self
            .authorized(self.client.post(&url).json(&request))
            .send()
            .await?;
        let body: GraphResponse = decode(response).await?;

        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::Query(messages.join("; ")));
        }
        Ok(body.data.map(|d| d.assets).unwrap_or_default())
    }

    async fn get_attributes(&self, asset_id: &str) -> ApiResult<Vec<AttributeRecord>> {
        let path = format!("/assets/{}/attributes", urlencoding::encode(asset_id));
        self.get_results(&path, "").await
    }

    async fn get_relations(&self, asset_id: &str) -> ApiResult<Vec<RelationRecord>> {
        let id = urlencoding::encode(asset_id);
        let mut relations: Vec<RelationRecord> = self
            .get_all_results("/relations", &format!("sourceId={id}"))
            .await?;
        let incoming: Vec<RelationRecord> = self
            .get_all_results("/relations", &format!("targetId={id}"))
            .await?;
        relations.extend(incoming);
        Ok(relations)
    }

    async fn get_authorizations(
        &self,
        resource_id: &str,
        include_inherited: bool,
    ) -> ApiResult<Vec<ResponsibilityRecord>> {
        let query = format!(
            "resourceIds={}&includeInherited={include_inherited}",
            urlencoding::encode(resource_id)
        );
        self.get_all_results("/responsibilities", &query).await
    }

    async fn resolve_users(&self, ids: &[String]) -> ApiResult<Vec<UserRecord>> {
        self.get_results("/users", &repeated("userId", ids)).await
    }

    async fn resolve_groups(&self, ids: &[String]) -> ApiResult<Vec<GroupRecord>> {
        self.get_results("/userGroups", &repeated("userGroupId", ids))
            .await
    }
}
