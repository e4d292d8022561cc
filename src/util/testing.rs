//! Test support: logging setup and an in-memory catalog.

use std::collections::HashMap;
use std::env;
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::records::{
    AttributeRecord, DomainRef, GroupRecord, NamedRef, RawAsset, RelationRecord, ResourceRef,
    ResponsibilityRecord, UserRecord,
};
use crate::domain::{FilterExpression, Node, NodeKind, Syntax};
use crate::infrastructure::error::{ApiError, ApiResult};
use crate::infrastructure::traits::{CatalogApi, Page};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = ["hyper", "reqwest"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

// ============================================================
// Fixture builders
// ============================================================

pub fn community(id: &str, name: &str, parent: Option<&str>) -> Node {
    let node = Node::new(NodeKind::Community, id, name);
    match parent {
        Some(parent) => node.with_parent(parent, None),
        None => node,
    }
}

pub fn domain(id: &str, name: &str, owner: &Node) -> Node {
    Node::new(NodeKind::Domain, id, name).with_parent(&owner.id, Some(&owner.name))
}

/// Asset record located in `domain`, as both query surfaces return it.
pub fn raw_asset(id: &str, name: &str, domain: &Node) -> RawAsset {
    RawAsset {
        id: id.to_string(),
        display_name: Some(name.to_string()),
        asset_type: Some(NamedRef {
            name: Some("Table".to_string()),
        }),
        domain: Some(DomainRef {
            id: Some(domain.id.clone()),
            name: Some(domain.name.clone()),
            domain_type: domain.type_name.clone().map(|name| NamedRef { name: Some(name) }),
            parent: domain.parent.as_ref().map(|p| ResourceRef {
                id: Some(p.id.clone()),
                name: p.name.clone(),
                resource_type: Some("Community".to_string()),
            }),
        }),
        ..Default::default()
    }
}

// ============================================================
// StubCatalog
// ============================================================

/// In-memory [`CatalogApi`] that records every call and fails calls on demand.
///
/// Calls are recorded as one line each, e.g.
/// `list_nodes domain communityId=c1 offset=0 limit=1000`. A call fails with
/// [`ApiError::Unavailable`] when its line contains a registered failure pattern.
#[derive(Default)]
pub struct StubCatalog {
    communities: Vec<Node>,
    domains: Vec<Node>,
    assets: Vec<RawAsset>,
    attributes: HashMap<String, Vec<AttributeRecord>>,
    relations: HashMap<String, Vec<RelationRecord>>,
    responsibilities: HashMap<String, Vec<ResponsibilityRecord>>,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    failures: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_community(mut self, node: Node) -> Self {
        self.communities.push(node);
        self
    }

    pub fn with_domain(mut self, node: Node) -> Self {
        self.domains.push(node);
        self
    }

    pub fn with_asset(mut self, asset: RawAsset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_attributes(mut self, asset_id: &str, records: Vec<AttributeRecord>) -> Self {
        self.attributes.insert(asset_id.to_string(), records);
        self
    }

    pub fn with_relations(mut self, asset_id: &str, records: Vec<RelationRecord>) -> Self {
        self.relations.insert(asset_id.to_string(), records);
        self
    }

    pub fn with_responsibilities(mut self, asset_id: &str, records: Vec<ResponsibilityRecord>) -> Self {
        self.responsibilities.insert(asset_id.to_string(), records);
        self
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_group(mut self, group: GroupRecord) -> Self {
        self.groups.push(group);
        self
    }

    /// Fail every call whose recorded line contains `pattern`.
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.failures.push(pattern.to_string());
        self
    }

    /// Recorded calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, line: String) -> ApiResult<()> {
        let failing = self.failures.iter().any(|f| line.contains(f.as_str()));
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        if failing {
            return Err(ApiError::Unavailable(line));
        }
        Ok(())
    }
}

fn params(filter: &FilterExpression) -> Vec<(String, String)> {
    filter.to_rest_params().unwrap_or_default()
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn paged<T: Clone>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items.skip(page.offset).take(page.limit).collect()
}

/// Paging and scope from the rendered query text.
fn parse_query(query: &str) -> (Page, Option<String>, Vec<String>) {
    let number = |pattern: &str| {
        Regex::new(pattern)
            .ok()
            .and_then(|re| re.captures(query))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
    };
    let page = Page {
        offset: number(r"offset: (\d+)").unwrap_or(0),
        limit: number(r"limit: (\d+)").unwrap_or(usize::MAX),
    };

    let domain_id = Regex::new(r#"domain: \{id: \{eq: "([^"]*)"\}\}"#)
        .ok()
        .and_then(|re| re.captures(query))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let community_ids = Regex::new(r#"parent: \{id: \{in: \[([^\]]*)\]\}\}"#)
        .ok()
        .and_then(|re| re.captures(query))
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .split(", ")
                .map(|s| s.trim_matches('"').to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    (page, domain_id, community_ids)
}

fn domain_of(asset: &RawAsset) -> Option<&DomainRef> {
    asset.domain.as_ref()
}

#[async_trait]
impl CatalogApi for StubCatalog {
    async fn list_nodes(
        &self,
        kind: NodeKind,
        filter: &FilterExpression,
        page: Page,
    ) -> ApiResult<Vec<Node>> {
        let rest = filter.serialize(Syntax::Rest).unwrap_or_default();
        self.record(format!(
            "list_nodes {kind} {rest} offset={} limit={}",
            page.offset, page.limit
        ))?;

        let params = params(filter);
        let name = param(&params, "name");
        let owner = param(&params, "communityId");
        let source = match kind {
            NodeKind::Community => &self.communities,
            NodeKind::Domain => &self.domains,
        };
        let matching = source
            .iter()
            .filter(|n| name.map_or(true, |name| n.name == name))
            .filter(|n| owner.map_or(true, |owner| n.parent_id() == Some(owner)))
            .cloned();
        Ok(paged(matching, page))
    }

    async fn list_assets(&self, filter: &FilterExpression, page: Page) -> ApiResult<Vec<RawAsset>> {
        let rest = filter.serialize(Syntax::Rest).unwrap_or_default();
        self.record(format!(
            "list_assets {rest} offset={} limit={}",
            page.offset, page.limit
        ))?;

        let params = params(filter);
        let domain_id = param(&params, "domainId");
        let matching = self
            .assets
            .iter()
            .filter(|a| {
                domain_id.map_or(true, |id| {
                    domain_of(a).and_then(|d| d.id.as_deref()) == Some(id)
                })
            })
            // the REST listing carries no typed attribute groups or edges
            .map(|a| RawAsset {
                id: a.id.clone(),
                name: a.name.clone(),
                display_name: a.display_name.clone(),
                asset_type: a.asset_type.clone(),
                status: a.status.clone(),
                domain: a.domain.clone(),
                tags: a.tags.clone(),
                ..Default::default()
            });
        Ok(paged(matching, page))
    }

    async fn query_assets(&self, query: &str) -> ApiResult<Vec<RawAsset>> {
        let (page, domain_id, community_ids) = parse_query(query);
        let scope = match &domain_id {
            Some(id) => format!("domain={id}"),
            None => format!("communities={}", community_ids.join(",")),
        };
        self.record(format!(
            "query_assets {scope} offset={} limit={}",
            page.offset, page.limit
        ))?;

        let with_attributes = query.contains("stringAttributes");
        let with_relations = query.contains("outgoingRelations");
        let matching = self
            .assets
            .iter()
            .filter(|a| {
                let domain = domain_of(a);
                match &domain_id {
                    Some(id) => domain.and_then(|d| d.id.as_deref()) == Some(id.as_str()),
                    None => domain
                        .and_then(|d| d.parent.as_ref())
                        .and_then(|p| p.id.as_ref())
                        .is_some_and(|p| community_ids.contains(p)),
                }
            })
            .map(|a| {
                let mut asset = a.clone();
                if !with_attributes {
                    asset.string_attributes = None;
                    asset.boolean_attributes = None;
                    asset.numeric_attributes = None;
                    asset.date_attributes = None;
                    asset.multi_value_attributes = None;
                }
                if !with_relations {
                    asset.outgoing_relations = None;
                    asset.incoming_relations = None;
                }
                asset
            });
        Ok(paged(matching, page))
    }

    async fn get_attributes(&self, asset_id: &str) -> ApiResult<Vec<AttributeRecord>> {
        self.record(format!("get_attributes {asset_id}"))?;
        Ok(self.attributes.get(asset_id).cloned().unwrap_or_default())
    }

    async fn get_relations(&self, asset_id: &str) -> ApiResult<Vec<RelationRecord>> {
        self.record(format!("get_relations {asset_id}"))?;
        Ok(self.relations.get(asset_id).cloned().unwrap_or_default())
    }

    async fn get_authorizations(
        &self,
        resource_id: &str,
        include_inherited: bool,
    ) -> ApiResult<Vec<ResponsibilityRecord>> {
        self.record(format!(
            "get_authorizations {resource_id} inherited={include_inherited}"
        ))?;
        Ok(self
            .responsibilities
            .get(resource_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_users(&self, ids: &[String]) -> ApiResult<Vec<UserRecord>> {
        self.record(format!("resolve_users {}", ids.join(",")))?;
        Ok(self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn resolve_groups(&self, ids: &[String]) -> ApiResult<Vec<GroupRecord>> {
        self.record(format!("resolve_groups {}", ids.join(",")))?;
        Ok(self
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }
}
