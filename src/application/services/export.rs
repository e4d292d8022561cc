//! Export assembly service
//!
//! Resolves the scope of a community or domain target, harvests and
//! normalizes its assets and seals the result into an [`ExportDocument`].

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::application::error_ext::ApiResultExt;
use crate::application::pagination::harvest_all;
use crate::application::services::AuthorizationService;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::records::RawAsset;
use crate::domain::{
    descendants_of, normalize_asset, normalize_attribute_records, normalize_relation_records,
    Asset, AssetQuery, DomainGroup, DomainGrouping, ExportDocument, ExportMethod,
    FilterExpression, Node, NodeKind, TargetInfo,
};
use crate::infrastructure::error::ApiResult;
use crate::infrastructure::traits::{CatalogApi, Page};

/// What to include in an export and how to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_subcommunities: bool,
    /// Off exports the community and domain structure only
    pub include_assets: bool,
    pub include_attributes: bool,
    pub include_relations: bool,
    pub include_authorizations: bool,
    /// Keep authorizations inherited from communities and domains
    pub include_inherited: bool,
    pub method: ExportMethod,
    /// One filtered query for the whole community scope (graph method only)
    pub bulk: bool,
    pub grouping: DomainGrouping,
    /// REST page size
    pub page_size: NonZeroUsize,
    /// Structured query page size
    pub graph_page_size: NonZeroUsize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_subcommunities: true,
            include_assets: true,
            include_attributes: true,
            include_relations: false,
            include_authorizations: false,
            include_inherited: true,
            method: ExportMethod::Graph,
            bulk: false,
            grouping: DomainGrouping::Id,
            page_size: NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN),
            graph_page_size: NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Named export target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Community(String),
    Domain(String),
}

impl ExportTarget {
    pub fn kind(&self) -> NodeKind {
        match self {
            ExportTarget::Community(_) => NodeKind::Community,
            ExportTarget::Domain(_) => NodeKind::Domain,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ExportTarget::Community(name) | ExportTarget::Domain(name) => name,
        }
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind(), self.name())
    }
}

/// Result of one target in a multi-target export.
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: ExportTarget,
    pub result: ApplicationResult<ExportDocument>,
}

/// Folds assets into domain groups in first-encountered order.
struct GroupAccumulator {
    grouping: DomainGrouping,
    groups: Vec<DomainGroup>,
    index: HashMap<String, usize>,
}

impl GroupAccumulator {
    fn new(grouping: DomainGrouping) -> Self {
        Self {
            grouping,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append `assets` to the group of `domain`; the first domain seen under a
    /// key decides the group's metadata.
    fn extend(&mut self, domain: &Node, community: Option<&str>, assets: Vec<Asset>) {
        let key = match self.grouping {
            DomainGrouping::Id => &domain.id,
            DomainGrouping::Name => &domain.name,
        };
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                self.groups.push(DomainGroup::for_domain(domain, community));
                self.index.insert(key.clone(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[position].assets.extend(assets);
    }

    fn into_groups(self) -> Vec<DomainGroup> {
        self.groups
    }
}

/// Service for exporting communities and domains.
pub struct ExportService {
    api: Arc<dyn CatalogApi>,
    authorizations: AuthorizationService,
}

impl ExportService {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            authorizations: AuthorizationService::new(Arc::clone(&api)),
            api,
        }
    }

    /// Look up a community or domain by exact name.
    #[instrument(level = "debug", skip(self))]
    pub async fn find_node(&self, kind: NodeKind, name: &str) -> ApplicationResult<Node> {
        let filter = FilterExpression::object([
            ("name", FilterExpression::from(name)),
            ("nameMatchMode", FilterExpression::from("EXACT")),
        ]);
        let matches = self
            .api
            .list_nodes(kind, &filter, Page { offset: 0, limit: 1 })
            .await
            .with_call_context("lookup", name)?;

        matches
            .into_iter()
            .next()
            .ok_or_else(|| ApplicationError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Every community in the catalog.
    pub async fn list_communities(&self, page_size: NonZeroUsize) -> ApplicationResult<Vec<Node>> {
        let api = self.api.as_ref();
        let filter = FilterExpression::empty();
        let communities = harvest_all(page_size, |page| {
            api.list_nodes(NodeKind::Community, &filter, page)
        })
        .await
        .with_call_context("list", "communities")?;
        debug!(count = communities.len(), "harvested communities");
        Ok(communities)
    }

    /// Domains owned directly by `community`.
    pub async fn domains_of(
        &self,
        community: &Node,
        page_size: NonZeroUsize,
    ) -> ApplicationResult<Vec<Node>> {
        let api = self.api.as_ref();
        let filter = FilterExpression::object([("communityId", FilterExpression::from(&community.id))]);
        harvest_all(page_size, |page| api.list_nodes(NodeKind::Domain, &filter, page))
            .await
            .with_call_context("domains of community", &community.name)
    }

    /// Export one target into a sealed document.
    #[instrument(level = "debug", skip(self, target, options), fields(export = %target))]
    pub async fn export(
        &self,
        target: &ExportTarget,
        options: &ExportOptions,
    ) -> ApplicationResult<ExportDocument> {
        let node = self.find_node(target.kind(), target.name()).await?;
        info!(id = %node.id, method = %options.method, "exporting {}", target);

        let (subcommunities, domains) = match target.kind() {
            NodeKind::Community => {
                let subcommunities = if options.include_subcommunities {
                    let universe = self.list_communities(options.page_size).await?;
                    descendants_of(&node.id, &universe)
                } else {
                    Vec::new()
                };
                debug!(count = subcommunities.len(), "resolved subcommunities");

                let scope: Vec<&Node> = std::iter::once(&node).chain(&subcommunities).collect();
                let domains = if options.bulk && options.include_assets {
                    self.export_bulk(&scope, options).await?
                } else {
                    self.export_scope(&scope, options).await?
                };
                (subcommunities, domains)
            }
            NodeKind::Domain => {
                let community = node.parent.as_ref().and_then(|p| p.name.as_deref());
                let assets = if options.include_assets {
                    self.domain_assets(&node, options).await?
                } else {
                    Vec::new()
                };
                let mut groups = GroupAccumulator::new(options.grouping);
                groups.extend(&node, community, assets);
                (Vec::new(), groups.into_groups())
            }
        };

        let target_info = TargetInfo {
            kind: node.kind,
            id: node.id,
            name: node.name,
            description: node.description,
            exported_at: Utc::now(),
            method: options.method,
            includes_subcommunities: target.kind() == NodeKind::Community
                && options.include_subcommunities,
            subcommunities: subcommunities.iter().map(Node::summary).collect(),
        };
        let document = ExportDocument::assemble(target_info, domains);
        info!(
            domains = document.statistics.total_domains,
            assets = document.statistics.total_assets,
            "export assembled"
        );
        Ok(document)
    }

    /// Export several targets one after another; each failure stays with its target.
    pub async fn export_many(
        &self,
        targets: &[ExportTarget],
        options: &ExportOptions,
    ) -> Vec<TargetOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let result = self.export(target, options).await;
            if let Err(e) = &result {
                warn!(export = %target, error = %e, "export failed");
            }
            outcomes.push(TargetOutcome {
                target: target.clone(),
                result,
            });
        }
        outcomes
    }

    /// Export every community in the catalog, one document each.
    ///
    /// Only the community listing is fatal; each export keeps its own outcome.
    pub async fn export_all(&self, options: &ExportOptions) -> ApplicationResult<Vec<TargetOutcome>> {
        let targets: Vec<ExportTarget> = self
            .list_communities(options.page_size)
            .await?
            .into_iter()
            .map(|c| ExportTarget::Community(c.name))
            .collect();
        info!(count = targets.len(), "exporting all communities");
        Ok(self.export_many(&targets, options).await)
    }

    /// Walk each community in scope and export its domains one by one.
    async fn export_scope(
        &self,
        scope: &[&Node],
        options: &ExportOptions,
    ) -> ApplicationResult<Vec<DomainGroup>> {
        let mut groups = GroupAccumulator::new(options.grouping);

        for community in scope {
            let domains = self.domains_of(community, options.page_size).await?;
            info!(community = %community.name, domains = domains.len(), "enumerated domains");

            for domain in &domains {
                let assets = if options.include_assets {
                    let assets = self.domain_assets(domain, options).await?;
                    info!(domain = %domain.name, assets = assets.len(), "exported domain");
                    assets
                } else {
                    Vec::new()
                };
                groups.extend(domain, Some(&community.name), assets);
            }
        }

        Ok(groups.into_groups())
    }

    /// One structured query over all domains whose community is in scope.
    ///
    /// Groups follow each asset's own domain reference, so domains without
    /// assets do not appear.
    async fn export_bulk(
        &self,
        scope: &[&Node],
        options: &ExportOptions,
    ) -> ApplicationResult<Vec<DomainGroup>> {
        if options.method != ExportMethod::Graph {
            return Err(ApplicationError::Config {
                message: format!("bulk export needs the graph method, not {}", options.method),
            });
        }

        let filter = FilterExpression::in_set(
            &["domain", "parent", "id"],
            scope.iter().map(|c| c.id.as_str()),
        );
        let raws = self
            .query_assets(&filter, options)
            .await
            .with_call_context("bulk assets of community", &scope[0].name)?;
        info!(assets = raws.len(), communities = scope.len(), "bulk harvest done");

        let mut groups = GroupAccumulator::new(options.grouping);
        for raw in raws {
            let asset = self.finish_asset(normalize_asset(raw), options).await?;

            let reference = asset.domain.clone().unwrap_or_default();
            let id = reference.id.unwrap_or_default();
            let mut domain = Node::new(NodeKind::Domain, id.clone(), reference.name.unwrap_or(id));
            domain.type_name = reference.type_name;
            let community = asset.community.as_ref().and_then(|c| c.name.clone());

            groups.extend(&domain, community.as_deref(), vec![asset]);
        }

        Ok(groups.into_groups())
    }

    /// Harvest and normalize the assets of one domain.
    async fn domain_assets(&self, domain: &Node, options: &ExportOptions) -> ApplicationResult<Vec<Asset>> {
        let mut assets = Vec::new();

        match options.method {
            ExportMethod::Graph => {
                let filter = FilterExpression::eq(&["domain", "id"], &domain.id);
                let raws = self
                    .query_assets(&filter, options)
                    .await
                    .with_call_context("assets of domain", &domain.name)?;
                for raw in raws {
                    assets.push(self.finish_asset(normalize_asset(raw), options).await?);
                }
            }
            ExportMethod::Rest => {
                let api = self.api.as_ref();
                let filter = FilterExpression::object([("domainId", FilterExpression::from(&domain.id))]);
                let raws = harvest_all(options.page_size, |page| api.list_assets(&filter, page))
                    .await
                    .with_call_context("assets of domain", &domain.name)?;

                for raw in raws {
                    let mut asset = normalize_asset(raw);
                    if options.include_attributes {
                        let records = self
                            .api
                            .get_attributes(&asset.id)
                            .await
                            .with_call_context("attributes", &asset.id)?;
                        asset.set_attributes(normalize_attribute_records(&records));
                    }
                    if options.include_relations {
                        let records = self
                            .api
                            .get_relations(&asset.id)
                            .await
                            .with_call_context("relations", &asset.id)?;
                        asset.set_relations(normalize_relation_records(&asset.id, &records));
                    }
                    assets.push(self.finish_asset(asset, options).await?);
                }
            }
        }

        Ok(assets)
    }

    /// Page through the structured assets query.
    async fn query_assets(
        &self,
        filter: &FilterExpression,
        options: &ExportOptions,
    ) -> ApiResult<Vec<RawAsset>> {
        let api = self.api.as_ref();
        harvest_all(options.graph_page_size, |page| {
            let query = AssetQuery {
                limit: page.limit,
                offset: page.offset,
                filter: Some(filter),
                include_attributes: options.include_attributes,
                include_relations: options.include_relations,
            }
            .render();
            async move { api.query_assets(&query).await }
        })
        .await
    }

    async fn finish_asset(&self, mut asset: Asset, options: &ExportOptions) -> ApplicationResult<Asset> {
        if options.include_authorizations {
            let authorizations = self
                .authorizations
                .enrich(&asset.id, options.include_inherited)
                .await?;
            asset.authorizations = Some(authorizations);
        }
        Ok(asset)
    }
}
