//! Domain entities: core data structures of the export document

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

/// Kind of hierarchy node in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Community,
    Domain,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Community => write!(f, "community"),
            NodeKind::Domain => write!(f, "domain"),
        }
    }
}

/// Weak reference to another node: a lookup key, never an owning link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Community or domain as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Domain type name; communities carry none
    pub type_name: Option<String>,
    /// Parent community (for a community) or owning community (for a domain)
    pub parent: Option<ParentRef>,
}

impl Node {
    pub fn new(kind: NodeKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            description: None,
            type_name: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, id: impl Into<String>, name: Option<&str>) -> Self {
        self.parent = Some(ParentRef {
            id: id.into(),
            name: name.map(str::to_string),
        });
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.id.as_str())
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Id and name of a node included in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub id: String,
    pub name: String,
}

// ============================================================
// Assets
// ============================================================

/// Attribute kind, always derived from the value shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKind {
    String,
    Boolean,
    Numeric,
    Date,
    MultiValue,
}

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Boolean(bool),
    Numeric(serde_json::Number),
    /// RFC 3339 timestamp as delivered (or converted from epoch millis)
    Date(String),
    MultiValue(Vec<String>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::String(_) => AttributeKind::String,
            AttributeValue::Boolean(_) => AttributeKind::Boolean,
            AttributeValue::Numeric(_) => AttributeKind::Numeric,
            AttributeValue::Date(_) => AttributeKind::Date,
            AttributeValue::MultiValue(_) => AttributeKind::MultiValue,
        }
    }
}

/// Normalized attribute. `kind` is not stored, so it cannot drift from `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub type_name: Option<String>,
    pub value: Option<AttributeValue>,
    kind: AttributeKind,
}

impl Attribute {
    pub fn new(type_name: Option<String>, value: AttributeValue) -> Self {
        let kind = value.kind();
        Self {
            type_name,
            value: Some(value),
            kind,
        }
    }

    /// Attribute whose typed group is known but whose value field was absent.
    pub fn empty(type_name: Option<String>, kind: AttributeKind) -> Self {
        Self {
            type_name,
            value: None,
            kind,
        }
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Attribute", 3)?;
        if let Some(type_name) = &self.type_name {
            state.serialize_field("type", type_name)?;
        } else {
            state.skip_field("type")?;
        }
        if let Some(value) = &self.value {
            state.serialize_field("value", value)?;
        } else {
            state.skip_field("value")?;
        }
        state.serialize_field("dataType", &self.kind)?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationDirection {
    Outgoing,
    Incoming,
}

/// The asset on the other end of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedAsset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

/// Normalized relation, seen from the exported asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub direction: RelationDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_type_reverse: Option<String>,
    pub related_asset: RelatedAsset,
}

/// Domain an asset record points at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetDomain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

/// Community owning the domain of an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetCommunity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Normalized asset as it appears in the export document.
///
/// `attributes` and `relations` are `None` instead of empty so the serialized
/// document omits them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<AssetDomain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<AssetCommunity>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<Relation>>,
    #[serde(rename = "responsibilities", skip_serializing_if = "Option::is_none")]
    pub authorizations: Option<Authorizations>,
}

impl Asset {
    pub fn set_attributes(&mut self, attributes: Vec<Attribute>) {
        self.attributes = non_empty(attributes);
    }

    pub fn set_relations(&mut self, relations: Vec<Relation>) {
        self.relations = non_empty(relations);
    }

    pub fn has_attributes(&self) -> bool {
        self.attributes.as_ref().is_some_and(|a| !a.is_empty())
    }

    pub fn has_relations(&self) -> bool {
        self.relations.as_ref().is_some_and(|r| !r.is_empty())
    }
}

pub(crate) fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

// ============================================================
// Authorizations
// ============================================================

/// Resource type of an authorization owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    User,
    UserGroup,
    Other(String),
}

impl OwnerKind {
    pub fn parse(resource_type: &str) -> Self {
        match resource_type {
            "User" => OwnerKind::User,
            "UserGroup" => OwnerKind::UserGroup,
            other => OwnerKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OwnerKind::User => "User",
            OwnerKind::UserGroup => "UserGroup",
            OwnerKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupIdentity {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerIdentity {
    User(UserIdentity),
    Group(GroupIdentity),
}

/// Owner of an authorization. `identity` stays `None` when the batch lookup
/// did not resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: Option<String>,
    pub identity: Option<OwnerIdentity>,
}

impl Owner {
    pub fn stub(kind: OwnerKind, id: Option<String>) -> Self {
        Self {
            kind,
            id,
            identity: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }
}

impl Serialize for Owner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind.as_str())?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        let mut entry = |key: &str, value: &Option<String>| match value {
            Some(v) => map.serialize_entry(key, v),
            None => Ok(()),
        };
        match &self.identity {
            Some(OwnerIdentity::User(user)) => {
                entry("userName", &user.user_name)?;
                entry("fullName", &user.full_name)?;
                entry("firstName", &user.first_name)?;
                entry("lastName", &user.last_name)?;
                entry("emailAddress", &user.email_address)?;
            }
            Some(OwnerIdentity::Group(group)) => {
                entry("name", &group.name)?;
                entry("description", &group.description)?;
            }
            None => {}
        }
        map.end()
    }
}

/// One responsibility assignment on an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_resource_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritedAuthorizations {
    pub all: Vec<Authorization>,
    pub from_community: Vec<Authorization>,
    pub from_domain: Vec<Authorization>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationSummary {
    pub total: usize,
    pub direct: usize,
    pub inherited: usize,
    pub from_community: usize,
    pub from_domain: usize,
}

/// Authorizations of one asset, classified by inheritance origin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorizations {
    pub summary: AuthorizationSummary,
    pub direct: Vec<Authorization>,
    pub inherited: InheritedAuthorizations,
}

// ============================================================
// Export document
// ============================================================

/// Which query surface the assets were harvested from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMethod {
    #[default]
    Graph,
    Rest,
}

impl ExportMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ExportMethod::Graph => "GraphQL",
            ExportMethod::Rest => "REST",
        }
    }
}

impl fmt::Display for ExportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportMethod::Graph => write!(f, "graph"),
            ExportMethod::Rest => write!(f, "rest"),
        }
    }
}

impl FromStr for ExportMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "graph" | "graphql" => Ok(ExportMethod::Graph),
            "rest" => Ok(ExportMethod::Rest),
            other => Err(format!("unknown export method '{other}' (expected graph|rest)")),
        }
    }
}

/// Key used to fold assets into domain groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainGrouping {
    #[default]
    Id,
    /// Domains sharing a display name are folded into one group
    Name,
}

impl FromStr for DomainGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(DomainGrouping::Id),
            "name" => Ok(DomainGrouping::Name),
            other => Err(format!("unknown grouping '{other}' (expected id|name)")),
        }
    }
}

/// Metadata about what was exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub kind: NodeKind,
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub exported_at: DateTime<Utc>,
    pub method: ExportMethod,
    pub includes_subcommunities: bool,
    pub subcommunities: Vec<NodeSummary>,
}

/// Assets of one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainGroup {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Name of the owning community
    #[serde(rename = "community", skip_serializing_if = "Option::is_none")]
    pub owning_community_name: Option<String>,
    pub assets: Vec<Asset>,
}

impl DomainGroup {
    /// Empty group for `domain`, owned by the community named `community`.
    pub fn for_domain(domain: &Node, community: Option<&str>) -> Self {
        Self {
            id: domain.id.clone(),
            name: domain.name.clone(),
            description: domain.description.clone(),
            type_name: domain.type_name.clone(),
            owning_community_name: community.map(str::to_string),
            assets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_communities: usize,
    pub total_domains: usize,
    pub total_assets: usize,
    pub assets_with_attributes: usize,
    pub assets_with_relations: usize,
}

impl Statistics {
    /// Compute statistics from the assembled document contents in one pass.
    pub fn scan(target: &TargetInfo, domains: &[DomainGroup]) -> Self {
        let mut stats = Statistics {
            total_domains: domains.len(),
            ..Default::default()
        };
        let mut owning = std::collections::HashSet::new();

        for domain in domains {
            if let Some(community) = &domain.owning_community_name {
                owning.insert(community.as_str());
            }
            for asset in &domain.assets {
                stats.total_assets += 1;
                if asset.has_attributes() {
                    stats.assets_with_attributes += 1;
                }
                if asset.has_relations() {
                    stats.assets_with_relations += 1;
                }
            }
        }

        stats.total_communities = match target.kind {
            NodeKind::Community => 1 + target.subcommunities.len(),
            NodeKind::Domain => owning.len(),
        };
        stats
    }
}

/// Self-contained export of one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub target: TargetInfo,
    pub domains: Vec<DomainGroup>,
    pub statistics: Statistics,
}

impl ExportDocument {
    /// Seal the document; statistics are derived from `domains` here and nowhere else.
    pub fn assemble(target: TargetInfo, domains: Vec<DomainGroup>) -> Self {
        let statistics = Statistics::scan(&target, &domains);
        Self {
            target,
            domains,
            statistics,
        }
    }
}

/// Expand environment variables in a path string.
///
/// Supports:
/// - `$VAR` syntax
/// - `${VAR}` syntax
/// - `~` for home directory
///
/// Uses shellexpand crate for robust expansion.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(kind: NodeKind, subcommunities: usize) -> TargetInfo {
        TargetInfo {
            kind,
            id: "t".into(),
            name: "T".into(),
            description: None,
            exported_at: Utc::now(),
            method: ExportMethod::Graph,
            includes_subcommunities: subcommunities > 0,
            subcommunities: (0..subcommunities)
                .map(|i| NodeSummary {
                    id: format!("s{i}"),
                    name: format!("S{i}"),
                })
                .collect(),
        }
    }

    fn asset(id: &str, with_attribute: bool) -> Asset {
        let mut asset = Asset {
            id: id.into(),
            name: None,
            display_name: Some(id.into()),
            type_name: None,
            status: None,
            domain: None,
            community: None,
            tags: vec![],
            attributes: None,
            relations: None,
            authorizations: None,
        };
        if with_attribute {
            asset.set_attributes(vec![Attribute::new(
                Some("Description".into()),
                AttributeValue::String("x".into()),
            )]);
        }
        asset
    }

    #[test]
    fn given_empty_attribute_list_when_set_then_field_is_omitted() {
        let mut a = asset("a1", false);
        a.set_attributes(vec![]);
        assert!(a.attributes.is_none());

        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("attributes").is_none());
        assert!(json.get("relations").is_none());
    }

    #[test]
    fn given_attribute_when_serialized_then_data_type_matches_value() {
        let attr = Attribute::new(Some("Flag".into()), AttributeValue::Boolean(true));
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(json["type"], "Flag");
        assert_eq!(json["value"], true);
        assert_eq!(json["dataType"], "boolean");
    }

    #[test]
    fn given_unresolved_owner_when_serialized_then_only_kind_and_id() {
        let owner = Owner::stub(OwnerKind::User, Some("u1".into()));
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json, serde_json::json!({"type": "User", "id": "u1"}));
    }

    #[test]
    fn given_domains_when_scanning_then_counts_match_contents() {
        let domains = vec![
            DomainGroup {
                assets: vec![asset("a1", true), asset("a2", false)],
                ..DomainGroup::for_domain(&Node::new(NodeKind::Domain, "d1", "D1"), Some("C"))
            },
            DomainGroup::for_domain(&Node::new(NodeKind::Domain, "d2", "D2"), Some("C")),
        ];

        let doc = ExportDocument::assemble(target(NodeKind::Community, 2), domains);

        assert_eq!(doc.statistics.total_communities, 3);
        assert_eq!(doc.statistics.total_domains, 2);
        assert_eq!(doc.statistics.total_assets, 2);
        assert_eq!(doc.statistics.assets_with_attributes, 1);
        assert_eq!(doc.statistics.assets_with_relations, 0);
    }

    #[test]
    fn given_domain_target_when_scanning_then_counts_owning_communities() {
        let domains = vec![DomainGroup::for_domain(
            &Node::new(NodeKind::Domain, "d1", "D1"),
            Some("C"),
        )];
        let stats = Statistics::scan(&target(NodeKind::Domain, 0), &domains);
        assert_eq!(stats.total_communities, 1);
    }

    #[test]
    fn given_domain_metadata_when_grouping_then_description_and_type_serialized() {
        let domain = Node::new(NodeKind::Domain, "d1", "Sales")
            .with_description("Revenue data")
            .with_type("Data Asset Domain");

        let json = serde_json::to_value(DomainGroup::for_domain(&domain, Some("Org"))).unwrap();

        assert_eq!(json["description"], "Revenue data");
        assert_eq!(json["type"], "Data Asset Domain");
        assert_eq!(json["community"], "Org");

        let bare = serde_json::to_value(DomainGroup::for_domain(
            &Node::new(NodeKind::Domain, "d2", "Ops"),
            None,
        ))
        .unwrap();
        assert!(bare.get("description").is_none());
        assert!(bare.get("type").is_none());
    }

    #[test]
    fn given_method_names_when_parsing_then_accepts_aliases() {
        assert_eq!("graphql".parse::<ExportMethod>(), Ok(ExportMethod::Graph));
        assert_eq!("REST".parse::<ExportMethod>(), Ok(ExportMethod::Rest));
        assert!("soap".parse::<ExportMethod>().is_err());
        assert_eq!("name".parse::<DomainGrouping>(), Ok(DomainGrouping::Name));
    }
}
