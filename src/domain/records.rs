//! Raw record shapes as delivered by the catalog.
//!
//! Every field is optional: responses are read best-effort and absent or
//! `null` members never fail deserialization.

use serde::Deserialize;
use serde_json::Value;

/// `{ name }` reference used for types, statuses, tags and roles.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// Generic `{ id, name, resourceType }` reference.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
}

/// Domain reference embedded in an asset record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DomainRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub domain_type: Option<NamedRef>,
    /// Owning community (query surface only)
    #[serde(default)]
    pub parent: Option<ResourceRef>,
}

/// Asset as returned by either the REST listing or the structured query.
///
/// REST listings fill only the scalar fields; the typed attribute groups and
/// relation edges come from the structured query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAsset {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "type")]
    pub asset_type: Option<NamedRef>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub domain: Option<DomainRef>,
    #[serde(default)]
    pub tags: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub string_attributes: Option<Vec<StringAttributeEntry>>,
    #[serde(default)]
    pub boolean_attributes: Option<Vec<BooleanAttributeEntry>>,
    #[serde(default)]
    pub numeric_attributes: Option<Vec<NumericAttributeEntry>>,
    #[serde(default)]
    pub date_attributes: Option<Vec<DateAttributeEntry>>,
    #[serde(default)]
    pub multi_value_attributes: Option<Vec<MultiValueAttributeEntry>>,
    #[serde(default)]
    pub outgoing_relations: Option<Vec<GraphRelationEdge>>,
    #[serde(default)]
    pub incoming_relations: Option<Vec<GraphRelationEdge>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringAttributeEntry {
    #[serde(default, rename = "type")]
    pub attribute_type: Option<NamedRef>,
    #[serde(default)]
    pub string_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanAttributeEntry {
    #[serde(default, rename = "type")]
    pub attribute_type: Option<NamedRef>,
    #[serde(default)]
    pub boolean_value: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericAttributeEntry {
    #[serde(default, rename = "type")]
    pub attribute_type: Option<NamedRef>,
    #[serde(default)]
    pub numeric_value: Option<serde_json::Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateAttributeEntry {
    #[serde(default, rename = "type")]
    pub attribute_type: Option<NamedRef>,
    /// ISO string or epoch milliseconds
    #[serde(default)]
    pub date_value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiValueAttributeEntry {
    #[serde(default, rename = "type")]
    pub attribute_type: Option<NamedRef>,
    #[serde(default)]
    pub string_values: Option<Vec<String>>,
}

/// Endpoint of a relation edge.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeEnd {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub asset_type: Option<NamedRef>,
}

/// Relation type with its forward role and reverse role (co-role).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RelationTypeRef {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "coRole")]
    pub corole: Option<String>,
}

/// Relation edge from the structured query. Outgoing edges carry `target`,
/// incoming edges carry `source`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphRelationEdge {
    #[serde(default)]
    pub source: Option<EdgeEnd>,
    #[serde(default)]
    pub target: Option<EdgeEnd>,
    #[serde(default, rename = "type")]
    pub relation_type: Option<RelationTypeRef>,
}

/// Attribute type as returned by the REST attribute endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeTypeRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attribute_type_discriminator: Option<String>,
}

/// Attribute from the REST attribute endpoint: one untyped `value`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttributeRecord {
    #[serde(default, rename = "type")]
    pub attribute_type: Option<AttributeTypeRef>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Relation from the REST relation endpoint: both ends are always present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RelationRecord {
    #[serde(default)]
    pub source: Option<EdgeEnd>,
    #[serde(default)]
    pub target: Option<EdgeEnd>,
    #[serde(default, rename = "type")]
    pub relation_type: Option<RelationTypeRef>,
}

/// Responsibility assignment, possibly inherited from an ancestor resource.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsibilityRecord {
    #[serde(default)]
    pub role: Option<NamedRef>,
    #[serde(default)]
    pub owner: Option<ResourceRef>,
    #[serde(default)]
    pub base_resource: Option<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub(crate) fn name_of(named: &Option<NamedRef>) -> Option<String> {
    named.as_ref().and_then(|n| n.name.clone())
}
