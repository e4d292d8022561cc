//! Record normalization: polymorphic attribute and relation payloads into one
//! canonical shape per asset.

use chrono::{DateTime, SecondsFormat};
use itertools::Itertools;
use serde_json::Value;

use crate::domain::entities::{
    Asset, AssetCommunity, AssetDomain, Attribute, AttributeKind, AttributeValue, RelatedAsset,
    Relation, RelationDirection,
};
use crate::domain::records::{
    name_of, AttributeRecord, DomainRef, EdgeEnd, GraphRelationEdge, RawAsset, RelationRecord,
    RelationTypeRef,
};

/// Fixed emission order of the typed attribute groups.
fn group_rank(kind: AttributeKind) -> u8 {
    match kind {
        AttributeKind::String => 0,
        AttributeKind::Boolean => 1,
        AttributeKind::Numeric => 2,
        AttributeKind::Date => 3,
        AttributeKind::MultiValue => 4,
    }
}

/// Normalize an asset record.
///
/// Attributes come out in group order (string, boolean, numeric, date,
/// multi-value), source order within a group. Outgoing relations precede
/// incoming ones. Empty attribute and relation lists are omitted.
pub fn normalize_asset(raw: RawAsset) -> Asset {
    let attributes = graph_attributes(&raw);
    let relations = graph_relations(
        raw.outgoing_relations.as_deref().unwrap_or_default(),
        raw.incoming_relations.as_deref().unwrap_or_default(),
    );

    let tags = raw
        .tags
        .unwrap_or_default()
        .into_iter()
        .filter_map(|t| t.name)
        .unique()
        .collect();

    let (domain, community) = location(raw.domain);

    let mut asset = Asset {
        name: raw.name.or_else(|| raw.display_name.clone()),
        display_name: raw.display_name,
        type_name: name_of(&raw.asset_type),
        status: name_of(&raw.status),
        domain,
        community,
        id: raw.id,
        tags,
        attributes: None,
        relations: None,
        authorizations: None,
    };
    asset.set_attributes(attributes);
    asset.set_relations(relations);
    asset
}

/// Domain and owning community of an asset record. The community is only
/// known when the domain reference carries its parent.
fn location(domain: Option<DomainRef>) -> (Option<AssetDomain>, Option<AssetCommunity>) {
    let Some(domain) = domain else {
        return (None, None);
    };
    let community = domain
        .parent
        .filter(|p| p.id.is_some() || p.name.is_some())
        .map(|p| AssetCommunity {
            id: p.id,
            name: p.name,
        });
    let domain = AssetDomain {
        type_name: name_of(&domain.domain_type),
        id: domain.id,
        name: domain.name,
    };
    (Some(domain), community)
}

fn graph_attributes(raw: &RawAsset) -> Vec<Attribute> {
    let mut attributes = Vec::new();

    for entry in raw.string_attributes.iter().flatten() {
        attributes.push(typed(
            name_of(&entry.attribute_type),
            AttributeKind::String,
            entry.string_value.clone().map(AttributeValue::String),
        ));
    }
    for entry in raw.boolean_attributes.iter().flatten() {
        attributes.push(typed(
            name_of(&entry.attribute_type),
            AttributeKind::Boolean,
            entry.boolean_value.map(AttributeValue::Boolean),
        ));
    }
    for entry in raw.numeric_attributes.iter().flatten() {
        attributes.push(typed(
            name_of(&entry.attribute_type),
            AttributeKind::Numeric,
            entry.numeric_value.clone().map(AttributeValue::Numeric),
        ));
    }
    for entry in raw.date_attributes.iter().flatten() {
        attributes.push(typed(
            name_of(&entry.attribute_type),
            AttributeKind::Date,
            entry.date_value.as_ref().and_then(date_value),
        ));
    }
    for entry in raw.multi_value_attributes.iter().flatten() {
        attributes.push(typed(
            name_of(&entry.attribute_type),
            AttributeKind::MultiValue,
            entry.string_values.clone().map(AttributeValue::MultiValue),
        ));
    }

    attributes
}

fn typed(type_name: Option<String>, kind: AttributeKind, value: Option<AttributeValue>) -> Attribute {
    match value {
        Some(value) => Attribute::new(type_name, value),
        None => Attribute::empty(type_name, kind),
    }
}

fn graph_relations(outgoing: &[GraphRelationEdge], incoming: &[GraphRelationEdge]) -> Vec<Relation> {
    let outgoing = outgoing.iter().map(|edge| {
        oriented(
            RelationDirection::Outgoing,
            edge.relation_type.as_ref(),
            edge.target.as_ref(),
        )
    });
    let incoming = incoming.iter().map(|edge| {
        oriented(
            RelationDirection::Incoming,
            edge.relation_type.as_ref(),
            edge.source.as_ref(),
        )
    });
    outgoing.chain(incoming).collect()
}

/// Build a relation as seen from the exported asset.
///
/// Outgoing keeps (role, co-role); incoming swaps them so `relation_type`
/// always reads from the exported asset's side.
fn oriented(
    direction: RelationDirection,
    relation_type: Option<&RelationTypeRef>,
    other_end: Option<&EdgeEnd>,
) -> Relation {
    let role = relation_type.and_then(|t| t.role.clone());
    let corole = relation_type.and_then(|t| t.corole.clone());
    let (relation_type, relation_type_reverse) = match direction {
        RelationDirection::Outgoing => (role, corole),
        RelationDirection::Incoming => (corole, role),
    };

    Relation {
        direction,
        relation_type,
        relation_type_reverse,
        related_asset: related(other_end),
    }
}

fn related(end: Option<&EdgeEnd>) -> RelatedAsset {
    match end {
        Some(end) => RelatedAsset {
            id: end.id.clone(),
            display_name: end.display_name.clone().or_else(|| end.name.clone()),
            type_name: name_of(&end.asset_type),
        },
        None => RelatedAsset {
            id: None,
            display_name: None,
            type_name: None,
        },
    }
}

// ============================================================
// REST record shapes
// ============================================================

/// Normalize attribute records from the REST attribute endpoint.
///
/// The kind comes from the attribute type discriminator when present and from
/// the JSON shape of the value otherwise. Output follows the same group order
/// as [`normalize_asset`].
pub fn normalize_attribute_records(records: &[AttributeRecord]) -> Vec<Attribute> {
    let mut attributes: Vec<Attribute> = records
        .iter()
        .map(|record| {
            let type_ref = record.attribute_type.as_ref();
            let type_name = type_ref.and_then(|t| t.name.clone());
            let declared = type_ref
                .and_then(|t| t.attribute_type_discriminator.as_deref())
                .and_then(kind_from_discriminator);

            match record.value.as_ref().filter(|v| !v.is_null()) {
                Some(value) => {
                    let value = declared
                        .and_then(|kind| coerce(kind, value))
                        .or_else(|| infer(value));
                    match value {
                        Some(value) => Attribute::new(type_name, value),
                        None => Attribute::empty(type_name, declared.unwrap_or(AttributeKind::String)),
                    }
                }
                None => Attribute::empty(type_name, declared.unwrap_or(AttributeKind::String)),
            }
        })
        .collect();

    // stable: keeps source order within a group
    attributes.sort_by_key(|a| group_rank(a.kind()));
    attributes
}

/// Normalize relation records from the REST relation endpoint.
///
/// Records whose source is `asset_id` are outgoing, all others incoming.
pub fn normalize_relation_records(asset_id: &str, records: &[RelationRecord]) -> Vec<Relation> {
    let (outgoing, incoming): (Vec<&RelationRecord>, Vec<&RelationRecord>) = records
        .iter()
        .partition(|r| r.source.as_ref().and_then(|s| s.id.as_deref()) == Some(asset_id));

    let outgoing = outgoing.into_iter().map(|r| {
        oriented(
            RelationDirection::Outgoing,
            r.relation_type.as_ref(),
            r.target.as_ref(),
        )
    });
    let incoming = incoming.into_iter().map(|r| {
        oriented(
            RelationDirection::Incoming,
            r.relation_type.as_ref(),
            r.source.as_ref(),
        )
    });
    outgoing.chain(incoming).collect()
}

fn kind_from_discriminator(discriminator: &str) -> Option<AttributeKind> {
    match discriminator {
        "StringAttributeType" | "ScriptAttributeType" => Some(AttributeKind::String),
        "BooleanAttributeType" => Some(AttributeKind::Boolean),
        "NumericAttributeType" => Some(AttributeKind::Numeric),
        "DateAttributeType" => Some(AttributeKind::Date),
        "MultiValueAttributeType" | "SingleValueListAttributeType" => {
            Some(AttributeKind::MultiValue)
        }
        _ => None,
    }
}

/// Convert `value` to the declared kind, `None` when it does not fit.
fn coerce(kind: AttributeKind, value: &Value) -> Option<AttributeValue> {
    match (kind, value) {
        (AttributeKind::String, Value::String(s)) => Some(AttributeValue::String(s.clone())),
        (AttributeKind::String, other) => Some(AttributeValue::String(other.to_string())),
        (AttributeKind::Boolean, Value::Bool(b)) => Some(AttributeValue::Boolean(*b)),
        (AttributeKind::Boolean, Value::String(s)) => s.parse().ok().map(AttributeValue::Boolean),
        (AttributeKind::Numeric, Value::Number(n)) => Some(AttributeValue::Numeric(n.clone())),
        (AttributeKind::Numeric, Value::String(s)) => s.parse().ok().map(AttributeValue::Numeric),
        (AttributeKind::Date, value) => date_value(value),
        (AttributeKind::MultiValue, Value::Array(items)) => Some(AttributeValue::MultiValue(
            items.iter().map(plain_text).collect(),
        )),
        (AttributeKind::MultiValue, Value::String(s)) => {
            Some(AttributeValue::MultiValue(vec![s.clone()]))
        }
        _ => None,
    }
}

/// Kind from the JSON shape alone.
fn infer(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(AttributeValue::String(s.clone())),
        Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
        Value::Number(n) => Some(AttributeValue::Numeric(n.clone())),
        Value::Array(items) => Some(AttributeValue::MultiValue(
            items.iter().map(plain_text).collect(),
        )),
        Value::Object(_) => Some(AttributeValue::String(value.to_string())),
    }
}

/// Dates arrive as ISO strings or epoch milliseconds; both end up as RFC 3339 text.
fn date_value(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::String(s) => Some(AttributeValue::Date(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| AttributeValue::Date(dt.to_rfc3339_opts(SecondsFormat::Millis, true))),
        _ => None,
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
