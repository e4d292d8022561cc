//! Authorization classification and owner identity resolution.
//!
//! Pure part of the enrichment: the batch lookups themselves live in
//! `application::services::AuthorizationService`.

use std::collections::HashMap;

use itertools::Itertools;

use crate::domain::entities::{
    Authorization, AuthorizationSummary, Authorizations, GroupIdentity, InheritedAuthorizations,
    Owner, OwnerIdentity, OwnerKind, UserIdentity,
};
use crate::domain::records::{GroupRecord, ResourceRef, ResponsibilityRecord, UserRecord};

const COMMUNITY_RESOURCE: &str = "Community";
const DOMAIN_RESOURCE: &str = "Domain";

fn is_direct(asset_id: &str, base_resource_id: Option<&str>) -> bool {
    base_resource_id == Some(asset_id)
}

/// Distinct owner ids per kind, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerIds {
    pub users: Vec<String>,
    pub groups: Vec<String>,
}

impl OwnerIds {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }
}

/// Collect the owner ids that need an identity lookup.
pub fn collect_owner_ids(records: &[ResponsibilityRecord]) -> OwnerIds {
    let owners_of = |kind: OwnerKind| {
        records
            .iter()
            .filter_map(|r| r.owner.as_ref())
            .filter(|o| o.resource_type.as_deref().map(OwnerKind::parse).as_ref() == Some(&kind))
            .filter_map(|o| o.id.clone())
            .unique()
            .collect::<Vec<_>>()
    };

    OwnerIds {
        users: owners_of(OwnerKind::User),
        groups: owners_of(OwnerKind::UserGroup),
    }
}

/// Identities returned by the batch lookups, keyed by owner id.
#[derive(Debug, Clone, Default)]
pub struct OwnerDirectory {
    users: HashMap<String, UserRecord>,
    groups: HashMap<String, GroupRecord>,
}

impl OwnerDirectory {
    pub fn new(users: Vec<UserRecord>, groups: Vec<GroupRecord>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            groups: groups.into_iter().map(|g| (g.id.clone(), g)).collect(),
        }
    }

    /// Owner with its identity attached when the directory knows it, a stub otherwise.
    pub fn resolve(&self, owner: &ResourceRef) -> Owner {
        let kind = OwnerKind::parse(owner.resource_type.as_deref().unwrap_or_default());
        let id = owner.id.clone();

        let identity = id.as_deref().and_then(|id| match kind {
            OwnerKind::User => self.users.get(id).map(|u| OwnerIdentity::User(user_identity(u))),
            OwnerKind::UserGroup => self.groups.get(id).map(|g| {
                OwnerIdentity::Group(GroupIdentity {
                    name: g.name.clone(),
                    description: g.description.clone(),
                })
            }),
            OwnerKind::Other(_) => None,
        });

        Owner { kind, id, identity }
    }
}

fn user_identity(user: &UserRecord) -> UserIdentity {
    UserIdentity {
        full_name: full_name(
            user.first_name.as_deref(),
            user.last_name.as_deref(),
            user.user_name.as_deref(),
        ),
        user_name: user.user_name.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email_address: user.email_address.clone(),
    }
}

/// `first + " " + last`, trimmed; falls back to `user_name` when that is empty.
pub fn full_name(first: Option<&str>, last: Option<&str>, user_name: Option<&str>) -> Option<String> {
    let joined = format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default());
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        user_name.map(str::to_string)
    } else {
        Some(trimmed.to_string())
    }
}

/// Drop inherited records unless they are wanted.
pub fn select(
    asset_id: &str,
    records: Vec<ResponsibilityRecord>,
    include_inherited: bool,
) -> Vec<ResponsibilityRecord> {
    if include_inherited {
        return records;
    }
    records
        .into_iter()
        .filter(|r| is_direct(asset_id, r.base_resource.as_ref().and_then(|b| b.id.as_deref())))
        .collect()
}

/// Turn a raw record into an authorization, resolving its owner.
pub fn to_authorization(record: &ResponsibilityRecord, directory: &OwnerDirectory) -> Authorization {
    let base = record.base_resource.as_ref();
    Authorization {
        role: record.role.as_ref().and_then(|r| r.name.clone()),
        owner: record.owner.as_ref().map(|o| directory.resolve(o)),
        base_resource_id: base.and_then(|b| b.id.clone()),
        base_resource_type: base.and_then(|b| b.resource_type.clone()),
        base_resource_name: base.and_then(|b| b.name.clone()),
    }
}

/// Partition authorizations into direct and inherited, split inherited by origin.
///
/// Inherited entries from neither a community nor a domain stay only in
/// `inherited.all`.
pub fn classify(asset_id: &str, authorizations: Vec<Authorization>) -> Authorizations {
    let (direct, inherited): (Vec<Authorization>, Vec<Authorization>) = authorizations
        .into_iter()
        .partition(|a| is_direct(asset_id, a.base_resource_id.as_deref()));

    let from = |resource: &str| {
        inherited
            .iter()
            .filter(|a| a.base_resource_type.as_deref() == Some(resource))
            .cloned()
            .collect::<Vec<_>>()
    };
    let from_community = from(COMMUNITY_RESOURCE);
    let from_domain = from(DOMAIN_RESOURCE);

    Authorizations {
        summary: AuthorizationSummary {
            total: direct.len() + inherited.len(),
            direct: direct.len(),
            inherited: inherited.len(),
            from_community: from_community.len(),
            from_domain: from_domain.len(),
        },
        direct,
        inherited: InheritedAuthorizations {
            all: inherited,
            from_community,
            from_domain,
        },
    }
}

/// Classify `records` for `asset_id` with owners resolved against `directory`.
pub fn enrich(
    asset_id: &str,
    records: Vec<ResponsibilityRecord>,
    include_inherited: bool,
    directory: &OwnerDirectory,
) -> Authorizations {
    let authorizations = select(asset_id, records, include_inherited)
        .iter()
        .map(|r| to_authorization(r, directory))
        .collect();
    classify(asset_id, authorizations)
}
