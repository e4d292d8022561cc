//! Authorization enrichment service
//!
//! Fetches responsibilities for an asset and resolves owner identities with
//! two concurrent batch lookups.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::error_ext::ApiResultExt;
use crate::application::ApplicationResult;
use crate::domain::authorization::{self, collect_owner_ids, OwnerDirectory, OwnerIds};
use crate::domain::Authorizations;
use crate::infrastructure::traits::CatalogApi;

/// Service for attaching classified authorizations to assets.
pub struct AuthorizationService {
    api: Arc<dyn CatalogApi>,
}

impl AuthorizationService {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    /// Fetch, resolve and classify the authorizations of one asset.
    ///
    /// A failing responsibility listing fails the call. A failing owner
    /// lookup does not: affected owners keep only kind and id.
    pub async fn enrich(
        &self,
        asset_id: &str,
        include_inherited: bool,
    ) -> ApplicationResult<Authorizations> {
        let records = self
            .api
            .get_authorizations(asset_id, include_inherited)
            .await
            .with_call_context("responsibilities", asset_id)?;
        let records = authorization::select(asset_id, records, include_inherited);
        debug!(asset_id, records = records.len(), "fetched responsibilities");

        let directory = self.lookup_owners(&collect_owner_ids(&records)).await;
        Ok(authorization::enrich(
            asset_id,
            records,
            include_inherited,
            &directory,
        ))
    }

    /// Resolve user and group identities concurrently. Empty id sets skip the call.
    pub async fn lookup_owners(&self, ids: &OwnerIds) -> OwnerDirectory {
        let users = async {
            if ids.users.is_empty() {
                return Vec::new();
            }
            self.api.resolve_users(&ids.users).await.unwrap_or_else(|e| {
                warn!(count = ids.users.len(), error = %e, "user lookup failed, owners left unresolved");
                Vec::new()
            })
        };
        let groups = async {
            if ids.groups.is_empty() {
                return Vec::new();
            }
            self.api.resolve_groups(&ids.groups).await.unwrap_or_else(|e| {
                warn!(count = ids.groups.len(), error = %e, "group lookup failed, owners left unresolved");
                Vec::new()
            })
        };

        let (users, groups) = tokio::join!(users, groups);
        OwnerDirectory::new(users, groups)
    }
}
