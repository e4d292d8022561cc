//! Tests for ExportService against an in-memory catalog
//!
//! Fixture: community "Org" (c1) with subcommunity "Org Sales" (c2) and an
//! unrelated community "Elsewhere" (c3). Domain "Customers" (d1) belongs to
//! Org and holds two assets, one of them with a string attribute.

use std::num::NonZeroUsize;
use std::sync::Arc;

use rstest::rstest;
use serde_json::json;

use catex::application::services::{ExportOptions, ExportService, ExportTarget};
use catex::application::ApplicationError;
use catex::domain::records::{NamedRef, ResponsibilityRecord, StringAttributeEntry};
use catex::domain::{DomainGrouping, ExportMethod, Node, NodeKind};
use catex::util::testing::{community, domain, init_test_setup, raw_asset, StubCatalog};

fn org() -> Node {
    community("c1", "Org", None)
}

fn org_sales() -> Node {
    community("c2", "Org Sales", Some("c1"))
}

fn elsewhere() -> Node {
    community("c3", "Elsewhere", None)
}

fn customers() -> Node {
    domain("d1", "Customers", &org())
}

fn catalog() -> StubCatalog {
    let mut master = raw_asset("a1", "Customer Master", &customers());
    master.string_attributes = Some(vec![StringAttributeEntry {
        attribute_type: Some(NamedRef {
            name: Some("Description".to_string()),
        }),
        string_value: Some("Golden record".to_string()),
    }]);

    StubCatalog::new()
        .with_community(org())
        .with_community(org_sales())
        .with_community(elsewhere())
        .with_domain(customers())
        .with_asset(master)
        .with_asset(raw_asset("a2", "Customer Staging", &customers()))
}

fn service(stub: &Arc<StubCatalog>) -> ExportService {
    ExportService::new(stub.clone())
}

fn org_target() -> ExportTarget {
    ExportTarget::Community("Org".to_string())
}

// ============================================================
// Community export
// ============================================================

#[tokio::test]
async fn given_community_with_subcommunity_when_exporting_then_statistics_match_contents() {
    init_test_setup();
    let stub = Arc::new(catalog());

    let document = service(&stub)
        .export(&org_target(), &ExportOptions::default())
        .await
        .unwrap();

    let stats = document.statistics;
    assert_eq!(stats.total_communities, 2);
    assert_eq!(stats.total_domains, 1);
    assert_eq!(stats.total_assets, 2);
    assert_eq!(stats.assets_with_attributes, 1);
    assert_eq!(stats.assets_with_relations, 0);

    assert_eq!(document.target.id, "c1");
    assert!(document.target.includes_subcommunities);
    assert_eq!(document.target.subcommunities.len(), 1);
    assert_eq!(document.target.subcommunities[0].id, "c2");

    let group = &document.domains[0];
    assert_eq!(group.id, "d1");
    assert_eq!(group.owning_community_name.as_deref(), Some("Org"));
    let ids: Vec<&str> = group.assets.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);
}

#[tokio::test]
async fn given_unknown_name_when_exporting_then_not_found() {
    init_test_setup();
    let stub = Arc::new(catalog());

    let result = service(&stub)
        .export(
            &ExportTarget::Community("Nope".to_string()),
            &ExportOptions::default(),
        )
        .await;

    match result {
        Err(ApplicationError::NotFound { kind, name }) => {
            assert_eq!(kind, NodeKind::Community);
            assert_eq!(name, "Nope");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn given_no_subcommunities_option_when_exporting_then_hierarchy_not_listed() {
    init_test_setup();
    let stub = Arc::new(catalog());
    let options = ExportOptions {
        include_subcommunities: false,
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    assert!(!document.target.includes_subcommunities);
    assert!(document.target.subcommunities.is_empty());
    assert_eq!(document.statistics.total_communities, 1);
    // only the name lookup touched the community listing
    assert_eq!(stub.count("list_nodes community"), 1);
}

#[tokio::test]
async fn given_community_without_domains_when_exporting_then_empty_document() {
    init_test_setup();
    let stub = Arc::new(catalog());

    let document = service(&stub)
        .export(
            &ExportTarget::Community("Elsewhere".to_string()),
            &ExportOptions::default(),
        )
        .await
        .unwrap();

    assert!(document.domains.is_empty());
    assert_eq!(document.statistics.total_communities, 1);
    assert_eq!(document.statistics.total_domains, 0);
    assert_eq!(document.statistics.total_assets, 0);
}

#[tokio::test]
async fn given_small_graph_page_size_when_exporting_then_pages_until_short_page() {
    init_test_setup();
    let stub = Arc::new(catalog());
    let options = ExportOptions {
        graph_page_size: NonZeroUsize::new(1).unwrap(),
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    assert_eq!(document.statistics.total_assets, 2);
    // offsets 0, 1 and the trailing empty page at 2
    assert_eq!(stub.count("query_assets domain=d1"), 3);
}

#[tokio::test]
async fn given_attributes_excluded_when_exporting_then_no_asset_has_attributes() {
    init_test_setup();
    let stub = Arc::new(catalog());
    let options = ExportOptions {
        include_attributes: false,
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    assert_eq!(document.statistics.assets_with_attributes, 0);
    let json = serde_json::to_value(&document).unwrap();
    assert!(json["domains"][0]["assets"][0].get("attributes").is_none());
}

// ============================================================
// Domain export
// ============================================================

#[tokio::test]
async fn given_domain_target_when_exporting_then_single_group_and_owning_community() {
    init_test_setup();
    let stub = Arc::new(catalog());

    let document = service(&stub)
        .export(
            &ExportTarget::Domain("Customers".to_string()),
            &ExportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(document.target.kind, NodeKind::Domain);
    assert!(!document.target.includes_subcommunities);
    assert_eq!(document.domains.len(), 1);
    assert_eq!(document.statistics.total_communities, 1);
    assert_eq!(document.statistics.total_assets, 2);
}

// ============================================================
// Failures
// ============================================================

#[tokio::test]
async fn given_failing_asset_page_when_exporting_then_transport_error() {
    init_test_setup();
    let stub = Arc::new(catalog().failing_on("query_assets domain=d1"));

    let result = service(&stub)
        .export(&org_target(), &ExportOptions::default())
        .await;

    match result {
        Err(ApplicationError::Transport { context, .. }) => {
            assert!(context.contains("Customers"), "context was: {context}")
        }
        other => panic!("expected Transport, got {other:?}"),
    }
}

#[tokio::test]
async fn given_one_failing_target_when_exporting_many_then_siblings_still_succeed() {
    init_test_setup();
    let archive = domain("d9", "Archive", &elsewhere());
    let stub = Arc::new(
        catalog()
            .with_domain(archive.clone())
            .with_asset(raw_asset("a9", "Old Orders", &archive))
            .failing_on("query_assets domain=d1"),
    );
    let targets = vec![
        org_target(),
        ExportTarget::Community("Elsewhere".to_string()),
    ];

    let outcomes = service(&stub)
        .export_many(&targets, &ExportOptions::default())
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].target, targets[0]);
    assert!(outcomes[0].result.is_err());
    let document = outcomes[1].result.as_ref().unwrap();
    assert_eq!(document.statistics.total_assets, 1);
}

#[tokio::test]
async fn given_failing_owner_lookup_when_exporting_with_authorizations_then_owners_unresolved() {
    init_test_setup();
    let record: ResponsibilityRecord = serde_json::from_value(json!({
        "role": {"name": "Owner"},
        "owner": {"id": "u1", "resourceType": "User"},
        "baseResource": {"id": "a1", "resourceType": "Asset"}
    }))
    .unwrap();
    let stub = Arc::new(
        catalog()
            .with_responsibilities("a1", vec![record])
            .failing_on("resolve_users"),
    );
    let options = ExportOptions {
        include_authorizations: true,
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    let authorizations = document.domains[0].assets[0]
        .authorizations
        .as_ref()
        .unwrap();
    assert_eq!(authorizations.summary.direct, 1);
    assert!(!authorizations.direct[0].owner.as_ref().unwrap().is_resolved());
    // assets without records still carry an empty classification
    let empty = document.domains[0].assets[1].authorizations.as_ref().unwrap();
    assert_eq!(empty.summary.total, 0);
}

// ============================================================
// Methods and grouping
// ============================================================

#[tokio::test]
async fn given_rest_method_when_exporting_then_per_asset_lookups_used() {
    init_test_setup();
    let attribute = serde_json::from_value(json!({
        "type": {"name": "Description", "attributeTypeDiscriminator": "StringAttributeType"},
        "value": "Staging copy"
    }))
    .unwrap();
    let relation = serde_json::from_value(json!({
        "source": {"id": "a2", "name": "Customer Staging"},
        "target": {"id": "a1", "name": "Customer Master"},
        "type": {"role": "feeds", "coRole": "is fed by"}
    }))
    .unwrap();
    let stub = Arc::new(
        catalog()
            .with_attributes("a2", vec![attribute])
            .with_relations("a2", vec![relation]),
    );
    let options = ExportOptions {
        method: ExportMethod::Rest,
        include_relations: true,
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    assert_eq!(stub.count("query_assets"), 0);
    assert_eq!(stub.count("list_assets domainId=d1"), 1);
    assert_eq!(stub.count("get_attributes"), 2);
    assert_eq!(stub.count("get_relations"), 2);

    let stats = document.statistics;
    assert_eq!(stats.total_assets, 2);
    assert_eq!(stats.assets_with_attributes, 1);
    assert_eq!(stats.assets_with_relations, 1);
    let staging = &document.domains[0].assets[1];
    assert_eq!(staging.id, "a2");
    assert!(staging.has_attributes());
}

#[tokio::test]
async fn given_bulk_option_when_exporting_then_one_query_covers_scope() {
    init_test_setup();
    let leads = domain("d2", "Leads", &org_sales());
    let stub = Arc::new(
        catalog()
            .with_domain(leads.clone())
            .with_asset(raw_asset("a3", "Lead List", &leads)),
    );
    let options = ExportOptions {
        bulk: true,
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    assert_eq!(stub.count("query_assets communities=c1,c2"), 1);
    assert_eq!(stub.count("list_nodes domain"), 0);
    assert_eq!(document.statistics.total_domains, 2);
    assert_eq!(document.statistics.total_assets, 3);
    assert_eq!(
        document.domains[1].owning_community_name.as_deref(),
        Some("Org Sales")
    );
}

#[tokio::test]
async fn given_bulk_with_rest_method_when_exporting_then_config_error() {
    init_test_setup();
    let stub = Arc::new(catalog());
    let options = ExportOptions {
        bulk: true,
        method: ExportMethod::Rest,
        ..Default::default()
    };

    let result = service(&stub).export(&org_target(), &options).await;

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[tokio::test]
async fn given_same_domain_name_in_two_communities_when_grouping_then_key_decides_folding() {
    init_test_setup();
    let shared_org = domain("d1", "Shared", &org());
    let shared_sales = domain("d2", "Shared", &org_sales());
    let build = || {
        StubCatalog::new()
            .with_community(org())
            .with_community(org_sales())
            .with_domain(shared_org.clone())
            .with_domain(shared_sales.clone())
            .with_asset(raw_asset("a1", "One", &shared_org))
            .with_asset(raw_asset("a2", "Two", &shared_sales))
    };

    let by_id = Arc::new(build());
    let document = service(&by_id)
        .export(&org_target(), &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(document.statistics.total_domains, 2);

    let by_name = Arc::new(build());
    let options = ExportOptions {
        grouping: DomainGrouping::Name,
        ..Default::default()
    };
    let document = service(&by_name).export(&org_target(), &options).await.unwrap();
    assert_eq!(document.statistics.total_domains, 1);
    assert_eq!(document.domains[0].id, "d1");
    assert_eq!(document.domains[0].assets.len(), 2);
}

#[tokio::test]
async fn given_catalog_when_listing_communities_then_all_returned_in_order() {
    init_test_setup();
    let stub = Arc::new(catalog());

    let communities = service(&stub)
        .list_communities(NonZeroUsize::new(2).unwrap())
        .await
        .unwrap();

    let names: Vec<&str> = communities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Org", "Org Sales", "Elsewhere"]);
    assert_eq!(stub.count("list_nodes community"), 2);
}

// ============================================================
// Export all and structure-only exports
// ============================================================

#[tokio::test]
async fn given_catalog_when_exporting_all_then_one_outcome_per_community() {
    init_test_setup();
    let stub = Arc::new(catalog());

    let outcomes = service(&stub)
        .export_all(&ExportOptions::default())
        .await
        .unwrap();

    let targets: Vec<&str> = outcomes.iter().map(|o| o.target.name()).collect();
    assert_eq!(targets, vec!["Org", "Org Sales", "Elsewhere"]);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    let org = outcomes[0].result.as_ref().unwrap();
    assert_eq!(org.statistics.total_assets, 2);
}

#[tokio::test]
async fn given_failing_community_listing_when_exporting_all_then_error() {
    init_test_setup();
    let stub = Arc::new(catalog().failing_on("list_nodes community"));

    let result = service(&stub).export_all(&ExportOptions::default()).await;

    assert!(matches!(result, Err(ApplicationError::Transport { .. })));
}

#[rstest]
#[case::graph(ExportMethod::Graph, false)]
#[case::rest(ExportMethod::Rest, false)]
#[case::bulk(ExportMethod::Graph, true)]
#[tokio::test]
async fn given_assets_excluded_when_exporting_then_structure_without_asset_calls(
    #[case] method: ExportMethod,
    #[case] bulk: bool,
) {
    init_test_setup();
    let stub = Arc::new(catalog());
    let options = ExportOptions {
        include_assets: false,
        method,
        bulk,
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    assert_eq!(stub.count("query_assets"), 0);
    assert_eq!(stub.count("list_assets"), 0);
    assert_eq!(document.statistics.total_domains, 1);
    assert_eq!(document.statistics.total_assets, 0);
    assert_eq!(document.domains[0].id, "d1");
    assert!(document.domains[0].assets.is_empty());
}

#[tokio::test]
async fn given_assets_excluded_when_exporting_domain_then_empty_group() {
    init_test_setup();
    let stub = Arc::new(catalog());
    let options = ExportOptions {
        include_assets: false,
        ..Default::default()
    };

    let document = service(&stub)
        .export(&ExportTarget::Domain("Customers".to_string()), &options)
        .await
        .unwrap();

    assert_eq!(stub.count("query_assets"), 0);
    assert_eq!(document.domains.len(), 1);
    assert!(document.domains[0].assets.is_empty());
}

// ============================================================
// Domain and asset metadata
// ============================================================

#[tokio::test]
async fn given_domain_with_description_and_type_when_exporting_then_both_in_json() {
    init_test_setup();
    let described = customers()
        .with_description("Customer data")
        .with_type("Data Asset Domain");
    let stub = Arc::new(
        StubCatalog::new()
            .with_community(org())
            .with_domain(described.clone())
            .with_asset(raw_asset("a1", "Customer Master", &described)),
    );

    let document = service(&stub)
        .export(&org_target(), &ExportOptions::default())
        .await
        .unwrap();

    let json = serde_json::to_value(&document).unwrap();
    let group = &json["domains"][0];
    assert_eq!(group["description"], "Customer data");
    assert_eq!(group["type"], "Data Asset Domain");
    assert_eq!(group["community"], "Org");
}

#[tokio::test]
async fn given_bulk_export_when_serialized_then_each_asset_names_domain_and_community() {
    init_test_setup();
    let leads = domain("d2", "Leads", &org_sales()).with_type("Glossary");
    let stub = Arc::new(
        catalog()
            .with_domain(leads.clone())
            .with_asset(raw_asset("a3", "Lead List", &leads)),
    );
    let options = ExportOptions {
        bulk: true,
        ..Default::default()
    };

    let document = service(&stub).export(&org_target(), &options).await.unwrap();

    let json = serde_json::to_value(&document).unwrap();
    let lead = &json["domains"][1]["assets"][0];
    assert_eq!(lead["domain"], json!({"id": "d2", "name": "Leads", "type": "Glossary"}));
    assert_eq!(lead["community"], json!({"id": "c2", "name": "Org Sales"}));
    assert_eq!(json["domains"][1]["type"], "Glossary");
}
