//! Integration tests for the lazy tree-delivery surface: paginated root
//! listing, independent detail/children fetches, on-demand expansion, and
//! the create/delete redirect signals.

use archcore::db::{DatabaseService, RecordStore, SqliteStore};
use archcore::models::{Node, NodeUpdate};
use archcore::services::{CreateNodeParams, HierarchyService, ServiceError, TreeDelivery};
use std::sync::Arc;
use tempfile::TempDir;

async fn create_test_delivery() -> (TreeDelivery, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::new(db));
    let delivery = TreeDelivery::new(Arc::new(HierarchyService::new(store)));

    (delivery, temp_dir)
}

fn params(title: &str, parent_id: Option<String>) -> CreateNodeParams {
    CreateNodeParams {
        title: title.to_string(),
        parent_id,
        ..Default::default()
    }
}

async fn create(delivery: &TreeDelivery, title: &str, parent_id: Option<String>) -> Node {
    delivery
        .create_node(params(title, parent_id))
        .await
        .unwrap()
        .node
}

#[tokio::test]
async fn test_root_listing_page_markers() {
    let (delivery, _temp) = create_test_delivery().await;

    for i in 0..20 {
        create(&delivery, &format!("Root-{}", i), None).await;
    }

    let first = delivery.list_roots(1, 15).await.unwrap();
    assert_eq!(first.nodes.len(), 15);
    assert_eq!(first.page, 1);
    assert_eq!(first.next_page, Some(2));
    assert_eq!(first.prev_page, None);

    let second = delivery.list_roots(2, 15).await.unwrap();
    assert_eq!(second.nodes.len(), 5);
    assert_eq!(second.next_page, None);
    assert_eq!(second.prev_page, Some(1));
}

#[tokio::test]
async fn test_detail_and_children_are_independent_fetches() {
    let (delivery, _temp) = create_test_delivery().await;

    let root = create(&delivery, "Root", None).await;
    let child = create(&delivery, "Child", Some(root.id.clone())).await;

    let detail = delivery.node_detail(&root.id).await.unwrap();
    assert_eq!(detail.title, "Root");

    let children = delivery.node_children(&root.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);

    // Editing the detail leaves the children fetch unchanged
    delivery
        .edit_node(
            &root.id,
            NodeUpdate {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let children = delivery.node_children(&root.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(delivery.node_detail(&root.id).await.unwrap().title, "Renamed");
}

#[tokio::test]
async fn test_children_expand_on_demand_one_level_at_a_time() {
    let (delivery, _temp) = create_test_delivery().await;

    let root = create(&delivery, "Root", None).await;
    let series = create(&delivery, "Series", Some(root.id.clone())).await;
    let boxed = create(&delivery, "Box", Some(series.id.clone())).await;

    // Each fetch returns exactly one level; the client recurses as it expands
    let level1 = delivery.node_children(&root.id).await.unwrap();
    assert_eq!(level1.len(), 1);
    assert_eq!(level1[0].id, series.id);

    let level2 = delivery.node_children(&series.id).await.unwrap();
    assert_eq!(level2.len(), 1);
    assert_eq!(level2[0].id, boxed.id);

    assert!(delivery.node_children(&boxed.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expand_node_plain() {
    let (delivery, _temp) = create_test_delivery().await;

    let root = create(&delivery, "Root", None).await;
    let series = create(&delivery, "Series", Some(root.id.clone())).await;

    let view = delivery.expand_node(&series.id, false).await.unwrap();
    assert_eq!(view.node.id, series.id);
    assert!(view.children.is_empty());
}

#[tokio::test]
async fn test_expand_node_full_tree_reroots_at_top_ancestor() {
    let (delivery, _temp) = create_test_delivery().await;

    let root = create(&delivery, "Root", None).await;
    let series = create(&delivery, "Series", Some(root.id.clone())).await;
    let boxed = create(&delivery, "Box", Some(series.id.clone())).await;

    let view = delivery.expand_node(&boxed.id, true).await.unwrap();
    assert_eq!(view.node.id, root.id);
    assert_eq!(view.children.len(), 1);
    assert_eq!(view.children[0].id, series.id);

    // Already at the top: re-rooting is a no-op
    let view = delivery.expand_node(&root.id, true).await.unwrap();
    assert_eq!(view.node.id, root.id);
}

#[tokio::test]
async fn test_create_signals_new_root() {
    let (delivery, _temp) = create_test_delivery().await;

    let created = delivery.create_node(params("Root", None)).await.unwrap();
    assert!(created.is_new_root);

    let child = delivery
        .create_node(params("Child", Some(created.node.id.clone())))
        .await
        .unwrap();
    assert!(!child.is_new_root);
}

#[tokio::test]
async fn test_delete_returns_summary_for_reroot() {
    let (delivery, _temp) = create_test_delivery().await;

    let root = create(&delivery, "Root", None).await;
    let series = create(&delivery, "Series", Some(root.id.clone())).await;
    create(&delivery, "Box", Some(series.id.clone())).await;

    let summary = delivery.delete_node(&series.id).await.unwrap();
    assert_eq!(summary.deleted_count, 2);
    assert_eq!(summary.top_ancestor_id.as_deref(), Some(root.id.as_str()));

    // Deleting the remaining top node leaves nowhere to re-root
    let summary = delivery.delete_node(&root.id).await.unwrap();
    assert_eq!(summary.deleted_count, 1);
    assert_eq!(summary.top_ancestor_id, None);

    assert!(matches!(
        delivery.node_detail(&root.id).await,
        Err(ServiceError::NodeNotFound { .. })
    ));
}

#[tokio::test]
async fn test_listing_serializes_for_the_route_layer() {
    let (delivery, _temp) = create_test_delivery().await;

    let root = create(&delivery, "Root", None).await;
    create(&delivery, "Child", Some(root.id.clone())).await;

    let listing = delivery.list_roots(1, 15).await.unwrap();
    let json = serde_json::to_value(&listing).unwrap();
    assert_eq!(json["page"], 1);
    assert_eq!(json["nextPage"], serde_json::Value::Null);
    assert_eq!(json["nodes"][0]["title"], "Root");
    assert_eq!(json["nodes"][0]["refCode"], root.ref_code);

    let view = delivery.expand_node(&root.id, false).await.unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["node"]["id"], root.id);
    assert_eq!(json["children"][0]["parentId"], root.id);
}

#[tokio::test]
async fn test_listing_reflects_deletes() {
    let (delivery, _temp) = create_test_delivery().await;

    let a = create(&delivery, "A", None).await;
    let b = create(&delivery, "B", None).await;

    delivery.delete_node(&a.id).await.unwrap();

    let listing = delivery.list_roots(1, 15).await.unwrap();
    assert_eq!(listing.nodes.len(), 1);
    assert_eq!(listing.nodes[0].id, b.id);
}
