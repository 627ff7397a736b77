use super::core::patch_columns;
use super::SpecItemRepository;
use crate::domain::patch::SpecItemPatch;
use crate::domain::spec_item::{ItemAnnotation, PricedComponent, RequirementLink, SpecItem};
use crate::domain::types::SpecStatus;
use crate::repository::error::RepositoryError;
use crate::repository::persistence::GroupingWrite;
use chrono::Utc;
use rusqlite::{params, Connection};
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

fn link(requirement_id: &str) -> RequirementLink {
    RequirementLink {
        link_id: uuid::Uuid::new_v4().to_string(),
        requirement_id: requirement_id.to_string(),
        created_at: Utc::now(),
    }
}

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_item(name: &str) -> SpecItem {
    let mut item = SpecItem::new("P1", name);
    item.sku = Some("SKU-1".to_string());
    item.quantity = dec!(2);
    item.trade_price = Some(dec!(100.50));
    item.rrp_currency = Some("USD".to_string());
    item.components = vec![PricedComponent {
        name: "Cushion".to_string(),
        price: dec!(12.25),
        quantity: dec!(4),
    }];
    item.annotations = vec![ItemAnnotation::Flagged {
        color: "red".to_string(),
        note: Some("check fabric".to_string()),
    }];
    item
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = SpecItemRepository::from_connection(setup_test_db());

    let mut item = make_item("Sofa");
    item.links.push(RequirementLink {
        link_id: "L1".to_string(),
        requirement_id: "R1".to_string(),
        created_at: Utc::now(),
    });
    repo.insert(&item).unwrap();

    let found = repo.find_by_id(&item.id).unwrap().unwrap();
    assert_eq!(found, item);

    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_legacy_status_normalized_on_read_without_rewrite() {
    let conn = setup_test_db();
    let repo = SpecItemRepository::from_connection(conn.clone());

    let item = make_item("Lamp");
    repo.insert(&item).unwrap();
    conn.lock()
        .unwrap()
        .execute("UPDATE spec_item SET status = 'QUOTING' WHERE item_id = ?1", params![item.id])
        .unwrap();

    let found = repo.find_by_id(&item.id).unwrap().unwrap();
    assert_eq!(found.status, SpecStatus::RfqSent);

    let raw: String = conn
        .lock()
        .unwrap()
        .query_row("SELECT status FROM spec_item WHERE item_id = ?1", params![item.id], |row| row.get(0))
        .unwrap();
    assert_eq!(raw, "QUOTING");
}

#[test]
fn test_unknown_status_is_field_value_error() {
    let conn = setup_test_db();
    let repo = SpecItemRepository::from_connection(conn.clone());

    let item = make_item("Rug");
    repo.insert(&item).unwrap();
    conn.lock()
        .unwrap()
        .execute("UPDATE spec_item SET status = 'LOST_IN_TRANSIT' WHERE item_id = ?1", params![item.id])
        .unwrap();

    let err = repo.find_by_id(&item.id).unwrap_err();
    assert!(matches!(err, RepositoryError::FieldValueError { ref field, .. } if field == "status"));
}

#[test]
fn test_update_fields_bumps_version_and_checks_it() {
    let repo = SpecItemRepository::from_connection(setup_test_db());
    let item = make_item("Chair");
    repo.insert(&item).unwrap();

    let patch = SpecItemPatch {
        client_approved: Some(false),
        status: Some(SpecStatus::QuoteApproved),
        rrp: Some(Some(dec!(150.00))),
        ..Default::default()
    };
    let new_version = repo.update_fields(&item.id, item.version, &patch).unwrap();
    assert_eq!(new_version, item.version + 1);

    let found = repo.find_by_id(&item.id).unwrap().unwrap();
    assert_eq!(found.status, SpecStatus::QuoteApproved);
    assert_eq!(found.rrp, Some(dec!(150.00)));
    assert_eq!(found.version, new_version);

    // 旧版本号再次提交 → 乐观锁冲突
    let err = repo.update_fields(&item.id, item.version, &patch).unwrap_err();
    match err {
        RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
            assert_eq!(expected, item.version);
            assert_eq!(actual, new_version);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = repo.update_fields("missing", 1, &patch).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_archive_clears_links_in_one_commit() {
    let repo = SpecItemRepository::from_connection(setup_test_db());
    let mut item = make_item("Table");
    item.ffe_requirement_id = Some("R0".to_string());
    repo.insert(&item).unwrap();

    let v2 = repo.add_link(&item.id, item.version, &link("R1"), None).unwrap();
    let v3 = repo.add_link(&item.id, v2, &link("R2"), None).unwrap();

    let v4 = repo.archive(&item.id, v3).unwrap();
    let found = repo.find_by_id(&item.id).unwrap().unwrap();
    assert_eq!(found.status, SpecStatus::Archived);
    assert!(found.links.is_empty());
    assert_eq!(found.ffe_requirement_id, None);
    assert_eq!(found.version, v4);
}

#[test]
fn test_add_link_with_restore_status() {
    let repo = SpecItemRepository::from_connection(setup_test_db());
    let mut item = make_item("Mirror");
    item.status = SpecStatus::Archived;
    repo.insert(&item).unwrap();

    let restored_link = link("R9");
    let version = repo
        .add_link(&item.id, item.version, &restored_link, Some(SpecStatus::Selected))
        .unwrap();
    let found = repo.find_by_id(&item.id).unwrap().unwrap();
    assert_eq!(found.status, SpecStatus::Selected);
    assert_eq!(found.links, vec![restored_link]);
    assert_eq!(found.version, version);
}

#[test]
fn test_add_link_stale_version_writes_nothing() {
    let repo = SpecItemRepository::from_connection(setup_test_db());
    let item = make_item("Stool");
    repo.insert(&item).unwrap();

    let err = repo.add_link(&item.id, item.version + 5, &link("R1"), None).unwrap_err();
    assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));

    let found = repo.find_by_id(&item.id).unwrap().unwrap();
    assert!(found.links.is_empty());
}

#[test]
fn test_update_groupings_is_atomic() {
    let repo = SpecItemRepository::from_connection(setup_test_db());
    let parent = make_item("Dining Set");
    let child = make_item("Dining Chair");
    repo.insert(&parent).unwrap();
    repo.insert(&child).unwrap();

    let writes = vec![
        GroupingWrite {
            item_id: parent.id.clone(),
            expected_version: parent.version,
            annotations: vec![ItemAnnotation::GroupParent {
                child_names: vec!["Dining Chair".to_string()],
            }],
        },
        GroupingWrite {
            item_id: child.id.clone(),
            expected_version: child.version + 1,
            annotations: vec![ItemAnnotation::GroupChild {
                parent_id: parent.id.clone(),
                parent_name: "Dining Set".to_string(),
            }],
        },
    ];
    assert!(repo.update_groupings(&writes).is_err());

    let found_parent = repo.find_by_id(&parent.id).unwrap().unwrap();
    assert_eq!(found_parent.annotations, parent.annotations);
    assert_eq!(found_parent.version, parent.version);
}

#[test]
fn test_list_by_project_orders_by_sort_order() {
    let repo = SpecItemRepository::from_connection(setup_test_db());
    let a = make_item("A");
    let b = make_item("B");
    let mut other = make_item("Other");
    other.project_id = "P2".to_string();
    repo.insert(&a).unwrap();
    repo.insert(&b).unwrap();
    repo.insert(&other).unwrap();
    repo.add_link(&b.id, b.version, &link("R1"), None).unwrap();

    let updated = repo
        .update_sort_orders("P1", &[b.id.clone(), a.id.clone()])
        .unwrap();
    assert_eq!(updated, 2);

    let items = repo.list_by_project("P1").unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);
    assert_eq!(items[0].links.len(), 1);
    assert!(items[1].links.is_empty());
    // 排序不改变版本号
    assert_eq!(items[1].version, a.version);
}

#[test]
fn test_delete_cascades_links() {
    let conn = setup_test_db();
    let repo = SpecItemRepository::from_connection(conn.clone());
    let item = make_item("Bed");
    repo.insert(&item).unwrap();
    repo.add_link(&item.id, item.version, &link("R1"), None).unwrap();

    repo.delete(&item.id).unwrap();
    let links: i64 = conn
        .lock()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM spec_item_link", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 0);

    assert!(matches!(repo.delete(&item.id), Err(RepositoryError::NotFound { .. })));
}

#[test]
fn test_patch_columns_follow_changed_fields() {
    let patch = SpecItemPatch {
        name: Some("Sofa".to_string()),
        rrp: Some(None),
        components: Some(vec![]),
        client_approved: Some(true),
        annotations: Some(vec![]),
        sort_order: Some(3),
        ..Default::default()
    };
    let columns: Vec<&str> = patch_columns(&patch).unwrap().into_iter().map(|(c, _)| c).collect();
    assert_eq!(columns, patch.changed_fields());
}
