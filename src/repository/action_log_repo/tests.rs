use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

#[test]
fn test_insert_and_find_by_item_id() {
    let repo = ActionLogRepository::from_connection(setup_test_db());

    let log = ActionLog::new(
        "P1",
        Some("item-1"),
        ActionType::SetStatus,
        "designer",
        Some(json!({"from": "SELECTED", "to": "RFQ_SENT"})),
    );
    let id = repo.insert(&log).unwrap();
    assert_eq!(id, log.action_id);

    let found = repo.find_by_item_id("item-1").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].action_type, ActionType::SetStatus);
    assert_eq!(found[0].actor, "designer");
    assert_eq!(found[0].payload_json, Some(json!({"from": "SELECTED", "to": "RFQ_SENT"})));
}

#[test]
fn test_find_recent_and_count() {
    let repo = ActionLogRepository::from_connection(setup_test_db());

    repo.insert(&ActionLog::new("P1", None, ActionType::Reorder, "designer", None))
        .unwrap();
    repo.insert(&ActionLog::new("P1", Some("a"), ActionType::Archive, "designer", None))
        .unwrap();
    repo.insert(&ActionLog::new("P1", Some("b"), ActionType::Archive, "designer", None))
        .unwrap();
    repo.insert(&ActionLog::new("P2", Some("c"), ActionType::Archive, "designer", None))
        .unwrap();

    assert_eq!(repo.find_recent("P1", 10).unwrap().len(), 3);
    assert_eq!(repo.find_recent("P1", 2).unwrap().len(), 2);
    assert_eq!(repo.count_by_action_type("P1", ActionType::Archive).unwrap(), 2);
    assert_eq!(repo.count_by_action_type("P2", ActionType::Reorder).unwrap(), 0);
}
