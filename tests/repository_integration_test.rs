// ==========================================
// Repository 与配置集成测试
// ==========================================
// 职责: 验证 SQLite 实现的目录接口、配置读取与建表
// ==========================================


#[cfg(test)]
mod repository_integration_test {
    use std::collections::BTreeSet;

    use ffe_spec_tracker::config::{config_keys, WorkflowConfigReader, WorkflowSettings};
    use ffe_spec_tracker::domain::SpecStatus;
    use ffe_spec_tracker::repository::{RequirementCatalog, SupplierDirectory};

    use crate::test_helpers::{create_test_db, create_test_state, requirement};

    #[test]
    fn test_schema_version_recorded_once() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = ffe_spec_tracker::db::open_sqlite_connection(&db_path).unwrap();
        ffe_spec_tracker::db::init_schema(&conn).unwrap();

        assert_eq!(
            ffe_spec_tracker::db::read_schema_version(&conn).unwrap(),
            Some(ffe_spec_tracker::db::CURRENT_SCHEMA_VERSION)
        );
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_requirement_catalog_filters_by_room() {
        let (_tmp, state) = create_test_state();
        let catalog: &dyn RequirementCatalog = state.requirement_repo.as_ref();

        let all = catalog.list_requirements("P1", None).await.unwrap();
        assert_eq!(all.len(), 3);

        let living = catalog.list_requirements("P1", Some("LIVING")).await.unwrap();
        let ids: BTreeSet<String> = living.iter().map(|r| r.requirement_id.clone()).collect();
        assert_eq!(
            ids,
            BTreeSet::from(["REQ_SOFA".to_string(), "REQ_TABLE".to_string()])
        );

        let sofa = catalog.find_requirement("REQ_SOFA").await.unwrap().unwrap();
        assert_eq!(sofa.child_items, vec!["三人位".to_string(), "脚凳".to_string()]);
        assert!(catalog.find_requirement("REQ_NONE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requirement_upsert_replaces_children() {
        let (_tmp, state) = create_test_state();
        state
            .requirement_repo
            .upsert(&requirement("REQ_SOFA", "P1", Some("LIVING"), "客厅沙发", &["转角位"]))
            .unwrap();

        let sofa = state.requirement_repo.find_by_id("REQ_SOFA").unwrap().unwrap();
        assert_eq!(sofa.child_items, vec!["转角位".to_string()]);
    }

    #[tokio::test]
    async fn test_supplier_directory_uppercases_currency() {
        let (_tmp, state) = create_test_state();
        let directory: &dyn SupplierDirectory = state.supplier_repo.as_ref();

        let usd = directory.find_supplier("SUP_USD").await.unwrap().unwrap();
        assert_eq!(usd.currency, "USD");
        assert_eq!(directory.list_suppliers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_workflow_settings_defaults_and_overrides() {
        let (_tmp, state) = create_test_state();

        let settings = state.load_settings().await.unwrap();
        assert_eq!(settings, WorkflowSettings::default());

        state
            .config_manager
            .set_global_config_value(config_keys::RESOLVED_STATUSES, r#"["CLOSED","CLIENT_TO_ORDER"]"#)
            .unwrap();
        state
            .config_manager
            .set_global_config_value(config_keys::PRIMARY_CURRENCY, " usd ")
            .unwrap();

        let settings = state.load_settings().await.unwrap();
        assert!(settings.is_resolved(SpecStatus::Closed));
        assert!(!settings.is_resolved(SpecStatus::ContractorToOrder));
        assert_eq!(settings.primary_currency, "USD");
        assert_eq!(settings.default_currency, "CAD");
    }

    #[tokio::test]
    async fn test_invalid_resolved_statuses_config_is_an_error() {
        let (_tmp, state) = create_test_state();
        state
            .config_manager
            .set_global_config_value(config_keys::RESOLVED_STATUSES, r#"["NOT_A_STATUS"]"#)
            .unwrap();

        assert!(state.config_manager.get_resolved_statuses().await.is_err());
        assert!(state.load_settings().await.is_err());
    }
}
