// ==========================================
// FFE 规格项跟踪系统 - FFE 需求目录仓储
// ==========================================
// 对齐: ffe_requirement 表 + ffe_requirement_child 表
// 红线: 需求由外部维护,本仓储只提供读取与测试/初始化用的写入
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::requirement::Requirement;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence::RequirementCatalog;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct RequirementRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RequirementRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入需求及其子项（INSERT OR REPLACE,子项整体覆盖）
    pub fn upsert(&self, requirement: &Requirement) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT OR REPLACE INTO ffe_requirement
               (requirement_id, project_id, room_id, section_id, name)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                requirement.requirement_id,
                requirement.project_id,
                requirement.room_id,
                requirement.section_id,
                requirement.name,
            ],
        )?;
        tx.execute(
            "DELETE FROM ffe_requirement_child WHERE requirement_id = ?1",
            params![requirement.requirement_id],
        )?;
        for (seq, child) in requirement.child_items.iter().enumerate() {
            tx.execute(
                "INSERT INTO ffe_requirement_child (requirement_id, seq, name) VALUES (?1, ?2, ?3)",
                params![requirement.requirement_id, seq as i64, child],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 查询项目下的需求（可按房间过滤）
    pub fn list_by_project(
        &self,
        project_id: &str,
        room_id: Option<&str>,
    ) -> RepositoryResult<Vec<Requirement>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT requirement_id, project_id, room_id, section_id, name
            FROM ffe_requirement
            WHERE project_id = ?1 AND (?2 IS NULL OR room_id = ?2)
            ORDER BY created_at, requirement_id
            "#,
        )?;
        let mut requirements = stmt
            .query_map(params![project_id, room_id], map_requirement)?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut child_stmt = conn.prepare(
            r#"
            SELECT c.requirement_id, c.name
            FROM ffe_requirement_child c
            JOIN ffe_requirement r ON r.requirement_id = c.requirement_id
            WHERE r.project_id = ?1
            ORDER BY c.requirement_id, c.seq
            "#,
        )?;
        let children = child_stmt
            .query_map(params![project_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut by_requirement: HashMap<String, Vec<String>> = HashMap::new();
        for (requirement_id, name) in children {
            by_requirement.entry(requirement_id).or_default().push(name);
        }
        for requirement in &mut requirements {
            requirement.child_items = by_requirement
                .remove(&requirement.requirement_id)
                .unwrap_or_default();
        }

        Ok(requirements)
    }

    /// 按ID查询需求
    pub fn find_by_id(&self, requirement_id: &str) -> RepositoryResult<Option<Requirement>> {
        let conn = self.get_conn()?;

        let requirement = conn
            .query_row(
                r#"SELECT requirement_id, project_id, room_id, section_id, name
                   FROM ffe_requirement WHERE requirement_id = ?1"#,
                params![requirement_id],
                map_requirement,
            )
            .optional()?;

        let Some(mut requirement) = requirement else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT name FROM ffe_requirement_child WHERE requirement_id = ?1 ORDER BY seq",
        )?;
        requirement.child_items = stmt
            .query_map(params![requirement_id], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(Some(requirement))
    }
}

fn map_requirement(row: &rusqlite::Row) -> SqliteResult<Requirement> {
    Ok(Requirement {
        requirement_id: row.get(0)?,
        project_id: row.get(1)?,
        room_id: row.get(2)?,
        section_id: row.get(3)?,
        name: row.get(4)?,
        child_items: Vec::new(),
    })
}

#[async_trait]
impl RequirementCatalog for RequirementRepository {
    async fn list_requirements(
        &self,
        project_id: &str,
        room_id: Option<&str>,
    ) -> RepositoryResult<Vec<Requirement>> {
        self.list_by_project(project_id, room_id)
    }

    async fn find_requirement(&self, requirement_id: &str) -> RepositoryResult<Option<Requirement>> {
        self.find_by_id(requirement_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> RequirementRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        RequirementRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn requirement(id: &str, room: &str, children: &[&str]) -> Requirement {
        Requirement {
            requirement_id: id.to_string(),
            project_id: "P1".to_string(),
            room_id: Some(room.to_string()),
            section_id: None,
            name: format!("Requirement {}", id),
            child_items: children.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_upsert_and_find_keeps_child_order() {
        let repo = setup();
        repo.upsert(&requirement("R1", "LIVING", &["Sofa", "Armchair", "Ottoman"]))
            .unwrap();

        let found = repo.find_by_id("R1").unwrap().unwrap();
        assert_eq!(found.child_items, vec!["Sofa", "Armchair", "Ottoman"]);

        repo.upsert(&requirement("R1", "LIVING", &["Sectional"])).unwrap();
        let found = repo.find_by_id("R1").unwrap().unwrap();
        assert_eq!(found.child_items, vec!["Sectional"]);

        assert!(repo.find_by_id("R404").unwrap().is_none());
    }

    #[test]
    fn test_list_by_project_filters_room() {
        let repo = setup();
        repo.upsert(&requirement("R1", "LIVING", &["Sofa"])).unwrap();
        repo.upsert(&requirement("R2", "BED", &[])).unwrap();

        assert_eq!(repo.list_by_project("P1", None).unwrap().len(), 2);

        let living = repo.list_by_project("P1", Some("LIVING")).unwrap();
        assert_eq!(living.len(), 1);
        assert_eq!(living[0].child_items, vec!["Sofa"]);

        assert!(repo.list_by_project("P2", None).unwrap().is_empty());
    }
}
