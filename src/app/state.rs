// ==========================================
// FFE 规格项跟踪系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享资源,按项目打开编辑会话
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ApiError, ApiResult, SpecItemApi, SpecItemBackends};
use crate::config::{ConfigManager, WorkflowSettings};
use crate::repository::{
    ActionLogRepository, RequirementRepository, SpecItemRepository, SupplierRepository,
};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "FFE_SPEC_TRACKER_DB_PATH";

/// 应用状态
///
/// 所有仓储共享同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub spec_item_repo: Arc<SpecItemRepository>,

    pub requirement_repo: Arc<RequirementRepository>,

    pub supplier_repo: Arc<SupplierRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,

    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并应用统一 PRAGMA
    /// 2. 建表（幂等）
    /// 3. 初始化所有Repository
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 从已初始化的连接创建（测试用内存库也走这里）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        Ok(Self {
            db_path,
            spec_item_repo: Arc::new(SpecItemRepository::from_connection(conn.clone())),
            requirement_repo: Arc::new(RequirementRepository::from_connection(conn.clone())),
            supplier_repo: Arc::new(SupplierRepository::from_connection(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::from_connection(conn)),
            config_manager,
        })
    }

    /// 会话依赖的外部接口（均为 SQLite 实现）
    pub fn backends(&self) -> SpecItemBackends {
        SpecItemBackends {
            persistence: self.spec_item_repo.clone(),
            requirements: self.requirement_repo.clone(),
            suppliers: self.supplier_repo.clone(),
            action_log: Some(self.action_log_repo.clone()),
        }
    }

    /// 读取当前流程配置
    pub async fn load_settings(&self) -> ApiResult<WorkflowSettings> {
        WorkflowSettings::load(self.config_manager.as_ref())
            .await
            .map_err(|e| ApiError::Config(e.to_string()))
    }

    /// 打开项目编辑会话
    pub async fn open_project(&self, project_id: &str, actor: &str) -> ApiResult<SpecItemApi> {
        let settings = self.load_settings().await?;
        SpecItemApi::open(project_id, actor, self.backends(), settings).await
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./ffe_spec_tracker.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("ffe-spec-tracker-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("ffe-spec-tracker");
        }

        // best-effort: 目录创建失败时由打开数据库报错
        std::fs::create_dir_all(&path).ok();
        path = path.join("ffe_spec_tracker.db");
    }

    path.to_string_lossy().to_string()
}
