// ==========================================
// 诊所预约排队系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AppointmentApi, DashboardApi, QueueApi};
use crate::config::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::engine::DayLockRegistry;
use crate::repository::{ActionLogRepository, AppointmentRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源, 作为嵌入方(请求路由层)的装配面
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 变更网关
    pub queue_api: Arc<QueueApi>,

    /// 预约管理API
    pub appointment_api: Arc<AppointmentApi>,

    /// 看板查询API
    pub dashboard_api: Arc<DashboardApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪查询）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并应用统一 PRAGMA
    /// 2. 建表（幂等）并核对 schema_version
    /// 3. 初始化 Repository / ConfigManager / 互斥锁登记表
    /// 4. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        match read_schema_version(&conn) {
            Ok(Some(v)) if v != CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    "schema_version 不一致: 期望{}, 实际{}",
                    CURRENT_SCHEMA_VERSION,
                    v
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("读取 schema_version 失败(将继续启动): {}", e),
        }

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let appointment_repo = Arc::new(AppointmentRepository::from_connection(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::from_connection(conn.clone()));

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // (医生,日期) 互斥锁登记表
        let day_locks = Arc::new(DayLockRegistry::new());

        // ==========================================
        // 初始化API层
        // ==========================================
        let queue_api = Arc::new(QueueApi::new(
            conn.clone(),
            config_manager.clone(),
            day_locks,
        ));
        let appointment_api = Arc::new(AppointmentApi::new(conn.clone(), queue_api.clone()));
        let dashboard_api = Arc::new(DashboardApi::new(appointment_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            queue_api,
            appointment_api,
            dashboard_api,
            config_manager,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 开发环境: 用户数据目录/clinic-queue-dev/clinic_queue.db
/// - 生产环境: 用户数据目录/clinic-queue/clinic_queue.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("CLINIC_QUEUE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 默认回退值, 拿到 data_dir 后覆盖
    let mut path = PathBuf::from("./clinic_queue.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("clinic-queue-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("clinic-queue");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("clinic_queue.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    // 注意：AppState::new() 的完整流程在集成测试中覆盖
}
