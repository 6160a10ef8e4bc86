// ==========================================
// 诊所预约排队系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::queue_policy::{
    QueuePolicy, KEY_DAY_LOCK_WAIT_MS, KEY_DEFAULT_DURATION_MIN, KEY_EMERGENCY_DURATION_MIN,
    KEY_INCLUDE_IN_PROGRESS,
};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆写）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT (scope_id, key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                other => Err(format!("配置项 {} 的值非法: {}", key, other).into()),
            },
            None => Ok(default),
        }
    }

    fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("配置项 {} 的值非法: {}", key, e).into()),
            None => Ok(default),
        }
    }

    /// 读取队列策略（缺失项落默认值）
    pub fn queue_policy(&self) -> Result<QueuePolicy, Box<dyn Error>> {
        let defaults = QueuePolicy::default();

        Ok(QueuePolicy {
            include_in_progress: self
                .get_bool_or(KEY_INCLUDE_IN_PROGRESS, defaults.include_in_progress)?,
            default_duration_min: self
                .get_i64_or(KEY_DEFAULT_DURATION_MIN, defaults.default_duration_min)?,
            emergency_duration_min: self
                .get_i64_or(KEY_EMERGENCY_DURATION_MIN, defaults.emergency_duration_min)?,
            day_lock_wait_ms: self
                .get_i64_or(KEY_DAY_LOCK_WAIT_MS, defaults.day_lock_wait_ms as i64)?
                .max(0) as u64,
        })
    }
}
