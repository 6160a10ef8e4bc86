// ==========================================
// 诊所预约排队系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 单医生串行队列的重算引擎 (确定性排队)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 队列构建与重算
pub mod engine;

// 配置层 - 队列策略
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 变更网关与查询接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AppointmentStatus, RescheduleAction};

// 领域实体
pub use domain::{ActionLog, ActionType, Appointment};

// 引擎
pub use engine::{DayLockRegistry, QueueBuilder, QueueSlot, RecalcEngine};

// 配置
pub use config::{ConfigManager, QueuePolicy};

// API
pub use api::{AppointmentApi, DashboardApi, QueueApi, QueueEntryView};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "诊所预约排队系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
