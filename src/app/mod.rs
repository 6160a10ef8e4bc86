// ==========================================
// 诊所预约排队系统 - 应用层
// ==========================================
// 职责: 状态装配, 供嵌入方(请求路由层)使用
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
