// ==========================================
// 诊所预约排队系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 说明: 核心以库形式嵌入请求路由层, 本入口仅完成
//       日志初始化与状态装配自检
// ==========================================

use clinic_queue::app::{get_default_db_path, AppState};
use clinic_queue::logging;

fn main() {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", clinic_queue::APP_NAME);
    tracing::info!("系统版本: {}", clinic_queue::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 装配AppState
    tracing::info!("正在初始化AppState...");
    match AppState::new(db_path) {
        Ok(state) => {
            tracing::info!("AppState初始化成功: {}", state.get_db_path());
            tracing::info!("库模式使用方式:");
            tracing::info!("  use clinic_queue::app::AppState;");
            tracing::info!("  state.queue_api.recalculate(doctor_id, day, change)");
            tracing::info!("  state.queue_api.insert_emergency(doctor_id, day)");
        }
        Err(e) => {
            tracing::error!("AppState初始化失败: {}", e);
            std::process::exit(1);
        }
    }
}
