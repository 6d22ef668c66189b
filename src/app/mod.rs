// ==========================================
// 值班排班系统 - 应用层
// ==========================================
// 职责: 装配仓储/引擎/API, 供外部传输层 (HTTP/CLI) 持有
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
