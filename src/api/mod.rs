// ==========================================
// 值班排班系统 - API 层
// ==========================================
// 职责: 对外操作入口 (权限判定、输入校验、审计、错误转换)
// 传输层 (HTTP/CLI) 不在本 crate 范围内
// ==========================================

pub mod error;
pub mod report_api;
pub mod schedule_api;
pub mod staff_api;
pub mod swap_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult, ErrorKind};
pub use report_api::{ReportApi, ReportDetail};
pub use schedule_api::ScheduleApi;
pub use staff_api::StaffApi;
pub use swap_api::SwapApi;
