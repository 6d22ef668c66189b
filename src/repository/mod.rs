// ==========================================
// 值班排班系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 并发: 所有仓储共享同一 Arc<Mutex<Connection>>, 写操作串行
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod report_repo;
pub mod schedule_repo;
pub mod staff_repo;
pub mod swap_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use report_repo::ShiftReportRepository;
pub use schedule_repo::{
    AssignmentRepository, CalendarRepository, RevisionRef, ScheduleRepository, SlotMove,
    SwapFinalize,
};
pub use staff_repo::StaffRepository;
pub use swap_repo::SwapRequestRepository;
