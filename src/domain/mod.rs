// ==========================================
// 值班排班系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态转换表
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod actor;
pub mod report;
pub mod schedule;
pub mod staff;
pub mod swap;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use actor::{Actor, Role};
pub use report::{
    BackupChecklistItem, BackupTemplate, BatchUpdateResult, ChecklistItem, ChecklistItemError,
    ChecklistTemplate, ChecklistUpdate, ReportStats, ShiftIssue, ShiftReport,
};
pub use schedule::{Assignment, Holiday, OnCallAssignment, Schedule, StaffShiftSummary};
pub use staff::{Branch, EligibilityInput, StaffEligibility};
pub use swap::{transition, SwapEvent, SwapRequest, SwapTransitionRejected};
pub use types::{
    ChecklistStatus, IssueStatus, ReportStatus, ScheduleStatus, ShiftType, SwapStatus, SwapType,
};
