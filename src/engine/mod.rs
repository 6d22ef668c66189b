// ==========================================
// 值班排班系统 - 引擎层
// ==========================================
// 职责: 实现业务规则, 不拼 SQL
// 红线: Engine 不拼 SQL, 所有拒绝必须给出原因
// ==========================================

pub mod audit;
pub mod checklist;
pub mod eligibility_core;
pub mod error;
pub mod events;
pub mod mutation;
pub mod report_stats;
pub mod roster_validator;
pub mod swap;
pub mod time_lock;

// 重导出核心引擎
pub use audit::{AuditRecorder, AuditSink};
pub use checklist::{ChecklistEngine, ChecklistOutcome};
pub use eligibility_core::EligibilityCore;
pub use error::RosterError;
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, ShiftEvent, ShiftEventPublisher, ShiftEventType,
};
pub use mutation::{AssignmentMutationEngine, NewSlot};
pub use report_stats::{compute_stats, derive_status, ShiftReportAggregator};
pub use roster_validator::{
    FindingSeverity, RosterValidationReport, RosterValidator, RuleCode, ValidationFinding,
};
pub use swap::{SwapApplyOutcome, SwapDraft, SwapNegotiationEngine};
pub use time_lock::{is_unlocked, parse_unlock_time, Clock, FixedClock, LockState, SystemClock, TimeLockPolicy};
