// ==========================================
// 值班排班系统 - 引擎层错误类型
// ==========================================
// 分类:
// - 约束违反: ScheduleLocked / CrossBranchAssignment / InactiveStaff /
//             IneligibleFor* / DuplicateAssignment / NotOwner
// - 状态错误: InvalidState / ItemLocked
// - 其他: NotFound / Validation / 仓储错误
// 约束违反与状态错误属于正常业务分支, 不按系统错误记录
// ==========================================

use crate::domain::swap::SwapTransitionRejected;
use crate::domain::types::ShiftType;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    // ===== 约束违反 =====
    #[error("排班表已发布, 不可修改: schedule_id={schedule_id}")]
    ScheduleLocked { schedule_id: String },

    #[error("跨网点排班: staff_id={staff_id} 不属于网点 {branch_id}")]
    CrossBranchAssignment { staff_id: String, branch_id: String },

    #[error("人员已停用: staff_id={staff_id}")]
    InactiveStaff { staff_id: String },

    #[error("人员不具备夜班资格: staff_id={staff_id}, shift_type={shift_type}")]
    IneligibleForNightShift { staff_id: String, shift_type: ShiftType },

    #[error("人员不具备周末白班资格: staff_id={staff_id}, shift_type={shift_type}")]
    IneligibleForWeekendDay { staff_id: String, shift_type: ShiftType },

    #[error("重复排班: staff_id={staff_id}, date={date}, 已有班次={existing}")]
    DuplicateAssignment {
        staff_id: String,
        date: NaiveDate,
        existing: ShiftType,
    },

    #[error("非排班持有人: staff_id={staff_id}, assignment_id={assignment_id}")]
    NotOwner { staff_id: String, assignment_id: String },

    // ===== 状态错误 =====
    #[error("无效的状态转换: from={from} event={event}")]
    InvalidState { from: String, event: String },

    #[error("清单项未解锁: item_id={item_id}, {message}")]
    ItemLocked { item_id: String, message: String },

    // ===== 其他 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据验证失败: {0}")]
    Validation(String),

    #[error("并发冲突重试 {attempts} 次后仍失败: {last}")]
    ConcurrencyExhausted { attempts: u32, last: String },

    #[error(transparent)]
    Repository(RepositoryError),
}

impl RosterError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RosterError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 是否为业务规则拒绝 (约束违反/状态错误)
    ///
    /// 业务拒绝按 info 级别记录, 不按系统错误记录
    pub fn is_business_rejection(&self) -> bool {
        !matches!(
            self,
            RosterError::Repository(_) | RosterError::ConcurrencyExhausted { .. }
        )
    }

    /// 是否为可重试的并发冲突
    pub fn is_retryable(&self) -> bool {
        matches!(self, RosterError::Repository(e) if e.is_concurrency_conflict())
    }
}

// 事务内复核发现的业务状态, 提升为对应的业务错误
impl From<RepositoryError> for RosterError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ScheduleLocked { schedule_id } => {
                RosterError::ScheduleLocked { schedule_id }
            }
            RepositoryError::NotFound { entity, id } => RosterError::NotFound { entity, id },
            other => RosterError::Repository(other),
        }
    }
}

impl From<SwapTransitionRejected> for RosterError {
    fn from(err: SwapTransitionRejected) -> Self {
        RosterError::InvalidState {
            from: err.from.to_string(),
            event: err.event.to_string(),
        }
    }
}
