// ==========================================
// 值班排班系统 - API层错误类型
// ==========================================
// 职责: 定义调用方可见的错误类型, 转换引擎/仓储错误
// 分类 (ErrorKind):
// - Validation / NotFound: 原样返回, 不重试
// - Constraint / State: 正常业务分支, 按 info/debug 记录
// - Forbidden: 越权
// - Internal: 对外只报 TransactionFailed, 细节写入 error 日志
// ==========================================

use crate::engine::error::RosterError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与查找
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 约束违反
    // ==========================================
    #[error("排班表已发布, 不可修改: schedule_id={schedule_id}")]
    ScheduleLocked { schedule_id: String },

    #[error("跨网点排班: staff_id={staff_id} 不属于网点 {branch_id}")]
    CrossBranchAssignment { staff_id: String, branch_id: String },

    #[error("人员不具备夜班资格: staff_id={staff_id}, shift_type={shift_type}")]
    IneligibleForNightShift { staff_id: String, shift_type: String },

    #[error("人员不具备周末白班资格: staff_id={staff_id}, shift_type={shift_type}")]
    IneligibleForWeekendDay { staff_id: String, shift_type: String },

    #[error("重复排班: staff_id={staff_id}, date={date}, 已有班次={existing}")]
    DuplicateAssignment {
        staff_id: String,
        date: String,
        existing: String,
    },

    #[error("人员已停用: staff_id={staff_id}")]
    InactiveStaff { staff_id: String },

    #[error("非排班持有人: staff_id={staff_id}, assignment_id={assignment_id}")]
    NotOwner { staff_id: String, assignment_id: String },

    // ==========================================
    // 状态错误
    // ==========================================
    #[error("无效的状态转换: from={from} event={event}")]
    InvalidState { from: String, event: String },

    #[error("清单项未解锁: item_id={item_id}, {message}")]
    ItemLocked { item_id: String, message: String },

    // ==========================================
    // 权限与内部错误
    // ==========================================
    #[error("无权执行该操作: {0}")]
    Forbidden(String),

    #[error("操作未完成, 已回滚")]
    TransactionFailed,
}

// ==========================================
// ErrorKind - 错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Constraint,
    State,
    NotFound,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Constraint => "CONSTRAINT",
            ErrorKind::State => "STATE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::ValidationError(_) => ErrorKind::Validation,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::ScheduleLocked { .. }
            | ApiError::CrossBranchAssignment { .. }
            | ApiError::IneligibleForNightShift { .. }
            | ApiError::IneligibleForWeekendDay { .. }
            | ApiError::DuplicateAssignment { .. }
            | ApiError::InactiveStaff { .. }
            | ApiError::NotOwner { .. } => ErrorKind::Constraint,
            ApiError::InvalidState { .. } | ApiError::ItemLocked { .. } => ErrorKind::State,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::TransactionFailed => ErrorKind::Internal,
        }
    }

    /// 业务规则拒绝 (约束违反/状态错误), 调用方按正常分支处理
    pub fn is_business_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Constraint | ErrorKind::State)
    }

    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{}(id={})不存在", entity, id))
    }

    pub(crate) fn forbidden(actor_id: &str, operation: &str) -> Self {
        ApiError::Forbidden(format!("actor={} operation={}", actor_id, operation))
    }

    /// 内部错误: 细节只进日志
    pub(crate) fn internal(detail: &dyn std::fmt::Display) -> Self {
        error!("事务失败: {}", detail);
        ApiError::TransactionFailed
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            RepositoryError::ScheduleLocked { schedule_id } => {
                ApiError::ScheduleLocked { schedule_id }
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::ValidationError(format!("记录已存在: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("引用的记录不存在: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }
            other => ApiError::internal(&other),
        }
    }
}

// ==========================================
// 从 RosterError 转换
// ==========================================
impl From<RosterError> for ApiError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::ScheduleLocked { schedule_id } => ApiError::ScheduleLocked { schedule_id },
            RosterError::CrossBranchAssignment {
                staff_id,
                branch_id,
            } => ApiError::CrossBranchAssignment {
                staff_id,
                branch_id,
            },
            RosterError::InactiveStaff { staff_id } => ApiError::InactiveStaff { staff_id },
            RosterError::IneligibleForNightShift {
                staff_id,
                shift_type,
            } => ApiError::IneligibleForNightShift {
                staff_id,
                shift_type: shift_type.to_string(),
            },
            RosterError::IneligibleForWeekendDay {
                staff_id,
                shift_type,
            } => ApiError::IneligibleForWeekendDay {
                staff_id,
                shift_type: shift_type.to_string(),
            },
            RosterError::DuplicateAssignment {
                staff_id,
                date,
                existing,
            } => ApiError::DuplicateAssignment {
                staff_id,
                date: date.to_string(),
                existing: existing.to_string(),
            },
            RosterError::NotOwner {
                staff_id,
                assignment_id,
            } => ApiError::NotOwner {
                staff_id,
                assignment_id,
            },
            RosterError::InvalidState { from, event } => ApiError::InvalidState { from, event },
            RosterError::ItemLocked { item_id, message } => ApiError::ItemLocked { item_id, message },
            RosterError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            RosterError::Validation(msg) => ApiError::ValidationError(msg),
            e @ RosterError::ConcurrencyExhausted { .. } => ApiError::internal(&e),
            RosterError::Repository(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 拒绝日志
// ==========================================
// Internal 已在转换时按 error 记录; 业务拒绝按 info, 输入/查找错误按 debug

pub(crate) trait LogRejection<T> {
    fn log_rejection(self, operation: &str, actor_id: &str) -> ApiResult<T>;
}

impl<T> LogRejection<T> for ApiResult<T> {
    fn log_rejection(self, operation: &str, actor_id: &str) -> ApiResult<T> {
        if let Err(e) = &self {
            match e.kind() {
                ErrorKind::Constraint | ErrorKind::State | ErrorKind::Forbidden => {
                    info!(operation, actor = actor_id, kind = e.kind().as_str(), "操作被拒绝: {}", e)
                }
                ErrorKind::Validation | ErrorKind::NotFound => {
                    debug!(operation, actor = actor_id, kind = e.kind().as_str(), "操作被拒绝: {}", e)
                }
                ErrorKind::Internal => {}
            }
        }
        self
    }
}

/// 执行一次 API 操作并按错误分类记录拒绝日志
pub(crate) fn logged<T>(
    operation: &str,
    actor_id: &str,
    f: impl FnOnce() -> ApiResult<T>,
) -> ApiResult<T> {
    f().log_rejection(operation, actor_id)
}
