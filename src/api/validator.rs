// ==========================================
// 值班排班系统 - 输入校验与权限判定
// ==========================================
// 职责: API 入口处的格式校验与角色/网点权限判定
// 业务规则 (资格/锁定/重复) 由引擎层负责, 此处不重复
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::actor::Actor;

/// 排班年份允许范围
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// 文本字段长度上限
pub const MAX_TEXT_LEN: usize = 2000;

// ==========================================
// 输入校验
// ==========================================

/// 必填字段 (去除空白后不能为空)
pub fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{}不能为空", field)));
    }
    Ok(())
}

pub fn validate_max_len(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::ValidationError(format!(
            "{}长度超过上限{}",
            field, max
        )));
    }
    Ok(())
}

/// 可选文本字段: 存在时校验长度
pub fn validate_opt_text(field: &str, value: Option<&str>) -> ApiResult<()> {
    match value {
        Some(v) => validate_max_len(field, v, MAX_TEXT_LEN),
        None => Ok(()),
    }
}

pub fn validate_year_month(year: i32, month: u32) -> ApiResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ApiError::ValidationError(format!(
            "年份超出范围 [{}, {}]: {}",
            MIN_YEAR, MAX_YEAR, year
        )));
    }
    if !(1..=12).contains(&month) {
        return Err(ApiError::ValidationError(format!("月份必须为1-12: {}", month)));
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, value: i32) -> ApiResult<()> {
    if value < 0 {
        return Err(ApiError::ValidationError(format!("{}不能为负数: {}", field, value)));
    }
    Ok(())
}

// ==========================================
// 权限判定
// ==========================================

/// 网点管理权限 (ADMIN 或本网点 MANAGER)
pub fn require_branch_manager(actor: &Actor, branch_id: &str, operation: &str) -> ApiResult<()> {
    if actor.can_manage_branch(branch_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(&actor.actor_id, operation))
    }
}

/// 管理角色 (不限网点的全局数据, 如清单模板)
pub fn require_manager_role(actor: &Actor, operation: &str) -> ApiResult<()> {
    if actor.is_manager_or_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden(&actor.actor_id, operation))
    }
}

pub fn require_admin(actor: &Actor, operation: &str) -> ApiResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden(&actor.actor_id, operation))
    }
}

/// 本人或网点管理者
pub fn require_self_or_manager(
    actor: &Actor,
    staff_id: &str,
    branch_id: &str,
    operation: &str,
) -> ApiResult<()> {
    if actor.is_self_or_manager_of(staff_id, branch_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(&actor.actor_id, operation))
    }
}

/// 网点成员 (查看排班表等只读操作)
pub fn require_branch_member(actor: &Actor, branch_id: &str, operation: &str) -> ApiResult<()> {
    if actor.can_manage_branch(branch_id) || actor.branch_id.as_deref() == Some(branch_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(&actor.actor_id, operation))
    }
}
