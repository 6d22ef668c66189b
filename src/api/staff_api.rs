// ==========================================
// 值班排班系统 - 人员与网点 API
// ==========================================
// 职责: 网点登记、资格档案维护、配置写入
// 权限: 网点登记仅 ADMIN; 资格档案由本网点 MANAGER/ADMIN 维护
// 红线: 资格档案不删除, 只停用
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult, LogRejection};
use crate::api::validator::{
    require_admin, require_branch_manager, require_non_empty, require_self_or_manager,
    validate_max_len, validate_non_negative,
};
use crate::config::{config_keys, ConfigManager, ConfigScope, RosterConfigReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::actor::Actor;
use crate::domain::staff::{Branch, EligibilityInput, StaffEligibility};
use crate::engine::audit::AuditRecorder;
use crate::repository::staff_repo::StaffRepository;

const DEFAULT_MAX_NIGHT_SHIFTS: i32 = 5;
const DEFAULT_MIN_DAYS_BETWEEN_NIGHTS: i32 = 3;

/// 可通过 API 写入的配置键
const WRITABLE_CONFIG_KEYS: &[&str] = &[
    config_keys::UTC_OFFSET_MINUTES,
    config_keys::NIGHT_ROLLOVER_BEFORE,
    config_keys::REASSIGN_MAX_RETRIES,
    config_keys::DEFAULT_MAX_NIGHT_SHIFTS,
    config_keys::DEFAULT_MIN_DAYS_BETWEEN_NIGHTS,
    config_keys::LOCALE,
];

/// 仅允许全局作用域的配置键
const GLOBAL_ONLY_KEYS: &[&str] = &[
    config_keys::REASSIGN_MAX_RETRIES,
    config_keys::DEFAULT_MAX_NIGHT_SHIFTS,
    config_keys::DEFAULT_MIN_DAYS_BETWEEN_NIGHTS,
    config_keys::LOCALE,
];

// ==========================================
// StaffApi - 人员与网点 API
// ==========================================
pub struct StaffApi {
    staff_repo: Arc<StaffRepository>,
    config_manager: Arc<ConfigManager>,
    audit: AuditRecorder,
}

impl StaffApi {
    pub fn new(
        staff_repo: Arc<StaffRepository>,
        config_manager: Arc<ConfigManager>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            staff_repo,
            config_manager,
            audit,
        }
    }

    // ==========================================
    // 网点
    // ==========================================

    /// 登记网点 (仅 ADMIN)
    pub fn register_branch(
        &self,
        actor: &Actor,
        branch_id: &str,
        name: &str,
        code: &str,
    ) -> ApiResult<Branch> {
        self.register_branch_inner(actor, branch_id, name, code)
            .log_rejection("register_branch", &actor.actor_id)
    }

    fn register_branch_inner(
        &self,
        actor: &Actor,
        branch_id: &str,
        name: &str,
        code: &str,
    ) -> ApiResult<Branch> {
        require_admin(actor, "register_branch")?;
        require_non_empty("branch_id", branch_id)?;
        require_non_empty("name", name)?;
        require_non_empty("code", code)?;
        validate_max_len("name", name, 200)?;

        if self.staff_repo.find_branch(branch_id)?.is_some() {
            return Err(ApiError::ValidationError(format!("网点已存在: {}", branch_id)));
        }

        let branch = Branch {
            branch_id: branch_id.trim().to_string(),
            name: name.trim().to_string(),
            code: code.trim().to_string(),
            created_at: Utc::now().naive_utc(),
        };
        self.staff_repo.insert_branch(&branch)?;

        self.audit.record(
            ActionLog::new(ActionType::RegisterBranch, &actor.actor_id, "Branch", &branch.branch_id)
                .with_new_value(&branch),
        );
        info!(actor = %actor.actor_id, branch_id = %branch.branch_id, "网点已登记");
        Ok(branch)
    }

    pub fn list_branches(&self) -> ApiResult<Vec<Branch>> {
        Ok(self.staff_repo.list_branches()?)
    }

    // ==========================================
    // 资格档案
    // ==========================================

    /// 查询资格档案 (本人或网点管理者)
    pub fn get_eligibility(&self, actor: &Actor, staff_id: &str) -> ApiResult<StaffEligibility> {
        let result = (|| -> ApiResult<StaffEligibility> {
            let profile = self
                .staff_repo
                .find_eligibility(staff_id)?
                .ok_or_else(|| ApiError::not_found("StaffEligibility", staff_id))?;
            require_self_or_manager(actor, staff_id, &profile.branch_id, "get_eligibility")?;
            Ok(profile)
        })();
        result.log_rejection("get_eligibility", &actor.actor_id)
    }

    /// 写入资格档案 (按 staff_id 幂等)
    ///
    /// # 校验
    /// - 目标网点必须已登记 (ValidationError)
    /// - 档案转网点时, 原网点与目标网点都需要管理权限
    /// - 计数类字段缺省时取配置默认值
    pub fn upsert_eligibility(
        &self,
        actor: &Actor,
        input: &EligibilityInput,
    ) -> ApiResult<StaffEligibility> {
        self.upsert_eligibility_inner(actor, input)
            .log_rejection("upsert_eligibility", &actor.actor_id)
    }

    fn upsert_eligibility_inner(
        &self,
        actor: &Actor,
        input: &EligibilityInput,
    ) -> ApiResult<StaffEligibility> {
        require_non_empty("staff_id", &input.staff_id)?;
        require_non_empty("branch_id", &input.branch_id)?;
        require_branch_manager(actor, &input.branch_id, "upsert_eligibility")?;

        if self.staff_repo.find_branch(&input.branch_id)?.is_none() {
            return Err(ApiError::ValidationError(format!(
                "网点未登记: {}",
                input.branch_id
            )));
        }

        let existing = self.staff_repo.find_eligibility(&input.staff_id)?;
        if let Some(old) = &existing {
            if old.branch_id != input.branch_id {
                require_branch_manager(actor, &old.branch_id, "upsert_eligibility")?;
            }
        }

        let max_nights = match input.max_night_shifts_per_month {
            Some(v) => v,
            None => self.config_manager.get_default_max_night_shifts().unwrap_or_else(|e| {
                warn!("读取默认夜班上限失败: {}", e);
                DEFAULT_MAX_NIGHT_SHIFTS
            }),
        };
        let min_gap = match input.min_days_between_night_shifts {
            Some(v) => v,
            None => self
                .config_manager
                .get_default_min_days_between_nights()
                .unwrap_or_else(|e| {
                    warn!("读取默认夜班间隔失败: {}", e);
                    DEFAULT_MIN_DAYS_BETWEEN_NIGHTS
                }),
        };
        validate_non_negative("max_night_shifts_per_month", max_nights)?;
        validate_non_negative("min_days_between_night_shifts", min_gap)?;

        let profile = StaffEligibility {
            staff_id: input.staff_id.trim().to_string(),
            branch_id: input.branch_id.trim().to_string(),
            can_work_night: input.can_work_night,
            can_work_weekend_day: input.can_work_weekend_day,
            has_server_access: input.has_server_access,
            has_sabbath_restriction: input.has_sabbath_restriction,
            max_night_shifts_per_month: max_nights,
            min_days_between_night_shifts: min_gap,
            active: input.active,
            updated_by: Some(actor.actor_id.clone()),
            updated_at: Utc::now().naive_utc(),
        };
        self.staff_repo.upsert_eligibility(&profile)?;

        let mut log = ActionLog::new(
            ActionType::UpsertEligibility,
            &actor.actor_id,
            "StaffEligibility",
            &profile.staff_id,
        )
        .with_new_value(&profile);
        if let Some(old) = &existing {
            log = log.with_old_value(old);
        }
        self.audit.record(log);

        info!(actor = %actor.actor_id, staff_id = %profile.staff_id, branch_id = %profile.branch_id, "资格档案已写入");
        Ok(profile)
    }

    /// 网点人员列表 (网点管理者)
    pub fn list_eligibility(
        &self,
        actor: &Actor,
        branch_id: &str,
        include_inactive: bool,
    ) -> ApiResult<Vec<StaffEligibility>> {
        require_branch_manager(actor, branch_id, "list_eligibility")
            .log_rejection("list_eligibility", &actor.actor_id)?;
        Ok(self.staff_repo.list_by_branch(branch_id, include_inactive)?)
    }

    /// 停用人员 (档案保留)
    pub fn deactivate(&self, actor: &Actor, staff_id: &str) -> ApiResult<StaffEligibility> {
        let result = (|| -> ApiResult<StaffEligibility> {
            let old = self
                .staff_repo
                .find_eligibility(staff_id)?
                .ok_or_else(|| ApiError::not_found("StaffEligibility", staff_id))?;
            require_branch_manager(actor, &old.branch_id, "deactivate_staff")?;

            let now = Utc::now().naive_utc();
            self.staff_repo.set_active(staff_id, false, &actor.actor_id, now)?;

            let mut updated = old.clone();
            updated.active = false;
            updated.updated_by = Some(actor.actor_id.clone());
            updated.updated_at = now;

            self.audit.record(
                ActionLog::new(ActionType::DeactivateStaff, &actor.actor_id, "StaffEligibility", staff_id)
                    .with_old_value(&old)
                    .with_new_value(&updated),
            );
            info!(actor = %actor.actor_id, staff_id = %staff_id, "人员已停用");
            Ok(updated)
        })();
        result.log_rejection("deactivate_staff", &actor.actor_id)
    }

    // ==========================================
    // 配置
    // ==========================================

    /// 写入配置
    ///
    /// 全局作用域仅 ADMIN; 网点作用域本网点 MANAGER 也可写
    pub fn set_config(
        &self,
        actor: &Actor,
        scope: &ConfigScope,
        key: &str,
        value: &str,
    ) -> ApiResult<()> {
        let result = (|| -> ApiResult<()> {
            if !WRITABLE_CONFIG_KEYS.contains(&key) {
                return Err(ApiError::ValidationError(format!("未知配置键: {}", key)));
            }
            require_non_empty("value", value)?;

            match scope {
                ConfigScope::Global => require_admin(actor, "set_config")?,
                ConfigScope::Branch { branch_id } => {
                    if GLOBAL_ONLY_KEYS.contains(&key) {
                        return Err(ApiError::ValidationError(format!(
                            "配置键仅支持全局作用域: {}",
                            key
                        )));
                    }
                    require_branch_manager(actor, branch_id, "set_config")?;
                }
            }
            validate_config_value(key, value)?;

            self.config_manager
                .set_value(scope, key, value.trim())
                .map_err(|e| ApiError::internal(&e))?;

            self.audit.record(
                ActionLog::new(ActionType::UpdateConfig, &actor.actor_id, "Config", key)
                    .with_detail(format!("{}={}", scope.scope_id(), value.trim())),
            );
            info!(actor = %actor.actor_id, scope = %scope.scope_id(), key = %key, "配置已更新");
            Ok(())
        })();
        result.log_rejection("set_config", &actor.actor_id)
    }

    /// 全局配置快照 (JSON)
    pub fn config_snapshot(&self, actor: &Actor) -> ApiResult<String> {
        crate::api::validator::require_manager_role(actor, "config_snapshot")?;
        self.config_manager
            .get_config_snapshot()
            .map_err(|e| ApiError::internal(&e))
    }
}

/// 配置值格式校验
fn validate_config_value(key: &str, value: &str) -> ApiResult<()> {
    let value = value.trim();
    let ok = match key {
        k if k == config_keys::UTC_OFFSET_MINUTES => value
            .parse::<i32>()
            .map(|m| (-720..=840).contains(&m))
            .unwrap_or(false),
        k if k == config_keys::NIGHT_ROLLOVER_BEFORE => {
            crate::engine::time_lock::parse_unlock_time(value).is_some()
        }
        k if k == config_keys::REASSIGN_MAX_RETRIES => value.parse::<u32>().is_ok(),
        k if k == config_keys::DEFAULT_MAX_NIGHT_SHIFTS
            || k == config_keys::DEFAULT_MIN_DAYS_BETWEEN_NIGHTS =>
        {
            value.parse::<i32>().map(|v| v >= 0).unwrap_or(false)
        }
        k if k == config_keys::LOCALE => crate::i18n::SUPPORTED_LOCALES.contains(&value),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ApiError::ValidationError(format!(
            "配置值格式错误: {}={}",
            key, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_value_formats() {
        assert!(validate_config_value(config_keys::UTC_OFFSET_MINUTES, "0").is_ok());
        assert!(validate_config_value(config_keys::UTC_OFFSET_MINUTES, "900").is_err());
        assert!(validate_config_value(config_keys::NIGHT_ROLLOVER_BEFORE, "07:30").is_ok());
        assert!(validate_config_value(config_keys::NIGHT_ROLLOVER_BEFORE, "7h").is_err());
        assert!(validate_config_value(config_keys::LOCALE, "id").is_ok());
        assert!(validate_config_value(config_keys::LOCALE, "fr").is_err());
        assert!(validate_config_value(config_keys::REASSIGN_MAX_RETRIES, "-1").is_err());
    }
}
