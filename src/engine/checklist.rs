// ==========================================
// 值班排班系统 - 时间锁清单引擎
// ==========================================
// 职责: 清单项状态变更 (单项 / 批量部分成功)
// 红线: 未到解锁时刻拒绝 COMPLETED, 返回剩余时间提示
// 红线: 同一批次使用同一个 now
// 红线: 某项被锁不影响其他项
// ==========================================

use crate::config::RosterConfigReader;
use crate::domain::report::{
    BatchUpdateResult, ChecklistItem, ChecklistItemError, ChecklistUpdate, ShiftReport,
};
use crate::domain::schedule::Assignment;
use crate::domain::types::ChecklistStatus;
use crate::engine::error::RosterError;
use crate::engine::report_stats::derive_status;
use crate::engine::time_lock::{locked_message, Clock, LockState, TimeLockPolicy};
use crate::repository::report_repo::ShiftReportRepository;
use crate::repository::schedule_repo::{AssignmentRepository, ScheduleRepository};
use chrono::NaiveTime;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// ChecklistEngine
// ==========================================
pub struct ChecklistEngine {
    report_repo: Arc<ShiftReportRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    schedule_repo: Arc<ScheduleRepository>,
    config: Arc<dyn RosterConfigReader>,
    clock: Arc<dyn Clock>,
}

/// 批量更新结果 + 更新后的报告
#[derive(Debug, Clone)]
pub struct ChecklistOutcome {
    pub report: ShiftReport,
    pub result: BatchUpdateResult,
    /// 已更新项在本批次之前的落库状态
    pub previous: Vec<ChecklistItem>,
}

impl ChecklistOutcome {
    pub fn previous_of(&self, item_id: &str) -> Option<&ChecklistItem> {
        self.previous.iter().find(|i| i.item_id == item_id)
    }
}

impl ChecklistEngine {
    pub fn new(
        report_repo: Arc<ShiftReportRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        schedule_repo: Arc<ScheduleRepository>,
        config: Arc<dyn RosterConfigReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            report_repo,
            assignment_repo,
            schedule_repo,
            config,
            clock,
        }
    }

    /// 报告对应的排班记录
    pub fn assignment_for_report(&self, report_id: &str) -> Result<(ShiftReport, Assignment), RosterError> {
        let report = self
            .report_repo
            .find_by_id(report_id)?
            .ok_or_else(|| RosterError::not_found("ShiftReport", report_id))?;
        let assignment = self
            .assignment_repo
            .find_by_id(&report.assignment_id)?
            .ok_or_else(|| RosterError::not_found("Assignment", &report.assignment_id))?;
        Ok((report, assignment))
    }

    /// 按排班所属网点构建时间锁策略
    ///
    /// 配置读取失败时使用默认值, 不阻断清单操作
    fn policy_for(&self, assignment: &Assignment) -> Result<TimeLockPolicy, RosterError> {
        let schedule = self
            .schedule_repo
            .find_by_id(&assignment.schedule_id)?
            .ok_or_else(|| RosterError::not_found("Schedule", &assignment.schedule_id))?;

        let offset = self
            .config
            .get_utc_offset_minutes(&schedule.branch_id)
            .unwrap_or_else(|e| {
                warn!("读取网点时区偏移失败, 使用默认值: {}", e);
                480
            });
        let rollover = self
            .config
            .get_night_rollover_before(&schedule.branch_id)
            .unwrap_or_else(|e| {
                warn!("读取夜班分界时刻失败, 使用默认值: {}", e);
                NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()
            });

        Ok(TimeLockPolicy::new(offset, rollover))
    }

    fn locale(&self) -> String {
        self.config.get_locale().unwrap_or_else(|_| "en".to_string())
    }

    // ==========================================
    // 批量更新
    // ==========================================

    /// 批量更新清单项 (部分成功)
    ///
    /// # 规则
    /// - 每项独立判定, 被锁或不存在的项进入 errors
    /// - 通过的项与报告状态重算在同一事务内落库
    /// - 所有项使用同一个 now
    pub fn update_items(
        &self,
        report_id: &str,
        updates: &[ChecklistUpdate],
    ) -> Result<ChecklistOutcome, RosterError> {
        let now = self.clock.now_utc();
        let (_, assignment) = self.assignment_for_report(report_id)?;
        let policy = self.policy_for(&assignment)?;
        let locale = self.locale();

        let current = self.report_repo.list_items(report_id)?;
        let mut accepted: Vec<ChecklistItem> = Vec::with_capacity(updates.len());
        let mut errors = Vec::new();

        for update in updates {
            // 同批次内重复出现的项在前一次结果上继续; 被拒时前一次结果保留
            let earlier = accepted.iter().position(|i| i.item_id == update.item_id);
            let base = match earlier {
                Some(pos) => Some(accepted[pos].clone()),
                None => current.iter().find(|i| i.item_id == update.item_id).cloned(),
            };

            let mut item = match base {
                Some(item) => item,
                None => {
                    errors.push(ChecklistItemError {
                        item_id: update.item_id.clone(),
                        message: format!("清单项不属于报告 {}", report_id),
                    });
                    continue;
                }
            };

            if update.status == ChecklistStatus::Completed && item.status != ChecklistStatus::Completed {
                if let LockState::Locked { unlock_at, remaining } = policy.check(
                    item.unlock_time,
                    assignment.shift_type,
                    assignment.date,
                    now,
                ) {
                    let message = locked_message(&locale, unlock_at, remaining);
                    debug!(item_id = %item.item_id, "清单项未解锁: {}", message);
                    errors.push(ChecklistItemError {
                        item_id: item.item_id.clone(),
                        message,
                    });
                    continue;
                }
            }

            if item.status != update.status {
                item.apply_status(update.status, now);
            } else {
                item.updated_at = now;
            }
            if update.notes.is_some() {
                item.notes = update.notes.clone();
            }
            match earlier {
                Some(pos) => accepted[pos] = item,
                None => accepted.push(item),
            }
        }

        let previous: Vec<ChecklistItem> = current
            .into_iter()
            .filter(|c| accepted.iter().any(|a| a.item_id == c.item_id))
            .collect();

        let report = self
            .report_repo
            .save_checklist_updates(report_id, &accepted, now, derive_status)?;

        info!(
            report_id = %report_id,
            updated = accepted.len(),
            rejected = errors.len(),
            status = %report.status,
            "清单批量更新完成"
        );

        Ok(ChecklistOutcome {
            report,
            result: BatchUpdateResult {
                updated: accepted,
                errors,
            },
            previous,
        })
    }

    /// 更新单个清单项
    ///
    /// # 返回
    /// - Err(ItemLocked): 未到解锁时刻, message 为剩余时间提示
    pub fn set_status(
        &self,
        item_id: &str,
        status: ChecklistStatus,
        notes: Option<String>,
    ) -> Result<(ShiftReport, ChecklistItem), RosterError> {
        let item = self
            .report_repo
            .find_item(item_id)?
            .ok_or_else(|| RosterError::not_found("ChecklistItem", item_id))?;

        let outcome = self.update_items(
            &item.report_id,
            &[ChecklistUpdate {
                item_id: item_id.to_string(),
                status,
                notes,
            }],
        )?;

        if let Some(err) = outcome.result.errors.into_iter().next() {
            return Err(RosterError::ItemLocked {
                item_id: err.item_id,
                message: err.message,
            });
        }

        let updated = outcome
            .result
            .updated
            .into_iter()
            .next()
            .ok_or_else(|| RosterError::not_found("ChecklistItem", item_id))?;
        Ok((outcome.report, updated))
    }
}
