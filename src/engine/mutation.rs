// ==========================================
// 值班排班系统 - 排班变更引擎
// ==========================================
// 职责: 新增排班 / 改派 / 删除排班
// 流程: 读取 → EligibilityCore 校验 → 单事务落库
// 并发: 仓储层按 revision 乐观锁; 冲突时重读重试,
//       重试次数由 roster.reassign_max_retries 配置
// ==========================================

use crate::config::RosterConfigReader;
use crate::domain::schedule::{Assignment, Schedule};
use crate::domain::types::ShiftType;
use crate::engine::eligibility_core::EligibilityCore;
use crate::engine::error::RosterError;
use crate::repository::schedule_repo::{
    AssignmentRepository, RevisionRef, ScheduleRepository, SlotMove,
};
use crate::repository::staff_repo::StaffRepository;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 默认重试次数 (配置不可读时)
const DEFAULT_MAX_RETRIES: u32 = 3;

// ==========================================
// NewSlot - 新增排班参数
// ==========================================
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub schedule_id: String,
    pub staff_id: String,
    pub date: NaiveDate,
    pub shift_type: ShiftType,
}

// ==========================================
// AssignmentMutationEngine - 排班变更引擎
// ==========================================
pub struct AssignmentMutationEngine {
    schedule_repo: Arc<ScheduleRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    staff_repo: Arc<StaffRepository>,
    config: Arc<dyn RosterConfigReader>,
}

impl AssignmentMutationEngine {
    pub fn new(
        schedule_repo: Arc<ScheduleRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        staff_repo: Arc<StaffRepository>,
        config: Arc<dyn RosterConfigReader>,
    ) -> Self {
        Self {
            schedule_repo,
            assignment_repo,
            staff_repo,
            config,
        }
    }

    // ==========================================
    // 读取与校验 (供换班引擎复用)
    // ==========================================

    /// 读取排班记录及其排班表
    pub fn load_slot(&self, assignment_id: &str) -> Result<(Schedule, Assignment), RosterError> {
        let assignment = self
            .assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| RosterError::not_found("Assignment", assignment_id))?;
        let schedule = self.load_schedule(&assignment.schedule_id)?;
        Ok((schedule, assignment))
    }

    pub fn load_schedule(&self, schedule_id: &str) -> Result<Schedule, RosterError> {
        self.schedule_repo
            .find_by_id(schedule_id)?
            .ok_or_else(|| RosterError::not_found("Schedule", schedule_id))
    }

    /// 规划一次改派: 对目标人员跑完整校验流水线
    ///
    /// # 返回
    /// - Ok(SlotMove): 可直接交给 apply_moves 落库的改派计划
    pub fn plan_move(
        &self,
        schedule: &Schedule,
        assignment: &Assignment,
        new_staff_id: &str,
    ) -> Result<SlotMove, RosterError> {
        EligibilityCore::check_schedule_open(schedule)?;

        if new_staff_id == assignment.staff_id {
            return Err(RosterError::Validation(format!(
                "排班 {} 已由 {} 值班",
                assignment.assignment_id, new_staff_id
            )));
        }

        let profile = self.staff_repo.find_eligibility(new_staff_id)?;
        let existing = self.assignment_repo.find_by_staff_date(
            &schedule.schedule_id,
            new_staff_id,
            assignment.date,
        )?;

        let superseded = EligibilityCore::validate_slot(
            schedule,
            new_staff_id,
            profile.as_ref(),
            assignment.date,
            assignment.shift_type,
            existing.as_ref(),
        )?;

        Ok(SlotMove {
            assignment: RevisionRef::of(assignment),
            new_staff_id: new_staff_id.to_string(),
            superseded,
        })
    }

    // ==========================================
    // 并发重试
    // ==========================================

    fn max_retries(&self) -> u32 {
        self.config.get_reassign_max_retries().unwrap_or_else(|e| {
            warn!("读取重试次数失败, 使用默认值: {}", e);
            DEFAULT_MAX_RETRIES
        })
    }

    /// 乐观锁冲突时重读重试
    ///
    /// 每次重试都重新执行完整的读取与校验, 使后到者看到先到者的结果
    pub fn with_retry<T, F>(&self, operation: &str, mut f: F) -> Result<T, RosterError>
    where
        F: FnMut() -> Result<T, RosterError>,
    {
        let attempts = self.max_retries() + 1;
        let mut attempt = 1;
        loop {
            match f() {
                Err(e) if e.is_retryable() => {
                    if attempt >= attempts {
                        warn!(operation, attempts, "并发冲突重试耗尽: {}", e);
                        return Err(RosterError::ConcurrencyExhausted {
                            attempts,
                            last: e.to_string(),
                        });
                    }
                    debug!(operation, attempt, "并发冲突, 重读重试: {}", e);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 改派: 将排班换给 new_staff_id
    ///
    /// 目标人员当天的占位排班 (OFF/LEAVE/HOLIDAY) 在同一事务内删除
    pub fn reassign(&self, assignment_id: &str, new_staff_id: &str) -> Result<Assignment, RosterError> {
        let updated = self.with_retry("reassign", || {
            let (schedule, assignment) = self.load_slot(assignment_id)?;
            let plan = self.plan_move(&schedule, &assignment, new_staff_id)?;
            let now = Utc::now().naive_utc();

            let moved = self
                .assignment_repo
                .apply_moves(&schedule.schedule_id, &[plan], None, now)?;
            moved
                .into_iter()
                .next()
                .ok_or_else(|| RosterError::not_found("Assignment", assignment_id))
        })?;

        info!(
            assignment_id = %updated.assignment_id,
            staff_id = %updated.staff_id,
            revision = updated.revision,
            "排班改派完成"
        );
        Ok(updated)
    }

    /// 新增排班 (与改派相同的校验流水线, 另校验日期属于排班月份)
    pub fn assign(&self, slot: &NewSlot) -> Result<Assignment, RosterError> {
        let created = self.with_retry("assign", || {
            let schedule = self.load_schedule(&slot.schedule_id)?;
            EligibilityCore::check_schedule_open(&schedule)?;

            if !schedule.covers(slot.date) {
                return Err(RosterError::Validation(format!(
                    "日期 {} 不属于排班月份 {}-{:02}",
                    slot.date, schedule.year, schedule.month
                )));
            }

            let profile = self.staff_repo.find_eligibility(&slot.staff_id)?;
            let existing =
                self.assignment_repo
                    .find_by_staff_date(&schedule.schedule_id, &slot.staff_id, slot.date)?;

            let superseded = EligibilityCore::validate_slot(
                &schedule,
                &slot.staff_id,
                profile.as_ref(),
                slot.date,
                slot.shift_type,
                existing.as_ref(),
            )?;

            let assignment = Assignment {
                assignment_id: Uuid::new_v4().to_string(),
                schedule_id: schedule.schedule_id.clone(),
                staff_id: slot.staff_id.clone(),
                date: slot.date,
                shift_type: slot.shift_type,
                revision: 1,
                updated_at: Utc::now().naive_utc(),
            };
            self.assignment_repo
                .insert_with_supersede(&assignment, superseded.as_ref())?;
            Ok(assignment)
        })?;

        info!(
            assignment_id = %created.assignment_id,
            staff_id = %created.staff_id,
            date = %created.date,
            shift_type = %created.shift_type,
            "新增排班完成"
        );
        Ok(created)
    }

    /// 删除排班 (仅 DRAFT)
    pub fn remove(&self, assignment_id: &str) -> Result<Assignment, RosterError> {
        let removed = self.with_retry("remove_assignment", || {
            let (schedule, assignment) = self.load_slot(assignment_id)?;
            EligibilityCore::check_schedule_open(&schedule)?;
            self.assignment_repo
                .delete_draft(&RevisionRef::of(&assignment), &schedule.schedule_id)?;
            Ok(assignment)
        })?;

        info!(assignment_id = %removed.assignment_id, "删除排班完成");
        Ok(removed)
    }
}
