// ==========================================
// 值班排班系统 - 排班表 API
// ==========================================
// 职责: 排班表生命周期、排班增改删、节假日/待命、校验与汇总
// 权限: 写操作仅本网点 MANAGER / ADMIN; 查询限网点成员
// 红线: PUBLISHED 为单向锁, 发布后一切写操作返回 ScheduleLocked
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::api::error::{logged, ApiError, ApiResult};
use crate::api::validator::{
    require_branch_manager, require_branch_member, require_non_empty, validate_max_len,
    validate_year_month,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::actor::Actor;
use crate::domain::schedule::{Assignment, Holiday, OnCallAssignment, Schedule, StaffShiftSummary};
use crate::domain::types::{ScheduleStatus, ShiftType};
use crate::engine::audit::AuditRecorder;
use crate::engine::eligibility_core::EligibilityCore;
use crate::engine::events::{
    OptionalEventPublisher, ShiftEvent, ShiftEventPublisher, ShiftEventType,
};
use crate::engine::mutation::{AssignmentMutationEngine, NewSlot};
use crate::engine::roster_validator::{RosterValidationReport, RosterValidator};
use crate::repository::schedule_repo::{AssignmentRepository, CalendarRepository, ScheduleRepository};
use crate::repository::staff_repo::StaffRepository;

// ==========================================
// ScheduleApi - 排班表 API
// ==========================================
pub struct ScheduleApi {
    schedule_repo: Arc<ScheduleRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    calendar_repo: Arc<CalendarRepository>,
    staff_repo: Arc<StaffRepository>,
    mutation: Arc<AssignmentMutationEngine>,
    audit: AuditRecorder,
    event_publisher: OptionalEventPublisher,
}

impl ScheduleApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schedule_repo: Arc<ScheduleRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        calendar_repo: Arc<CalendarRepository>,
        staff_repo: Arc<StaffRepository>,
        mutation: Arc<AssignmentMutationEngine>,
        audit: AuditRecorder,
        event_publisher: Option<Arc<dyn ShiftEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            schedule_repo,
            assignment_repo,
            calendar_repo,
            staff_repo,
            mutation,
            audit,
            event_publisher,
        }
    }

    /// 读取排班表并校验管理权限
    fn managed_schedule(&self, actor: &Actor, schedule_id: &str, operation: &str) -> ApiResult<Schedule> {
        let schedule = self.mutation.load_schedule(schedule_id)?;
        require_branch_manager(actor, &schedule.branch_id, operation)?;
        Ok(schedule)
    }

    fn visible_schedule(&self, actor: &Actor, schedule_id: &str, operation: &str) -> ApiResult<Schedule> {
        let schedule = self.mutation.load_schedule(schedule_id)?;
        require_branch_member(actor, &schedule.branch_id, operation)?;
        Ok(schedule)
    }

    // ==========================================
    // 排班表生命周期
    // ==========================================

    /// 创建或获取 (branch, year, month) 的排班表
    pub fn create_or_get_schedule(
        &self,
        actor: &Actor,
        branch_id: &str,
        year: i32,
        month: u32,
    ) -> ApiResult<Schedule> {
        logged("create_or_get_schedule", &actor.actor_id, || {
            require_non_empty("branch_id", branch_id)?;
            validate_year_month(year, month)?;
            require_branch_manager(actor, branch_id, "create_schedule")?;

            if let Some(existing) = self.schedule_repo.find_by_scope(branch_id, year, month)? {
                return Ok(existing);
            }
            if self.staff_repo.find_branch(branch_id)?.is_none() {
                return Err(ApiError::ValidationError(format!("网点未登记: {}", branch_id)));
            }

            let schedule = Schedule {
                schedule_id: Uuid::new_v4().to_string(),
                branch_id: branch_id.to_string(),
                year,
                month,
                status: ScheduleStatus::Draft,
                published_at: None,
                published_by: None,
                created_at: Utc::now().naive_utc(),
            };
            if let Err(e) = self.schedule_repo.insert(&schedule) {
                // 并发创建: 唯一约束冲突后返回先到者
                if e.is_concurrency_conflict() {
                    if let Some(existing) = self.schedule_repo.find_by_scope(branch_id, year, month)? {
                        return Ok(existing);
                    }
                }
                return Err(e.into());
            }

            self.audit.record(
                ActionLog::new(ActionType::CreateSchedule, &actor.actor_id, "Schedule", &schedule.schedule_id)
                    .with_new_value(&schedule),
            );
            info!(
                actor = %actor.actor_id,
                schedule_id = %schedule.schedule_id,
                branch_id = %branch_id,
                "排班表已创建: {}-{:02}",
                year,
                month
            );
            Ok(schedule)
        })
    }

    pub fn get_schedule(&self, actor: &Actor, schedule_id: &str) -> ApiResult<Schedule> {
        logged("get_schedule", &actor.actor_id, || {
            self.visible_schedule(actor, schedule_id, "get_schedule")
        })
    }

    pub fn list_schedules(&self, actor: &Actor, branch_id: &str) -> ApiResult<Vec<Schedule>> {
        logged("list_schedules", &actor.actor_id, || {
            require_branch_member(actor, branch_id, "list_schedules")?;
            Ok(self.schedule_repo.list_by_branch(branch_id)?)
        })
    }

    /// 发布排班表 (DRAFT → PUBLISHED, 不可逆)
    ///
    /// # 返回
    /// - Err(InvalidState): 已发布, publishedAt/publishedBy 保持首次发布的值
    pub fn publish_schedule(&self, actor: &Actor, schedule_id: &str) -> ApiResult<Schedule> {
        logged("publish_schedule", &actor.actor_id, || {
            let before = self.managed_schedule(actor, schedule_id, "publish_schedule")?;

            let changed = self
                .schedule_repo
                .publish(schedule_id, &actor.actor_id, Utc::now().naive_utc())?;
            if !changed {
                return Err(ApiError::InvalidState {
                    from: ScheduleStatus::Published.to_string(),
                    event: "PUBLISH".to_string(),
                });
            }

            let published = self.mutation.load_schedule(schedule_id)?;
            self.audit.record(
                ActionLog::new(ActionType::PublishSchedule, &actor.actor_id, "Schedule", schedule_id)
                    .with_old_value(&before)
                    .with_new_value(&published),
            );
            self.event_publisher.publish(ShiftEvent::new(
                ShiftEventType::SchedulePublished,
                schedule_id,
                schedule_id,
                actor.actor_id.as_str(),
            ));
            info!(actor = %actor.actor_id, schedule_id = %schedule_id, "排班表已发布");
            Ok(published)
        })
    }

    /// 删除草稿排班表 (排班/节假日/待命级联, 换班申请与报告同事务删除)
    pub fn delete_schedule(&self, actor: &Actor, schedule_id: &str) -> ApiResult<()> {
        logged("delete_schedule", &actor.actor_id, || {
            let schedule = self.managed_schedule(actor, schedule_id, "delete_schedule")?;
            EligibilityCore::check_schedule_open(&schedule)?;
            self.schedule_repo.delete_draft(schedule_id)?;

            self.audit.record(
                ActionLog::new(ActionType::DeleteSchedule, &actor.actor_id, "Schedule", schedule_id)
                    .with_old_value(&schedule),
            );
            info!(actor = %actor.actor_id, schedule_id = %schedule_id, "排班表已删除");
            Ok(())
        })
    }

    // ==========================================
    // 排班增改删
    // ==========================================

    /// 新增排班
    pub fn assign_slot(
        &self,
        actor: &Actor,
        schedule_id: &str,
        staff_id: &str,
        date: NaiveDate,
        shift_type: ShiftType,
    ) -> ApiResult<Assignment> {
        logged("assign_slot", &actor.actor_id, || {
            require_non_empty("staff_id", staff_id)?;
            self.managed_schedule(actor, schedule_id, "assign_slot")?;

            let created = self.mutation.assign(&NewSlot {
                schedule_id: schedule_id.to_string(),
                staff_id: staff_id.to_string(),
                date,
                shift_type,
            })?;

            self.audit.record(
                ActionLog::new(ActionType::AssignSlot, &actor.actor_id, "Assignment", &created.assignment_id)
                    .with_new_value(&created),
            );
            info!(
                actor = %actor.actor_id,
                assignment_id = %created.assignment_id,
                staff_id = %staff_id,
                date = %date,
                shift_type = %shift_type,
                "排班已新增"
            );
            Ok(created)
        })
    }

    /// 改派排班
    ///
    /// # 返回
    /// - Err(ScheduleLocked / CrossBranchAssignment / InactiveStaff /
    ///   IneligibleForNightShift / IneligibleForWeekendDay / DuplicateAssignment / NotFound)
    pub fn reassign_slot(
        &self,
        actor: &Actor,
        assignment_id: &str,
        new_staff_id: &str,
    ) -> ApiResult<Assignment> {
        logged("reassign_slot", &actor.actor_id, || {
            require_non_empty("new_staff_id", new_staff_id)?;
            let (schedule, before) = self.mutation.load_slot(assignment_id)?;
            require_branch_manager(actor, &schedule.branch_id, "reassign_slot")?;

            let updated = self.mutation.reassign(assignment_id, new_staff_id)?;

            self.audit.record(
                ActionLog::new(ActionType::ReassignSlot, &actor.actor_id, "Assignment", assignment_id)
                    .with_old_value(&before)
                    .with_new_value(&updated),
            );
            info!(
                actor = %actor.actor_id,
                assignment_id = %assignment_id,
                from = %before.staff_id,
                to = %updated.staff_id,
                "排班已改派"
            );
            Ok(updated)
        })
    }

    /// 删除排班 (仅 DRAFT)
    pub fn remove_assignment(&self, actor: &Actor, assignment_id: &str) -> ApiResult<Assignment> {
        logged("remove_assignment", &actor.actor_id, || {
            let (schedule, _) = self.mutation.load_slot(assignment_id)?;
            require_branch_manager(actor, &schedule.branch_id, "remove_assignment")?;

            let removed = self.mutation.remove(assignment_id)?;

            self.audit.record(
                ActionLog::new(ActionType::RemoveAssignment, &actor.actor_id, "Assignment", assignment_id)
                    .with_old_value(&removed),
            );
            info!(actor = %actor.actor_id, assignment_id = %assignment_id, "排班已删除");
            Ok(removed)
        })
    }

    pub fn list_assignments(&self, actor: &Actor, schedule_id: &str) -> ApiResult<Vec<Assignment>> {
        logged("list_assignments", &actor.actor_id, || {
            self.visible_schedule(actor, schedule_id, "list_assignments")?;
            Ok(self.assignment_repo.list_by_schedule(schedule_id)?)
        })
    }

    // ==========================================
    // 节假日
    // ==========================================

    pub fn add_holiday(
        &self,
        actor: &Actor,
        schedule_id: &str,
        date: NaiveDate,
        name: &str,
    ) -> ApiResult<Holiday> {
        logged("add_holiday", &actor.actor_id, || {
            require_non_empty("name", name)?;
            validate_max_len("name", name, 200)?;
            let schedule = self.managed_schedule(actor, schedule_id, "add_holiday")?;
            EligibilityCore::check_schedule_open(&schedule)?;
            ensure_covers(&schedule, date)?;

            let holiday = Holiday {
                holiday_id: Uuid::new_v4().to_string(),
                schedule_id: schedule_id.to_string(),
                date,
                name: name.trim().to_string(),
            };
            self.calendar_repo.insert_holiday(&holiday)?;

            self.audit.record(
                ActionLog::new(ActionType::AddHoliday, &actor.actor_id, "Holiday", &holiday.holiday_id)
                    .with_new_value(&holiday),
            );
            info!(actor = %actor.actor_id, schedule_id = %schedule_id, date = %date, "节假日已登记");
            Ok(holiday)
        })
    }

    pub fn remove_holiday(&self, actor: &Actor, schedule_id: &str, holiday_id: &str) -> ApiResult<()> {
        logged("remove_holiday", &actor.actor_id, || {
            let schedule = self.managed_schedule(actor, schedule_id, "remove_holiday")?;
            EligibilityCore::check_schedule_open(&schedule)?;
            let holiday = self
                .calendar_repo
                .find_holiday(holiday_id)?
                .filter(|h| h.schedule_id == schedule_id)
                .ok_or_else(|| ApiError::not_found("Holiday", holiday_id))?;

            self.calendar_repo.delete_holiday(schedule_id, holiday_id)?;

            self.audit.record(
                ActionLog::new(ActionType::RemoveHoliday, &actor.actor_id, "Holiday", holiday_id)
                    .with_old_value(&holiday),
            );
            info!(actor = %actor.actor_id, holiday_id = %holiday_id, "节假日已删除");
            Ok(())
        })
    }

    pub fn list_holidays(&self, actor: &Actor, schedule_id: &str) -> ApiResult<Vec<Holiday>> {
        logged("list_holidays", &actor.actor_id, || {
            self.visible_schedule(actor, schedule_id, "list_holidays")?;
            Ok(self.calendar_repo.list_holidays(schedule_id)?)
        })
    }

    // ==========================================
    // 待命
    // ==========================================

    /// 登记待命 (人员须在岗且属于本网点; 每人每天至多一条)
    pub fn add_on_call(
        &self,
        actor: &Actor,
        schedule_id: &str,
        staff_id: &str,
        date: NaiveDate,
    ) -> ApiResult<OnCallAssignment> {
        logged("add_on_call", &actor.actor_id, || {
            require_non_empty("staff_id", staff_id)?;
            let schedule = self.managed_schedule(actor, schedule_id, "add_on_call")?;
            EligibilityCore::check_schedule_open(&schedule)?;
            ensure_covers(&schedule, date)?;

            let profile = self.staff_repo.find_eligibility(staff_id)?;
            // 待命不区分班次, 按工作日白班只校验网点与在岗
            EligibilityCore::check_candidate(&schedule, staff_id, profile.as_ref(), ShiftType::Day)?;

            let on_call = OnCallAssignment {
                oncall_id: Uuid::new_v4().to_string(),
                schedule_id: schedule_id.to_string(),
                staff_id: staff_id.to_string(),
                date,
            };
            self.calendar_repo.insert_on_call(&on_call)?;

            self.audit.record(
                ActionLog::new(ActionType::AddOnCall, &actor.actor_id, "OnCall", &on_call.oncall_id)
                    .with_new_value(&on_call),
            );
            info!(actor = %actor.actor_id, staff_id = %staff_id, date = %date, "待命已登记");
            Ok(on_call)
        })
    }

    pub fn remove_on_call(&self, actor: &Actor, schedule_id: &str, oncall_id: &str) -> ApiResult<()> {
        logged("remove_on_call", &actor.actor_id, || {
            let schedule = self.managed_schedule(actor, schedule_id, "remove_on_call")?;
            EligibilityCore::check_schedule_open(&schedule)?;
            let on_call = self
                .calendar_repo
                .find_on_call(oncall_id)?
                .filter(|o| o.schedule_id == schedule_id)
                .ok_or_else(|| ApiError::not_found("OnCall", oncall_id))?;

            self.calendar_repo.delete_on_call(schedule_id, oncall_id)?;

            self.audit.record(
                ActionLog::new(ActionType::RemoveOnCall, &actor.actor_id, "OnCall", oncall_id)
                    .with_old_value(&on_call),
            );
            info!(actor = %actor.actor_id, oncall_id = %oncall_id, "待命已删除");
            Ok(())
        })
    }

    pub fn list_on_call(&self, actor: &Actor, schedule_id: &str) -> ApiResult<Vec<OnCallAssignment>> {
        logged("list_on_call", &actor.actor_id, || {
            self.visible_schedule(actor, schedule_id, "list_on_call")?;
            Ok(self.calendar_repo.list_on_call(schedule_id)?)
        })
    }

    // ==========================================
    // 校验与汇总 (只读)
    // ==========================================

    fn validator_for(&self, schedule: &Schedule) -> ApiResult<RosterValidator> {
        let profiles = self.staff_repo.list_by_branch(&schedule.branch_id, true)?;
        let assignments = self.assignment_repo.list_by_schedule(&schedule.schedule_id)?;
        Ok(RosterValidator::new(profiles, assignments))
    }

    /// 整表合规校验 (建议性, 不阻断写操作)
    pub fn validate_schedule(&self, actor: &Actor, schedule_id: &str) -> ApiResult<RosterValidationReport> {
        logged("validate_schedule", &actor.actor_id, || {
            let schedule = self.visible_schedule(actor, schedule_id, "validate_schedule")?;
            Ok(self.validator_for(&schedule)?.validate_schedule())
        })
    }

    /// 预览单条排班
    pub fn can_assign(
        &self,
        actor: &Actor,
        schedule_id: &str,
        staff_id: &str,
        shift_type: ShiftType,
        date: NaiveDate,
    ) -> ApiResult<RosterValidationReport> {
        logged("can_assign", &actor.actor_id, || {
            let schedule = self.visible_schedule(actor, schedule_id, "can_assign")?;
            ensure_covers(&schedule, date)?;
            Ok(self.validator_for(&schedule)?.can_assign(staff_id, shift_type, date))
        })
    }

    /// 人员月度班次汇总 (按 staff_id 排序; 在岗但无排班的人员计为 0)
    pub fn staff_summary(&self, actor: &Actor, schedule_id: &str) -> ApiResult<Vec<StaffShiftSummary>> {
        logged("staff_summary", &actor.actor_id, || {
            let schedule = self.visible_schedule(actor, schedule_id, "staff_summary")?;

            let mut summaries: BTreeMap<String, StaffShiftSummary> = BTreeMap::new();
            for profile in self.staff_repo.list_by_branch(&schedule.branch_id, false)? {
                summaries.insert(profile.staff_id.clone(), StaffShiftSummary::new(profile.staff_id));
            }
            for assignment in self.assignment_repo.list_by_schedule(schedule_id)? {
                summaries
                    .entry(assignment.staff_id.clone())
                    .or_insert_with(|| StaffShiftSummary::new(assignment.staff_id.clone()))
                    .record(assignment.shift_type);
            }
            Ok(summaries.into_values().collect())
        })
    }
}

fn ensure_covers(schedule: &Schedule, date: NaiveDate) -> ApiResult<()> {
    if schedule.covers(date) {
        Ok(())
    } else {
        Err(ApiError::ValidationError(format!(
            "日期 {} 不属于排班月份 {}-{:02}",
            date, schedule.year, schedule.month
        )))
    }
}
