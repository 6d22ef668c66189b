// ==========================================
// 值班排班系统 - Eligibility Core 纯函数库
// ==========================================
// 职责: 排班/改派的校验流水线 (按固定顺序, 每步一种失败)
//   1. 排班表必须为 DRAFT                 → ScheduleLocked
//   2. 目标人员资格档案存在且同网点       → CrossBranchAssignment
//   3. 目标人员在岗                       → InactiveStaff
//   4. 夜班需 can_work_night              → IneligibleForNightShift
//   5. 周末白班需 can_work_weekend_day    → IneligibleForWeekendDay
//   6. 当天冲突: 同班次拒绝; 占位班次被取代 → DuplicateAssignment
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::schedule::{Assignment, Schedule};
use crate::domain::staff::StaffEligibility;
use crate::domain::types::ShiftType;
use crate::engine::error::RosterError;
use crate::repository::schedule_repo::RevisionRef;
use chrono::NaiveDate;

// ==========================================
// EligibilityCore - 纯函数工具类
// ==========================================
pub struct EligibilityCore;

impl EligibilityCore {
    /// 步骤1: 排班表必须为 DRAFT
    pub fn check_schedule_open(schedule: &Schedule) -> Result<(), RosterError> {
        if schedule.is_draft() {
            Ok(())
        } else {
            Err(RosterError::ScheduleLocked {
                schedule_id: schedule.schedule_id.clone(),
            })
        }
    }

    /// 步骤2-5: 目标人员资格
    ///
    /// # 参数
    /// - profile: 目标人员资格档案 (None 表示未登记)
    pub fn check_candidate(
        schedule: &Schedule,
        staff_id: &str,
        profile: Option<&StaffEligibility>,
        shift_type: ShiftType,
    ) -> Result<(), RosterError> {
        let profile = match profile {
            Some(p) if p.branch_id == schedule.branch_id => p,
            // 未登记档案与跨网点同样处理: 不属于该排班表的人员池
            _ => {
                return Err(RosterError::CrossBranchAssignment {
                    staff_id: staff_id.to_string(),
                    branch_id: schedule.branch_id.clone(),
                })
            }
        };

        if !profile.active {
            return Err(RosterError::InactiveStaff {
                staff_id: staff_id.to_string(),
            });
        }

        if shift_type.is_night() && !profile.can_work_night {
            return Err(RosterError::IneligibleForNightShift {
                staff_id: staff_id.to_string(),
                shift_type,
            });
        }

        if shift_type.is_weekend_day() && !profile.can_work_weekend_day {
            return Err(RosterError::IneligibleForWeekendDay {
                staff_id: staff_id.to_string(),
                shift_type,
            });
        }

        Ok(())
    }

    /// 步骤6: 当天冲突处理
    ///
    /// # 规则
    /// - 当天无排班 → 无需处理
    /// - 同班次 → DuplicateAssignment
    /// - 已有占位班次 (OFF/LEAVE/HOLIDAY) 且班次不同 → 返回待删除的占位排班
    /// - 已有其他值班班次 → DuplicateAssignment (不静默覆盖真实班次)
    ///
    /// # 返回
    /// - Ok(Some(ref)): 需在同一事务内删除的占位排班
    pub fn resolve_conflict(
        staff_id: &str,
        date: NaiveDate,
        shift_type: ShiftType,
        existing: Option<&Assignment>,
    ) -> Result<Option<RevisionRef>, RosterError> {
        let existing = match existing {
            None => return Ok(None),
            Some(e) => e,
        };

        if existing.shift_type != shift_type && existing.shift_type.is_placeholder() {
            return Ok(Some(RevisionRef::of(existing)));
        }

        Err(RosterError::DuplicateAssignment {
            staff_id: staff_id.to_string(),
            date,
            existing: existing.shift_type,
        })
    }

    /// 完整校验流水线
    ///
    /// # 返回
    /// - Ok(Some(ref)): 校验通过, 且需同事务删除该占位排班
    /// - Ok(None): 校验通过, 无冲突
    pub fn validate_slot(
        schedule: &Schedule,
        staff_id: &str,
        profile: Option<&StaffEligibility>,
        date: NaiveDate,
        shift_type: ShiftType,
        existing_on_date: Option<&Assignment>,
    ) -> Result<Option<RevisionRef>, RosterError> {
        Self::check_schedule_open(schedule)?;
        Self::check_candidate(schedule, staff_id, profile, shift_type)?;
        Self::resolve_conflict(staff_id, date, shift_type, existing_on_date)
    }
}
