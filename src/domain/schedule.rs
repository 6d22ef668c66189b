// ==========================================
// 值班排班系统 - 月度排班表领域模型
// ==========================================
// 作用域: (branch_id, year, month)
// 红线: PUBLISHED 后不可修改/删除/换班
// 红线: 每个 (schedule_id, staff_id, date) 至多一条排班
// ==========================================

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{ScheduleStatus, ShiftType};

// ==========================================
// Schedule - 月度排班表
// ==========================================
// 独占拥有: Assignment / Holiday / OnCallAssignment (级联删除)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,                 // 排班表ID
    pub branch_id: String,                   // 网点
    pub year: i32,                           // 年
    pub month: u32,                          // 月 (1-12)
    pub status: ScheduleStatus,              // 状态
    pub published_at: Option<NaiveDateTime>, // 发布时间
    pub published_by: Option<String>,        // 发布人
    pub created_at: NaiveDateTime,           // 创建时间
}

impl Schedule {
    pub fn is_draft(&self) -> bool {
        self.status == ScheduleStatus::Draft
    }

    pub fn is_published(&self) -> bool {
        self.status == ScheduleStatus::Published
    }

    /// 日期是否落在本排班表所属月份
    pub fn covers(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

// ==========================================
// Assignment - 排班记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: String,     // 排班ID
    pub schedule_id: String,       // 所属排班表
    pub staff_id: String,          // 值班人员
    pub date: NaiveDate,           // 日期
    pub shift_type: ShiftType,     // 班次
    pub revision: i32,             // 乐观锁: 修订号
    pub updated_at: NaiveDateTime, // 最后修改时间
}

// ==========================================
// Holiday - 节假日
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub holiday_id: String,
    pub schedule_id: String,
    pub date: NaiveDate,
    pub name: String,
}

// ==========================================
// OnCallAssignment - 待命安排
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnCallAssignment {
    pub oncall_id: String,
    pub schedule_id: String,
    pub staff_id: String,
    pub date: NaiveDate,
}

// ==========================================
// StaffShiftSummary - 人员月度班次汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffShiftSummary {
    pub staff_id: String,
    pub day_shifts: i32,         // 工作日白班
    pub night_shifts: i32,       // 全部夜班
    pub weekend_day_shifts: i32, // 周末白班
    pub off_days: i32,           // 休息
    pub leave_days: i32,         // 请假
    pub holiday_days: i32,       // 节假日
}

impl StaffShiftSummary {
    pub fn new(staff_id: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            ..Default::default()
        }
    }

    /// 累加一条排班
    pub fn record(&mut self, shift_type: ShiftType) {
        match shift_type {
            ShiftType::Day => self.day_shifts += 1,
            ShiftType::Night | ShiftType::SaturdayNight | ShiftType::SundayNight => {
                self.night_shifts += 1
            }
            ShiftType::SaturdayDay | ShiftType::SundayDay => self.weekend_day_shifts += 1,
            ShiftType::Off => self.off_days += 1,
            ShiftType::Leave => self.leave_days += 1,
            ShiftType::Holiday => self.holiday_days += 1,
        }
    }

    pub fn working_shifts(&self) -> i32 {
        self.day_shifts + self.night_shifts + self.weekend_day_shifts
    }
}
