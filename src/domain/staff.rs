// ==========================================
// 值班排班系统 - 人员值班资格领域模型
// ==========================================
// 红线: 资格档案只停用不删除
// 红线: active=false 的人员不可成为新排班/换班的目标
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::ShiftType;

// ==========================================
// Branch - 网点
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: String,        // 网点ID
    pub name: String,             // 网点名称
    pub code: String,             // 网点代码
    pub created_at: NaiveDateTime,
}

// ==========================================
// StaffEligibility - 人员值班资格
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffEligibility {
    pub staff_id: String,                   // 人员ID
    pub branch_id: String,                  // 所属网点
    pub can_work_night: bool,               // 可值夜班
    pub can_work_weekend_day: bool,         // 可值周末白班
    pub has_server_access: bool,            // 具备机房权限
    pub has_sabbath_restriction: bool,      // 安息日限制 (周五/周六不值夜班)
    pub max_night_shifts_per_month: i32,    // 每月夜班上限
    pub min_days_between_night_shifts: i32, // 夜班最小间隔天数
    pub active: bool,                       // 是否在岗
    pub updated_by: Option<String>,         // 最后修改人
    pub updated_at: NaiveDateTime,          // 最后修改时间
}

impl StaffEligibility {
    /// 资格是否允许承担该班次
    ///
    /// 仅判定静态资格 (夜班/周末白班), 不含月度计数类规则
    pub fn permits(&self, shift_type: ShiftType) -> bool {
        if shift_type.is_night() && !self.can_work_night {
            return false;
        }
        if shift_type.is_weekend_day() && !self.can_work_weekend_day {
            return false;
        }
        true
    }
}

// ==========================================
// EligibilityInput - 资格档案写入参数
// ==========================================
// 计数类字段缺省时使用配置默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityInput {
    pub staff_id: String,
    pub branch_id: String,
    pub can_work_night: bool,
    pub can_work_weekend_day: bool,
    pub has_server_access: bool,
    pub has_sabbath_restriction: bool,
    pub max_night_shifts_per_month: Option<i32>,
    pub min_days_between_night_shifts: Option<i32>,
    pub active: bool,
}
