// ==========================================
// 值班排班系统 - 操作审计日志领域模型
// ==========================================
// 红线: 每次成功的写操作都必须记录
// 内容: (actor, action, entity_id, old_value?, new_value)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,                // 日志ID
    pub action_type: String,              // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,         // 操作时间戳 (UTC)
    pub actor: String,                    // 操作人
    pub entity_type: String,              // 实体类型 (Schedule/Assignment/...)
    pub entity_id: String,                // 实体ID
    pub old_value_json: Option<JsonValue>, // 变更前
    pub new_value_json: Option<JsonValue>, // 变更后
    pub detail: Option<String>,           // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    RegisterBranch,    // 登记网点
    UpsertEligibility, // 写入资格档案
    DeactivateStaff,   // 停用人员
    CreateSchedule,    // 创建排班表
    PublishSchedule,   // 发布排班表
    DeleteSchedule,    // 删除排班表
    AssignSlot,        // 新增排班
    ReassignSlot,      // 改派排班
    RemoveAssignment,  // 删除排班
    AddHoliday,        // 新增节假日
    RemoveHoliday,     // 删除节假日
    AddOnCall,         // 新增待命
    RemoveOnCall,      // 删除待命
    CreateSwap,        // 发起换班
    DecideSwap,        // 接收人答复
    ApplySwap,         // 换班生效
    CancelSwap,        // 撤销换班
    CreateReport,      // 创建值班报告
    UpdateReport,      // 更新报告备注
    UpdateChecklist,   // 更新清单项
    ToggleBackup,      // 勾选备份项
    CreateIssue,       // 新增问题
    UpdateIssue,       // 更新问题
    UpsertTemplate,    // 写入清单模板
    UpdateConfig,      // 更新配置
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RegisterBranch => "RegisterBranch",
            ActionType::UpsertEligibility => "UpsertEligibility",
            ActionType::DeactivateStaff => "DeactivateStaff",
            ActionType::CreateSchedule => "CreateSchedule",
            ActionType::PublishSchedule => "PublishSchedule",
            ActionType::DeleteSchedule => "DeleteSchedule",
            ActionType::AssignSlot => "AssignSlot",
            ActionType::ReassignSlot => "ReassignSlot",
            ActionType::RemoveAssignment => "RemoveAssignment",
            ActionType::AddHoliday => "AddHoliday",
            ActionType::RemoveHoliday => "RemoveHoliday",
            ActionType::AddOnCall => "AddOnCall",
            ActionType::RemoveOnCall => "RemoveOnCall",
            ActionType::CreateSwap => "CreateSwap",
            ActionType::DecideSwap => "DecideSwap",
            ActionType::ApplySwap => "ApplySwap",
            ActionType::CancelSwap => "CancelSwap",
            ActionType::CreateReport => "CreateReport",
            ActionType::UpdateReport => "UpdateReport",
            ActionType::UpdateChecklist => "UpdateChecklist",
            ActionType::ToggleBackup => "ToggleBackup",
            ActionType::CreateIssue => "CreateIssue",
            ActionType::UpdateIssue => "UpdateIssue",
            ActionType::UpsertTemplate => "UpsertTemplate",
            ActionType::UpdateConfig => "UpdateConfig",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RegisterBranch" => Some(ActionType::RegisterBranch),
            "UpsertEligibility" => Some(ActionType::UpsertEligibility),
            "DeactivateStaff" => Some(ActionType::DeactivateStaff),
            "CreateSchedule" => Some(ActionType::CreateSchedule),
            "PublishSchedule" => Some(ActionType::PublishSchedule),
            "DeleteSchedule" => Some(ActionType::DeleteSchedule),
            "AssignSlot" => Some(ActionType::AssignSlot),
            "ReassignSlot" => Some(ActionType::ReassignSlot),
            "RemoveAssignment" => Some(ActionType::RemoveAssignment),
            "AddHoliday" => Some(ActionType::AddHoliday),
            "RemoveHoliday" => Some(ActionType::RemoveHoliday),
            "AddOnCall" => Some(ActionType::AddOnCall),
            "RemoveOnCall" => Some(ActionType::RemoveOnCall),
            "CreateSwap" => Some(ActionType::CreateSwap),
            "DecideSwap" => Some(ActionType::DecideSwap),
            "ApplySwap" => Some(ActionType::ApplySwap),
            "CancelSwap" => Some(ActionType::CancelSwap),
            "CreateReport" => Some(ActionType::CreateReport),
            "UpdateReport" => Some(ActionType::UpdateReport),
            "UpdateChecklist" => Some(ActionType::UpdateChecklist),
            "ToggleBackup" => Some(ActionType::ToggleBackup),
            "CreateIssue" => Some(ActionType::CreateIssue),
            "UpdateIssue" => Some(ActionType::UpdateIssue),
            "UpsertTemplate" => Some(ActionType::UpsertTemplate),
            "UpdateConfig" => Some(ActionType::UpdateConfig),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `action_type`: 操作类型
    /// - `actor`: 操作人
    /// - `entity_type`: 实体类型
    /// - `entity_id`: 实体ID
    pub fn new(
        action_type: ActionType,
        actor: &str,
        entity_type: &str,
        entity_id: &str,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            old_value_json: None,
            new_value_json: None,
            detail: None,
        }
    }

    /// 设置变更前的值 (转换为JSON)
    pub fn with_old_value<T: Serialize>(mut self, value: &T) -> Self {
        self.old_value_json = serde_json::to_value(value).ok();
        self
    }

    /// 设置变更后的值 (转换为JSON)
    pub fn with_new_value<T: Serialize>(mut self, value: &T) -> Self {
        self.new_value_json = serde_json::to_value(value).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_round_trip() {
        for action in [
            ActionType::PublishSchedule,
            ActionType::ReassignSlot,
            ActionType::ApplySwap,
            ActionType::UpdateChecklist,
        ] {
            assert_eq!(ActionType::from_str(action.as_str()), Some(action));
        }
        assert_eq!(ActionType::from_str("Unknown"), None);
    }

    #[test]
    fn test_builder_sets_values() {
        let log = ActionLog::new(ActionType::ReassignSlot, "m1", "Assignment", "A1")
            .with_old_value(&serde_json::json!({"staff_id": "S1"}))
            .with_new_value(&serde_json::json!({"staff_id": "S2"}))
            .with_detail("改派");

        assert_eq!(log.action_type, "ReassignSlot");
        assert_eq!(log.old_value_json.unwrap()["staff_id"], "S1");
        assert_eq!(log.new_value_json.unwrap()["staff_id"], "S2");
        assert_eq!(log.detail.as_deref(), Some("改派"));
    }
}
