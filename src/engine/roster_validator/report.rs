use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// 校验规则编码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCode {
    MissingProfile,          // 无资格档案
    NightIneligible,         // 无夜班资格
    SabbathRestriction,      // 安息日限制
    MaxNightShifts,          // 夜班达到上限
    MinNightGap,             // 夜班间隔不足
    RestAfterNight,          // 夜班次日未休息
    WeekendDayIneligible,    // 无周末白班资格
    WeekendCoverage,         // 周末白班人数不足
    WeekendServerAccess,     // 周末无机房权限人员
    WeekdayNightOverstaffed, // 工作日夜班人数过多
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingSeverity {
    Error,
    Warning,
}

// ==========================================
// ValidationFinding - 单条校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub rule: RuleCode,
    pub severity: FindingSeverity,
    pub staff_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub message: String,
}

// ==========================================
// RosterValidationReport - 校验报告
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
}

impl RosterValidationReport {
    /// 汇总校验结果 (按消息去重, 保留首次出现的顺序)
    pub fn from_findings(findings: Vec<ValidationFinding>) -> Self {
        let mut seen = HashSet::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for finding in findings {
            if !seen.insert((finding.severity, finding.message.clone())) {
                continue;
            }
            match finding.severity {
                FindingSeverity::Error => errors.push(finding),
                FindingSeverity::Warning => warnings.push(finding),
            }
        }

        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn has_rule(&self, rule: RuleCode) -> bool {
        self.errors.iter().chain(self.warnings.iter()).any(|f| f.rule == rule)
    }
}
