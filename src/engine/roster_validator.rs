// ==========================================
// 值班排班系统 - 排班合规校验
// ==========================================
// 红线: 校验结果为建议性, 不阻断写入 (写入约束见 EligibilityCore)
// ==========================================
// 规则:
//   - 夜班资格 / 安息日限制 (周五/周六无夜班)      → error
//   - 夜班最小间隔                                 → error
//   - 周末白班资格                                 → error
//   - 每月夜班上限 / 夜班次日应休息                 → warning
//   - 周末白班需 2 人且至少 1 人具备机房权限        → warning
//   - 工作日夜班至多 1 人                           → warning
// ==========================================

mod core;
mod report;


pub use core::RosterValidator;
pub use report::{FindingSeverity, RosterValidationReport, RuleCode, ValidationFinding};
