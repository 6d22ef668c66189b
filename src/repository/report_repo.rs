// ==========================================
// 值班排班系统 - 值班报告数据仓储
// ==========================================
// 报告 / 清单项 / 备份清单 / 问题记录 / 清单模板
// 红线: Repository 不含业务逻辑 (报告状态推导由调用方传入)
// ==========================================

mod backup_issue;
mod checklist;
mod core;
mod template;


pub use core::ShiftReportRepository;
