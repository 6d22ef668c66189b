// ==========================================
// 值班排班系统 - 操作日志数据仓储
// ==========================================
// 红线: 每次成功的写操作都必须记录
// 内容: (actor, action, entity_id, old_value?, new_value)
// ==========================================


mod core;
mod queries;


pub use core::ActionLogRepository;
