// ==========================================
// 值班排班系统 - 核心库
// ==========================================
// 范围: 人员资格 / 月度排班 / 改派 / 换班协商 / 时间锁清单 / 值班报告
// 技术栈: Rust + SQLite
// 传输层 (HTTP/CLI)、认证、通知投递由外部协作方提供
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ChecklistStatus, IssueStatus, ReportStatus, ScheduleStatus, ShiftType, SwapStatus, SwapType,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Actor, Assignment, Role, Schedule, ShiftReport, StaffEligibility,
    SwapRequest,
};

// 引擎
pub use engine::{
    AssignmentMutationEngine, ChecklistEngine, RosterError, RosterValidator, ShiftEventPublisher,
    SwapNegotiationEngine, TimeLockPolicy,
};

// API
pub use api::{ApiError, ApiResult, ErrorKind, ReportApi, ScheduleApi, StaffApi, SwapApi};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "值班排班系统";
