// ==========================================
// 值班排班系统 - 应用状态
// ==========================================
// 职责: 按数据库路径装配仓储/引擎/API
// 并发: 所有仓储共享同一连接句柄
// ==========================================

use std::sync::Arc;

use crate::api::{ReportApi, ScheduleApi, StaffApi, SwapApi};
use crate::config::{ConfigManager, RosterConfigReader};
use crate::engine::audit::AuditRecorder;
use crate::engine::checklist::ChecklistEngine;
use crate::engine::events::ShiftEventPublisher;
use crate::engine::mutation::AssignmentMutationEngine;
use crate::engine::swap::SwapNegotiationEngine;
use crate::engine::time_lock::{Clock, SystemClock};
use crate::repository::{
    ActionLogRepository, AssignmentRepository, CalendarRepository, ScheduleRepository,
    ShiftReportRepository, StaffRepository, SwapRequestRepository,
};

/// 应用状态
///
/// 包含所有 API 实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub staff_api: Arc<StaffApi>,
    pub schedule_api: Arc<ScheduleApi>,
    pub swap_api: Arc<SwapApi>,
    pub report_api: Arc<ReportApi>,

    /// 配置管理器 (网点级覆写)
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储 (审计查询)
    pub action_log_repo: Arc<ActionLogRepository>,

    pub assignment_repo: Arc<AssignmentRepository>,
    pub report_repo: Arc<ShiftReportRepository>,
    pub swap_repo: Arc<SwapRequestRepository>,
}

impl AppState {
    /// 创建新的 AppState 实例 (系统时钟, 无事件发布者)
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_options(db_path, Arc::new(SystemClock), None)
    }

    /// 指定时钟与事件发布者
    ///
    /// # 说明
    /// 1. 打开共享连接并初始化 schema
    /// 2. 初始化所有 Repository
    /// 3. 初始化引擎
    /// 4. 创建所有 API 实例
    pub fn with_options(
        db_path: String,
        clock: Arc<dyn Clock>,
        event_publisher: Option<Arc<dyn ShiftEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_shared_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        {
            let guard = conn.lock().map_err(|e| format!("数据库锁获取失败: {}", e))?;
            crate::db::init_schema(&guard).map_err(|e| format!("schema 初始化失败: {}", e))?;
        }

        // ==========================================
        // Repository 层
        // ==========================================
        let staff_repo = Arc::new(StaffRepository::new(conn.clone()));
        let schedule_repo = Arc::new(ScheduleRepository::new(conn.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::new(conn.clone()));
        let calendar_repo = Arc::new(CalendarRepository::new(conn.clone()));
        let swap_repo = Arc::new(SwapRequestRepository::new(conn.clone()));
        let report_repo = Arc::new(ShiftReportRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config_reader: Arc<dyn RosterConfigReader> = config_manager.clone();

        // ==========================================
        // Engine 层
        // ==========================================
        let audit = AuditRecorder::new(action_log_repo.clone());
        let mutation = Arc::new(AssignmentMutationEngine::new(
            schedule_repo.clone(),
            assignment_repo.clone(),
            staff_repo.clone(),
            config_reader.clone(),
        ));
        let swap_engine = Arc::new(SwapNegotiationEngine::new(
            swap_repo.clone(),
            assignment_repo.clone(),
            staff_repo.clone(),
            mutation.clone(),
        ));
        let checklist = Arc::new(ChecklistEngine::new(
            report_repo.clone(),
            assignment_repo.clone(),
            schedule_repo.clone(),
            config_reader,
            clock.clone(),
        ));

        // ==========================================
        // API 层
        // ==========================================
        let staff_api = Arc::new(StaffApi::new(
            staff_repo.clone(),
            config_manager.clone(),
            audit.clone(),
        ));
        let schedule_api = Arc::new(ScheduleApi::new(
            schedule_repo.clone(),
            assignment_repo.clone(),
            calendar_repo,
            staff_repo,
            mutation.clone(),
            audit.clone(),
            event_publisher.clone(),
        ));
        let swap_api = Arc::new(SwapApi::new(
            swap_repo.clone(),
            swap_engine,
            mutation,
            audit.clone(),
            event_publisher,
        ));
        let report_api = Arc::new(ReportApi::new(
            report_repo.clone(),
            assignment_repo.clone(),
            schedule_repo,
            checklist,
            clock,
            audit,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            staff_api,
            schedule_api,
            swap_api,
            report_api,
            config_manager,
            action_log_repo,
            assignment_repo,
            report_repo,
            swap_repo,
        })
    }
}

/// 默认数据库路径
///
/// 优先使用 SHIFT_ROSTER_DB_PATH, 否则为用户数据目录下 shift-roster/roster.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("SHIFT_ROSTER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./roster.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("shift-roster");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("roster.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_state_bootstraps_schema() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let state = AppState::new(path.clone()).unwrap();
        assert_eq!(state.db_path, path);
        assert!(state.staff_api.list_branches().unwrap().is_empty());

        // 重复打开同一数据库 (schema 幂等)
        assert!(AppState::new(path).is_ok());
    }
}
