// ==========================================
// 值班排班系统 - 审计日志出口
// ==========================================
// 每次成功写操作之后记录 (actor, action, entity_id, old?, new)
// 审计写入失败只记录 error 日志, 不回滚已提交的业务变更
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryResult;
use std::sync::Arc;

/// 审计日志接收端
pub trait AuditSink: Send + Sync {
    fn record(&self, log: &ActionLog) -> RepositoryResult<()>;
}

impl AuditSink for ActionLogRepository {
    fn record(&self, log: &ActionLog) -> RepositoryResult<()> {
        self.insert(log).map(|_| ())
    }
}

/// 审计记录器
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// 写入审计日志
    pub fn record(&self, log: ActionLog) {
        if let Err(e) = self.sink.record(&log) {
            tracing::error!(
                action_type = %log.action_type,
                entity_id = %log.entity_id,
                actor = %log.actor,
                "审计日志写入失败: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_log::ActionType;
    use crate::repository::error::RepositoryError;
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn record(&self, _log: &ActionLog) -> RepositoryResult<()> {
            Err(RepositoryError::LockError("poisoned".to_string()))
        }
    }

    #[test]
    fn test_recorder_writes_through_repository() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repo = Arc::new(ActionLogRepository::new(Arc::new(Mutex::new(conn))));

        let recorder = AuditRecorder::new(repo.clone());
        recorder.record(ActionLog::new(ActionType::PublishSchedule, "m1", "Schedule", "SCH1"));

        assert_eq!(repo.find_by_entity("SCH1").unwrap().len(), 1);
    }

    #[test]
    fn test_recorder_tolerates_sink_failure() {
        let recorder = AuditRecorder::new(Arc::new(BrokenSink));
        recorder.record(ActionLog::new(ActionType::AssignSlot, "m1", "Assignment", "A1"));
    }
}
