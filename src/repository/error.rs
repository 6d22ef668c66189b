// ==========================================
// 值班排班系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 并发控制错误 =====
    #[error("乐观锁冲突: {entity}({id}) expected_revision={expected}, actual_revision={actual}")]
    OptimisticLockFailure {
        entity: String,
        id: String,
        expected: i32,
        actual: i32,
    },

    // 事务内复核: 排班表在读取与写入之间已被发布
    #[error("排班表已发布: schedule_id={schedule_id}")]
    ScheduleLocked { schedule_id: String },

    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },
}

impl RepositoryError {
    /// 是否为可重试的并发冲突
    ///
    /// 乐观锁失败与唯一约束冲突都意味着读取后数据已被他人改写
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            RepositoryError::OptimisticLockFailure { .. }
                | RepositoryError::UniqueConstraintViolation(_)
        )
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

// ==========================================
// 行映射辅助函数
// ==========================================
// 数据库以 TEXT 存储日期/时间/枚举, 解析失败统一转为 FromSqlConversionFailure

pub(crate) fn conversion_error(
    idx: usize,
    message: impl Into<String>,
) -> rusqlite::Error {
    let message: String = message.into();
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

pub(crate) fn parse_date(idx: usize, s: &str) -> rusqlite::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, crate::db::DATE_FMT)
        .map_err(|e| conversion_error(idx, format!("日期格式错误 {}: {}", s, e)))
}

pub(crate) fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s, crate::db::DATETIME_FMT)
        .map_err(|e| conversion_error(idx, format!("时间格式错误 {}: {}", s, e)))
}

pub(crate) fn parse_opt_datetime(
    idx: usize,
    s: Option<String>,
) -> rusqlite::Result<Option<chrono::NaiveDateTime>> {
    s.map(|v| parse_datetime(idx, &v)).transpose()
}

pub(crate) fn parse_opt_time(
    idx: usize,
    s: Option<String>,
) -> rusqlite::Result<Option<chrono::NaiveTime>> {
    s.map(|v| {
        chrono::NaiveTime::parse_from_str(&v, crate::db::TIME_FMT)
            .map_err(|e| conversion_error(idx, format!("时刻格式错误 {}: {}", v, e)))
    })
    .transpose()
}

pub(crate) fn fmt_date(d: chrono::NaiveDate) -> String {
    d.format(crate::db::DATE_FMT).to_string()
}

pub(crate) fn fmt_datetime(dt: chrono::NaiveDateTime) -> String {
    dt.format(crate::db::DATETIME_FMT).to_string()
}

pub(crate) fn fmt_time(t: chrono::NaiveTime) -> String {
    t.format(crate::db::TIME_FMT).to_string()
}
