// ==========================================
// 值班排班系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 作用域: branch/{branch_id} 覆盖 global, 都不存在时使用内置默认值
// ==========================================

use crate::config::roster_config_trait::RosterConfigReader;
use crate::db::{open_sqlite_connection, TIME_FMT};
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取指定作用域的配置值
    fn get_scoped_value(&self, scope_id: &str, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope_id, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_scoped_value(ConfigScope::Global.scope_id().as_str(), key)
    }

    /// 读取网点配置值（网点作用域优先，其次 global）
    pub fn get_branch_config_value(
        &self,
        branch_id: &str,
        key: &str,
    ) -> Result<Option<String>, Box<dyn Error>> {
        let branch_scope = ConfigScope::Branch {
            branch_id: branch_id.to_string(),
        };
        match self.get_scoped_value(&branch_scope.scope_id(), key)? {
            Some(v) => Ok(Some(v)),
            None => self.get_global_config_value(key),
        }
    }

    /// 从 global 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_global_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值 (UPSERT)
    pub fn set_value(&self, scope: &ConfigScope, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![scope.scope_id(), key, value],
        )?;

        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

impl RosterConfigReader for ConfigManager {
    fn get_utc_offset_minutes(&self, branch_id: &str) -> Result<i32, Box<dyn Error>> {
        let value = self
            .get_branch_config_value(branch_id, config_keys::UTC_OFFSET_MINUTES)?
            .unwrap_or_else(|| "480".to_string());
        let minutes = value.trim().parse::<i32>().unwrap_or(480);
        // 合法范围: UTC-12 ~ UTC+14
        if !(-720..=840).contains(&minutes) {
            tracing::warn!("utc_offset_minutes 越界: {}, 使用默认值 480", minutes);
            return Ok(480);
        }
        Ok(minutes)
    }

    fn get_night_rollover_before(&self, branch_id: &str) -> Result<NaiveTime, Box<dyn Error>> {
        let value = self
            .get_branch_config_value(branch_id, config_keys::NIGHT_ROLLOVER_BEFORE)?
            .unwrap_or_else(|| "08:00".to_string());
        Ok(NaiveTime::parse_from_str(value.trim(), TIME_FMT)
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()))
    }

    fn get_reassign_max_retries(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::REASSIGN_MAX_RETRIES, "3")?;
        Ok(value.trim().parse::<u32>().unwrap_or(3))
    }

    fn get_default_max_night_shifts(&self) -> Result<i32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_MAX_NIGHT_SHIFTS, "5")?;
        Ok(value.trim().parse::<i32>().unwrap_or(5))
    }

    fn get_default_min_days_between_nights(&self) -> Result<i32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_MIN_DAYS_BETWEEN_NIGHTS, "3")?;
        Ok(value.trim().parse::<i32>().unwrap_or(3))
    }

    fn get_locale(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::LOCALE, "en")
    }
}

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone)]
pub enum ConfigScope {
    Global,                        // 全局
    Branch { branch_id: String },  // 网点
}

impl ConfigScope {
    /// config_kv.scope_id 取值
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Branch { branch_id } => format!("branch/{}", branch_id),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 时间锁
    pub const UTC_OFFSET_MINUTES: &str = "roster.utc_offset_minutes";
    pub const NIGHT_ROLLOVER_BEFORE: &str = "checklist.night_rollover_before";

    // 并发
    pub const REASSIGN_MAX_RETRIES: &str = "roster.reassign_max_retries";

    // 资格档案默认值
    pub const DEFAULT_MAX_NIGHT_SHIFTS: &str = "roster.default_max_night_shifts";
    pub const DEFAULT_MIN_DAYS_BETWEEN_NIGHTS: &str = "roster.default_min_days_between_nights";

    // 界面
    pub const LOCALE: &str = "ui.locale";
}
