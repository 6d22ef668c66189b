// ==========================================
// 值班排班系统 - 网点与人员资格数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 资格档案只停用不删除 (不提供 delete)
// ==========================================

use crate::domain::staff::{Branch, StaffEligibility};
use crate::repository::error::{
    fmt_datetime, parse_datetime, RepositoryError, RepositoryResult,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const ELIGIBILITY_COLUMNS: &str = r#"
    staff_id, branch_id, can_work_night, can_work_weekend_day, has_server_access,
    has_sabbath_restriction, max_night_shifts_per_month, min_days_between_night_shifts,
    active, updated_by, updated_at
"#;

// ==========================================
// StaffRepository - 网点/资格仓储
// ==========================================
pub struct StaffRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StaffRepository {
    /// 创建新的StaffRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 网点
    // ==========================================

    /// 登记网点
    pub fn insert_branch(&self, branch: &Branch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO branch (branch_id, name, code, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                branch.branch_id,
                branch.name,
                branch.code,
                fmt_datetime(branch.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_branch(&self, branch_id: &str) -> RepositoryResult<Option<Branch>> {
        let conn = self.get_conn()?;
        let branch = conn
            .query_row(
                "SELECT branch_id, name, code, created_at FROM branch WHERE branch_id = ?1",
                params![branch_id],
                |row| {
                    let created_at: String = row.get(3)?;
                    Ok(Branch {
                        branch_id: row.get(0)?,
                        name: row.get(1)?,
                        code: row.get(2)?,
                        created_at: parse_datetime(3, &created_at)?,
                    })
                },
            )
            .optional()?;
        Ok(branch)
    }

    pub fn list_branches(&self) -> RepositoryResult<Vec<Branch>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT branch_id, name, code, created_at FROM branch ORDER BY code")?;
        let branches = stmt
            .query_map([], |row| {
                let created_at: String = row.get(3)?;
                Ok(Branch {
                    branch_id: row.get(0)?,
                    name: row.get(1)?,
                    code: row.get(2)?,
                    created_at: parse_datetime(3, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(branches)
    }

    // ==========================================
    // 人员资格
    // ==========================================

    /// 写入资格档案 (按 staff_id 幂等)
    pub fn upsert_eligibility(&self, profile: &StaffEligibility) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO staff_eligibility (
                staff_id, branch_id, can_work_night, can_work_weekend_day, has_server_access,
                has_sabbath_restriction, max_night_shifts_per_month, min_days_between_night_shifts,
                active, updated_by, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(staff_id) DO UPDATE SET
                branch_id = excluded.branch_id,
                can_work_night = excluded.can_work_night,
                can_work_weekend_day = excluded.can_work_weekend_day,
                has_server_access = excluded.has_server_access,
                has_sabbath_restriction = excluded.has_sabbath_restriction,
                max_night_shifts_per_month = excluded.max_night_shifts_per_month,
                min_days_between_night_shifts = excluded.min_days_between_night_shifts,
                active = excluded.active,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
            params![
                profile.staff_id,
                profile.branch_id,
                profile.can_work_night,
                profile.can_work_weekend_day,
                profile.has_server_access,
                profile.has_sabbath_restriction,
                profile.max_night_shifts_per_month,
                profile.min_days_between_night_shifts,
                profile.active,
                profile.updated_by,
                fmt_datetime(profile.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_eligibility(&self, staff_id: &str) -> RepositoryResult<Option<StaffEligibility>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM staff_eligibility WHERE staff_id = ?1",
            ELIGIBILITY_COLUMNS
        );
        let profile = conn
            .query_row(&sql, params![staff_id], map_eligibility_row)
            .optional()?;
        Ok(profile)
    }

    /// 查询网点人员资格
    ///
    /// # 参数
    /// - include_inactive: 是否包含已停用人员
    pub fn list_by_branch(
        &self,
        branch_id: &str,
        include_inactive: bool,
    ) -> RepositoryResult<Vec<StaffEligibility>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM staff_eligibility
             WHERE branch_id = ?1 AND (?2 = 1 OR active = 1)
             ORDER BY staff_id",
            ELIGIBILITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let profiles = stmt
            .query_map(params![branch_id, include_inactive], map_eligibility_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(profiles)
    }

    /// 设置在岗状态
    ///
    /// # 返回
    /// - Err(NotFound): 档案不存在
    pub fn set_active(
        &self,
        staff_id: &str,
        active: bool,
        updated_by: &str,
        updated_at: chrono::NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE staff_eligibility SET active = ?1, updated_by = ?2, updated_at = ?3
             WHERE staff_id = ?4",
            params![active, updated_by, fmt_datetime(updated_at), staff_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "StaffEligibility".to_string(),
                id: staff_id.to_string(),
            });
        }
        Ok(())
    }
}

fn map_eligibility_row(row: &rusqlite::Row) -> rusqlite::Result<StaffEligibility> {
    let updated_at: String = row.get(10)?;
    Ok(StaffEligibility {
        staff_id: row.get(0)?,
        branch_id: row.get(1)?,
        can_work_night: row.get(2)?,
        can_work_weekend_day: row.get(3)?,
        has_server_access: row.get(4)?,
        has_sabbath_restriction: row.get(5)?,
        max_night_shifts_per_month: row.get(6)?,
        min_days_between_night_shifts: row.get(7)?,
        active: row.get(8)?,
        updated_by: row.get(9)?,
        updated_at: parse_datetime(10, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn setup() -> StaffRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        StaffRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn branch(id: &str) -> Branch {
        Branch {
            branch_id: id.to_string(),
            name: format!("Branch {}", id),
            code: id.to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn profile(staff_id: &str, branch_id: &str) -> StaffEligibility {
        StaffEligibility {
            staff_id: staff_id.to_string(),
            branch_id: branch_id.to_string(),
            can_work_night: true,
            can_work_weekend_day: false,
            has_server_access: false,
            has_sabbath_restriction: false,
            max_night_shifts_per_month: 5,
            min_days_between_night_shifts: 3,
            active: true,
            updated_by: Some("admin".to_string()),
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_upsert_is_idempotent_on_staff_id() {
        let repo = setup();
        repo.insert_branch(&branch("BR01")).unwrap();

        let mut p = profile("S1", "BR01");
        repo.upsert_eligibility(&p).unwrap();
        p.can_work_night = false;
        p.max_night_shifts_per_month = 2;
        repo.upsert_eligibility(&p).unwrap();

        let found = repo.find_eligibility("S1").unwrap().unwrap();
        assert!(!found.can_work_night);
        assert_eq!(found.max_night_shifts_per_month, 2);
        assert_eq!(repo.list_by_branch("BR01", true).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_branch_is_rejected_by_foreign_key() {
        let repo = setup();
        let err = repo.upsert_eligibility(&profile("S1", "NOPE")).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }

    #[test]
    fn test_deactivate_hides_from_default_listing() {
        let repo = setup();
        repo.insert_branch(&branch("BR01")).unwrap();
        repo.upsert_eligibility(&profile("S1", "BR01")).unwrap();
        repo.upsert_eligibility(&profile("S2", "BR01")).unwrap();

        repo.set_active("S2", false, "admin", Utc::now().naive_utc()).unwrap();

        assert_eq!(repo.list_by_branch("BR01", false).unwrap().len(), 1);
        assert_eq!(repo.list_by_branch("BR01", true).unwrap().len(), 2);
        assert!(!repo.find_eligibility("S2").unwrap().unwrap().active);

        let err = repo.set_active("S9", false, "admin", Utc::now().naive_utc()).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
