use super::core::ShiftReportRepository;
use crate::domain::report::{BackupTemplate, ChecklistTemplate};
use crate::domain::types::ShiftType;
use crate::repository::error::{conversion_error, fmt_time, parse_opt_time, RepositoryResult};
use rusqlite::params;

impl ShiftReportRepository {
    // ==========================================
    // 清单模板
    // ==========================================

    /// 写入清单模板 (按 template_id 幂等)
    pub fn upsert_checklist_template(&self, template: &ChecklistTemplate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO checklist_template (
                template_id, shift_type, category, title, description, order_no,
                is_required, unlock_time, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(template_id) DO UPDATE SET
                shift_type = excluded.shift_type,
                category = excluded.category,
                title = excluded.title,
                description = excluded.description,
                order_no = excluded.order_no,
                is_required = excluded.is_required,
                unlock_time = excluded.unlock_time,
                active = excluded.active
            "#,
            params![
                template.template_id,
                template.shift_type.map(|t| t.to_db_str()),
                template.category,
                template.title,
                template.description,
                template.order_no,
                template.is_required,
                template.unlock_time.map(fmt_time),
                template.active,
            ],
        )?;
        Ok(())
    }

    /// 查询适用于某班次的有效清单模板
    ///
    /// shift_type 为空的模板适用于全部值班班次
    pub fn list_templates_for_shift(
        &self,
        shift_type: ShiftType,
    ) -> RepositoryResult<Vec<ChecklistTemplate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT template_id, shift_type, category, title, description, order_no,
                   is_required, unlock_time, active
            FROM checklist_template
            WHERE active = 1 AND (shift_type IS NULL OR shift_type = ?1)
            ORDER BY order_no, template_id
            "#,
        )?;
        let templates = stmt
            .query_map(params![shift_type.to_db_str()], map_template_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    pub fn list_checklist_templates(&self) -> RepositoryResult<Vec<ChecklistTemplate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT template_id, shift_type, category, title, description, order_no,
                   is_required, unlock_time, active
            FROM checklist_template
            ORDER BY order_no, template_id
            "#,
        )?;
        let templates = stmt
            .query_map([], map_template_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    // ==========================================
    // 备份模板
    // ==========================================

    pub fn upsert_backup_template(&self, template: &BackupTemplate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO backup_template (template_id, database_name, description, order_no, active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(template_id) DO UPDATE SET
                database_name = excluded.database_name,
                description = excluded.description,
                order_no = excluded.order_no,
                active = excluded.active
            "#,
            params![
                template.template_id,
                template.database_name,
                template.description,
                template.order_no,
                template.active,
            ],
        )?;
        Ok(())
    }

    /// 查询备份模板
    ///
    /// # 参数
    /// - active_only: 只返回有效模板
    pub fn list_backup_templates(&self, active_only: bool) -> RepositoryResult<Vec<BackupTemplate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT template_id, database_name, description, order_no, active
             FROM backup_template
             WHERE (?1 = 0 OR active = 1)
             ORDER BY order_no, template_id",
        )?;
        let templates = stmt
            .query_map(params![active_only], |row| {
                Ok(BackupTemplate {
                    template_id: row.get(0)?,
                    database_name: row.get(1)?,
                    description: row.get(2)?,
                    order_no: row.get(3)?,
                    active: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }
}

fn map_template_row(row: &rusqlite::Row) -> rusqlite::Result<ChecklistTemplate> {
    let shift_type: Option<String> = row.get(1)?;
    let shift_type = shift_type
        .map(|s| {
            ShiftType::from_db_str(&s)
                .ok_or_else(|| conversion_error(1, format!("未知班次类型: {}", s)))
        })
        .transpose()?;

    Ok(ChecklistTemplate {
        template_id: row.get(0)?,
        shift_type,
        category: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        order_no: row.get(5)?,
        is_required: row.get(6)?,
        unlock_time: parse_opt_time(7, row.get(7)?)?,
        active: row.get(8)?,
    })
}
