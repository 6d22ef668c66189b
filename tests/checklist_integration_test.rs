// ==========================================
// 值班报告与时间锁清单集成测试
// ==========================================
// 覆盖: 解锁边界 / 夜班跨日 / 网点时区覆写 / 批量部分成功 /
//       报告状态推导 / 备份与问题记录 / CSV 导出 / 配置写入权限
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod checklist_integration_test {
    use super::test_helpers::*;
    use chrono::NaiveDateTime;
    use shift_roster::api::{ApiError, ErrorKind};
    use shift_roster::config::{config_keys, ConfigScope};
    use shift_roster::domain::{
        ActionType, ChecklistItem, ChecklistStatus, ChecklistUpdate, IssueStatus, ReportStatus, ShiftReport,
        ShiftType,
    };

    /// 为 S_A 在指定日期建立排班与报告
    fn report_for(env: &TestEnv, day: chrono::NaiveDate, shift_type: ShiftType) -> ShiftReport {
        add_staff(env, "S_A", true);
        let schedule = create_schedule(env, 2024, 5);
        let slot = assign(env, &schedule, "S_A", day, shift_type);
        env.state
            .report_api
            .get_or_create_report(&staff("S_A"), &slot.assignment_id)
            .unwrap()
    }

    fn item_titled(env: &TestEnv, report_id: &str, title: &str) -> ChecklistItem {
        env.state
            .report_api
            .get_report_detail(&manager(), report_id)
            .unwrap()
            .items
            .into_iter()
            .find(|i| i.title == title)
            .unwrap()
    }

    fn complete(env: &TestEnv, item_id: &str) -> Result<ChecklistItem, ApiError> {
        env.state
            .report_api
            .set_checklist_item_status(&staff("S_A"), item_id, ChecklistStatus::Completed, None)
    }

    // ==========================================
    // 解锁边界
    // ==========================================

    #[test]
    fn test_unlock_boundary_at_six() {
        let env = create_test_env(at(2024, 5, 10, 5, 59, 59)).unwrap();
        seed_checklist_templates(&env, &[("交班检查", Some(hm(6, 0)))]);
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Day);
        let item = item_titled(&env, &report.report_id, "交班检查");

        let err = complete(&env, &item.item_id).unwrap_err();
        assert!(matches!(err, ApiError::ItemLocked { ref item_id, .. } if *item_id == item.item_id));
        assert_eq!(err.kind(), ErrorKind::State);
        let stored = item_titled(&env, &report.report_id, "交班检查");
        assert_eq!(stored.status, ChecklistStatus::Pending);
        assert!(stored.completed_at.is_none());

        env.clock.set(at(2024, 5, 10, 6, 0, 0));
        let done = complete(&env, &item.item_id).unwrap();
        assert_eq!(done.status, ChecklistStatus::Completed);
        assert_eq!(done.completed_at, Some(at(2024, 5, 10, 6, 0, 0)));
    }

    #[test]
    fn test_night_shift_early_item_rolls_to_next_day() {
        let env = create_test_env(at(2024, 5, 10, 22, 0, 0)).unwrap();
        seed_checklist_templates(&env, &[("晨间交接", Some(hm(6, 0))), ("夜间巡检", Some(hm(21, 0)))]);
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Night);

        let evening = item_titled(&env, &report.report_id, "夜间巡检");
        complete(&env, &evening.item_id).unwrap();

        let morning = item_titled(&env, &report.report_id, "晨间交接");
        let err = complete(&env, &morning.item_id).unwrap_err();
        assert!(matches!(err, ApiError::ItemLocked { .. }));

        env.clock.set(at(2024, 5, 11, 6, 0, 0));
        complete(&env, &morning.item_id).unwrap();

        let detail = env
            .state
            .report_api
            .get_report_detail(&staff("S_A"), &report.report_id)
            .unwrap();
        assert_eq!(detail.report.status, ReportStatus::Completed);
        assert!(detail.report.completed_at.is_some());
    }

    #[test]
    fn test_branch_offset_overrides_global() {
        // 全局 UTC; 网点 UTC+8
        let env = create_test_env(at(2024, 5, 9, 21, 59, 0)).unwrap();
        env.state
            .staff_api
            .set_config(
                &manager(),
                &ConfigScope::Branch { branch_id: BRANCH.to_string() },
                config_keys::UTC_OFFSET_MINUTES,
                "480",
            )
            .unwrap();
        seed_checklist_templates(&env, &[("交班检查", Some(hm(6, 0)))]);
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Day);
        let item = item_titled(&env, &report.report_id, "交班检查");

        assert!(complete(&env, &item.item_id).is_err());

        // UTC 22:00 = 网点本地 06:00
        env.clock.set(at(2024, 5, 9, 22, 0, 0));
        complete(&env, &item.item_id).unwrap();
    }

    // ==========================================
    // 批量更新
    // ==========================================

    #[test]
    fn test_batch_update_with_locked_middle_item() {
        let env = create_test_env(at(2024, 5, 10, 10, 0, 0)).unwrap();
        seed_checklist_templates(
            &env,
            &[("检查告警", None), ("日终对账", Some(hm(23, 0))), ("检查磁盘", None)],
        );
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Day);
        assert_eq!(report.status, ReportStatus::Draft);

        let ids: Vec<String> = ["检查告警", "日终对账", "检查磁盘"]
            .iter()
            .map(|t| item_titled(&env, &report.report_id, t).item_id)
            .collect();
        let updates: Vec<ChecklistUpdate> = ids
            .iter()
            .map(|id| ChecklistUpdate {
                item_id: id.clone(),
                status: ChecklistStatus::Completed,
                notes: Some("正常".to_string()),
            })
            .collect();

        let result = env
            .state
            .report_api
            .update_checklist_items(&staff("S_A"), &report.report_id, &updates)
            .unwrap();
        assert_eq!(result.updated.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].item_id, ids[1]);
        assert!(!result.errors[0].message.is_empty());

        let locked = item_titled(&env, &report.report_id, "日终对账");
        assert_eq!(locked.status, ChecklistStatus::Pending);
        assert!(locked.notes.is_none());

        let detail = env
            .state
            .report_api
            .get_report_detail(&staff("S_A"), &report.report_id)
            .unwrap();
        assert_eq!(detail.report.status, ReportStatus::InProgress);
        assert!(detail.report.started_at.is_some());
        assert_eq!(detail.stats.checklist_completed, 2);
        assert_eq!(detail.stats.checklist_pending, 1);

        // 跳过也计为已处理
        let result = env
            .state
            .report_api
            .update_checklist_items(
                &staff("S_A"),
                &report.report_id,
                &[ChecklistUpdate {
                    item_id: ids[1].clone(),
                    status: ChecklistStatus::Skipped,
                    notes: None,
                }],
            )
            .unwrap();
        assert!(result.errors.is_empty());
        let stats = env
            .state
            .report_api
            .report_stats(&staff("S_A"), &report.report_id)
            .unwrap();
        assert_eq!(stats.checklist_skipped, 1);
        let detail = env
            .state
            .report_api
            .get_report_detail(&staff("S_A"), &report.report_id)
            .unwrap();
        assert_eq!(detail.report.status, ReportStatus::Completed);

        let err = env
            .state
            .report_api
            .update_checklist_items(&staff("S_A"), &report.report_id, &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_unknown_item_reported_in_errors() {
        let env = create_test_env(at(2024, 5, 10, 10, 0, 0)).unwrap();
        seed_checklist_templates(&env, &[("检查告警", None)]);
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Day);

        let result = env
            .state
            .report_api
            .update_checklist_items(
                &manager(),
                &report.report_id,
                &[ChecklistUpdate {
                    item_id: "NO_SUCH_ITEM".to_string(),
                    status: ChecklistStatus::InProgress,
                    notes: None,
                }],
            )
            .unwrap();
        assert!(result.updated.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_repeated_item_keeps_earlier_update_when_later_locked() {
        let env = create_test_env(at(2024, 5, 10, 5, 0, 0)).unwrap();
        seed_checklist_templates(&env, &[("交班检查", Some(hm(6, 0)))]);
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Day);
        let item = item_titled(&env, &report.report_id, "交班检查");

        let result = env
            .state
            .report_api
            .update_checklist_items(
                &staff("S_A"),
                &report.report_id,
                &[
                    ChecklistUpdate {
                        item_id: item.item_id.clone(),
                        status: ChecklistStatus::InProgress,
                        notes: Some("n1".to_string()),
                    },
                    ChecklistUpdate {
                        item_id: item.item_id.clone(),
                        status: ChecklistStatus::Completed,
                        notes: None,
                    },
                ],
            )
            .unwrap();
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].item_id, item.item_id);

        let stored = item_titled(&env, &report.report_id, "交班检查");
        assert_eq!(stored.status, ChecklistStatus::InProgress);
        assert_eq!(stored.notes.as_deref(), Some("n1"));
        assert!(stored.completed_at.is_none());

        // 批量审计记录变更前后的值
        let logs = env.state.action_log_repo.find_by_entity(&item.item_id).unwrap();
        let log = logs
            .iter()
            .find(|l| l.action_type == ActionType::UpdateChecklist.as_str())
            .unwrap();
        let old = log.old_value_json.as_ref().unwrap();
        assert_eq!(old["status"], serde_json::to_value(ChecklistStatus::Pending).unwrap());
        let new = log.new_value_json.as_ref().unwrap();
        assert_eq!(new["notes"], "n1");
    }

    // ==========================================
    // 报告
    // ==========================================

    #[test]
    fn test_report_lifecycle_and_access() {
        let now: NaiveDateTime = at(2024, 5, 10, 12, 0, 0);
        let env = create_test_env(now).unwrap();
        seed_checklist_templates(&env, &[("检查告警", None)]);
        seed_backup_template(&env, "core_banking");
        add_staff(&env, "S_B", true);
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Day);

        // 重复获取返回同一报告
        let detail = env
            .state
            .report_api
            .get_report_detail(&staff("S_A"), &report.report_id)
            .unwrap();
        let again = env
            .state
            .report_api
            .get_or_create_report(&manager(), &detail.report.assignment_id)
            .unwrap();
        assert_eq!(again.report_id, report.report_id);
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.backups.len(), 1);

        // 其他人员不可操作
        let err = env
            .state
            .report_api
            .set_checklist_item_status(&staff("S_B"), &detail.items[0].item_id, ChecklistStatus::Completed, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let backup = env
            .state
            .report_api
            .set_backup_checked(&staff("S_A"), &report.report_id, &detail.backups[0].backup_id, true)
            .unwrap();
        assert!(backup.is_checked);
        assert_eq!(backup.checked_at, Some(now));

        let updated = env
            .state
            .report_api
            .update_report_notes(
                &staff("S_A"),
                &report.report_id,
                Some("一切正常".to_string()),
                Some("无遗留".to_string()),
                None,
            )
            .unwrap();
        assert_eq!(updated.summary.as_deref(), Some("一切正常"));
        assert_eq!(updated.status, ReportStatus::Draft);

        // 问题记录: 解决 / 重复解决 / 重新打开
        let issue = env
            .state
            .report_api
            .create_issue(&staff("S_A"), &report.report_id, "网关超时", None, Some("INC-1024".to_string()))
            .unwrap();
        assert_eq!(issue.status, IssueStatus::Ongoing);

        let resolved = env
            .state
            .report_api
            .resolve_issue(&staff("S_A"), &issue.issue_id, Some("重启网关".to_string()))
            .unwrap();
        assert_eq!(resolved.status, IssueStatus::Resolved);
        assert_eq!(resolved.resolved_at, Some(now));

        let err = env
            .state
            .report_api
            .resolve_issue(&staff("S_A"), &issue.issue_id, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState { ref event, .. } if event == "RESOLVE"));

        let reopened = env.state.report_api.reopen_issue(&manager(), &issue.issue_id).unwrap();
        assert_eq!(reopened.status, IssueStatus::Ongoing);
        assert!(reopened.resolved_at.is_none());
        assert_eq!(reopened.resolution.as_deref(), Some("重启网关"));

        let stats = env
            .state
            .report_api
            .report_stats(&staff("S_A"), &report.report_id)
            .unwrap();
        assert_eq!(stats.backup_checked, 1);
        assert_eq!(stats.issues_ongoing, 1);
        assert_eq!(stats.issues_resolved, 0);
    }

    #[test]
    fn test_placeholder_shift_has_no_report() {
        let env = create_test_env(at(2024, 5, 10, 12, 0, 0)).unwrap();
        add_staff(&env, "S_A", true);
        let schedule = create_schedule(&env, 2024, 5);
        let off = assign(&env, &schedule, "S_A", date(2024, 5, 11), ShiftType::Off);

        let err = env
            .state
            .report_api
            .get_or_create_report(&staff("S_A"), &off.assignment_id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_export_report_csv() {
        let env = create_test_env(at(2024, 5, 10, 7, 0, 0)).unwrap();
        seed_checklist_templates(&env, &[("检查告警", Some(hm(6, 30))), ("日终对账", Some(hm(23, 0)))]);
        let report = report_for(&env, date(2024, 5, 10), ShiftType::Day);
        let item = item_titled(&env, &report.report_id, "检查告警");
        complete(&env, &item.item_id).unwrap();

        let csv = env
            .state
            .report_api
            .export_report_csv(&staff("S_A"), &report.report_id)
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "category,title,unlock_time,status,completed_at,notes");
        assert_eq!(lines.len(), 3);
        assert!(csv.contains("检查告警,06:30,COMPLETED,2024-05-10 07:00:00"));
        assert!(csv.contains("日终对账,23:00,PENDING"));
    }

    // ==========================================
    // 配置写入
    // ==========================================

    #[test]
    fn test_config_write_rules() {
        let env = create_test_env(at(2024, 5, 10, 12, 0, 0)).unwrap();
        let branch = ConfigScope::Branch { branch_id: BRANCH.to_string() };

        let err = env
            .state
            .staff_api
            .set_config(&manager(), &ConfigScope::Global, config_keys::UTC_OFFSET_MINUTES, "60")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = env
            .state
            .staff_api
            .set_config(&other_manager(), &branch, config_keys::UTC_OFFSET_MINUTES, "60")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = env
            .state
            .staff_api
            .set_config(&manager(), &branch, config_keys::UTC_OFFSET_MINUTES, "east")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = env
            .state
            .staff_api
            .set_config(&manager(), &branch, config_keys::LOCALE, "id")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = env
            .state
            .staff_api
            .set_config(&admin(), &ConfigScope::Global, "ui.theme", "dark")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        env.state
            .staff_api
            .set_config(&admin(), &ConfigScope::Global, config_keys::LOCALE, "id")
            .unwrap();
        let snapshot = env.state.staff_api.config_snapshot(&manager()).unwrap();
        assert!(snapshot.contains("ui.locale"));
    }
}
