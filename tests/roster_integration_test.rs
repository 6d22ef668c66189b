// ==========================================
// 排班表与改派集成测试
// ==========================================
// 覆盖: 每人每日唯一 / 夜班资格 / 发布锁定 / 重复发布 / 占位排班原子性 /
//       跨网点与停用人员 / 并发改派 / 权限
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod roster_integration_test {
    use super::test_helpers::*;
    use shift_roster::api::{ApiError, ErrorKind};
    use shift_roster::domain::{ScheduleStatus, ShiftType, SwapType};
    use shift_roster::engine::{ShiftEventType, SwapDraft};
    use std::sync::Arc;
    use std::thread;

    fn env() -> TestEnv {
        create_test_env(at(2024, 5, 1, 0, 0, 0)).unwrap()
    }

    // ==========================================
    // 唯一性
    // ==========================================

    #[test]
    fn test_one_assignment_per_staff_and_day() {
        let env = env();
        add_staff(&env, "S_A", true);
        let schedule = create_schedule(&env, 2024, 5);

        assign(&env, &schedule, "S_A", date(2024, 5, 13), ShiftType::Day);

        let err = env
            .state
            .schedule_api
            .assign_slot(&manager(), &schedule.schedule_id, "S_A", date(2024, 5, 13), ShiftType::Night)
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateAssignment { ref existing, .. } if existing == "DAY"));
        assert_eq!(err.kind(), ErrorKind::Constraint);

        let assignments = env
            .state
            .schedule_api
            .list_assignments(&manager(), &schedule.schedule_id)
            .unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].shift_type, ShiftType::Day);
    }

    #[test]
    fn test_assign_outside_schedule_month_rejected() {
        let env = env();
        add_staff(&env, "S_A", true);
        let schedule = create_schedule(&env, 2024, 5);

        let err = env
            .state
            .schedule_api
            .assign_slot(&manager(), &schedule.schedule_id, "S_A", date(2024, 6, 1), ShiftType::Day)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_create_or_get_schedule_is_idempotent() {
        let env = env();
        let first = create_schedule(&env, 2024, 5);
        let second = create_schedule(&env, 2024, 5);
        assert_eq!(first.schedule_id, second.schedule_id);
        assert_eq!(first.status, ScheduleStatus::Draft);

        let err = env
            .state
            .schedule_api
            .create_or_get_schedule(&manager(), BRANCH, 2024, 13)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    // ==========================================
    // 夜班资格
    // ==========================================

    #[test]
    fn test_reassign_night_to_ineligible_staff_fails() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_C", false);
        let schedule = create_schedule(&env, 2024, 5);
        let night = assign(&env, &schedule, "S_A", date(2024, 5, 14), ShiftType::Night);

        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &night.assignment_id, "S_C")
            .unwrap_err();
        assert!(matches!(err, ApiError::IneligibleForNightShift { ref staff_id, .. } if staff_id == "S_C"));
        assert!(err.is_business_rejection());

        let stored = env.state.assignment_repo.find_by_id(&night.assignment_id).unwrap().unwrap();
        assert_eq!(stored.staff_id, "S_A");
        assert_eq!(stored.revision, night.revision);
    }

    #[test]
    fn test_saturday_night_ineligible_leaves_assignment_unchanged() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_C", false);
        let schedule = create_schedule(&env, 2024, 6);
        let slot = assign(&env, &schedule, "S_A", date(2024, 6, 1), ShiftType::SaturdayNight);

        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &slot.assignment_id, "S_C")
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::IneligibleForNightShift { ref shift_type, .. } if shift_type == "SATURDAY_NIGHT"
        ));

        let assignments = env
            .state
            .schedule_api
            .list_assignments(&manager(), &schedule.schedule_id)
            .unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].staff_id, "S_A");
        assert_eq!(assignments[0].shift_type, ShiftType::SaturdayNight);
    }

    #[test]
    fn test_weekend_day_eligibility() {
        let env = env();
        add_staff(&env, "S_A", true);
        let mut input = eligibility("S_W", BRANCH, true);
        input.can_work_weekend_day = false;
        env.state.staff_api.upsert_eligibility(&manager(), &input).unwrap();
        let schedule = create_schedule(&env, 2024, 6);

        let slot = assign(&env, &schedule, "S_A", date(2024, 6, 2), ShiftType::SundayDay);
        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &slot.assignment_id, "S_W")
            .unwrap_err();
        assert!(matches!(err, ApiError::IneligibleForWeekendDay { .. }));
    }

    // ==========================================
    // 跨网点 / 停用
    // ==========================================

    #[test]
    fn test_cross_branch_and_inactive_targets_rejected() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_GONE", true);
        env.state
            .staff_api
            .upsert_eligibility(&other_manager(), &eligibility("S_X", OTHER_BRANCH, true))
            .unwrap();
        let schedule = create_schedule(&env, 2024, 5);
        let slot = assign(&env, &schedule, "S_A", date(2024, 5, 20), ShiftType::Day);

        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &slot.assignment_id, "S_X")
            .unwrap_err();
        assert!(matches!(err, ApiError::CrossBranchAssignment { ref branch_id, .. } if branch_id == BRANCH));

        // 未登记人员按跨网点处理
        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &slot.assignment_id, "S_UNKNOWN")
            .unwrap_err();
        assert!(matches!(err, ApiError::CrossBranchAssignment { .. }));

        env.state.staff_api.deactivate(&manager(), "S_GONE").unwrap();
        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &slot.assignment_id, "S_GONE")
            .unwrap_err();
        assert!(matches!(err, ApiError::InactiveStaff { .. }));

        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &slot.assignment_id, "S_A")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    // ==========================================
    // 占位排班
    // ==========================================

    #[test]
    fn test_failed_reassign_keeps_placeholder() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_B", false);
        let schedule = create_schedule(&env, 2024, 5);
        let night = assign(&env, &schedule, "S_A", date(2024, 5, 15), ShiftType::Night);
        let off = assign(&env, &schedule, "S_B", date(2024, 5, 15), ShiftType::Off);

        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &night.assignment_id, "S_B")
            .unwrap_err();
        assert!(matches!(err, ApiError::IneligibleForNightShift { .. }));

        let placeholder = env.state.assignment_repo.find_by_id(&off.assignment_id).unwrap();
        assert!(placeholder.is_some());
        assert_eq!(placeholder.unwrap().shift_type, ShiftType::Off);
    }

    #[test]
    fn test_reassign_supersedes_placeholder() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_D", true);
        let schedule = create_schedule(&env, 2024, 5);
        let night = assign(&env, &schedule, "S_A", date(2024, 5, 15), ShiftType::Night);
        let leave = assign(&env, &schedule, "S_D", date(2024, 5, 15), ShiftType::Leave);

        let updated = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &night.assignment_id, "S_D")
            .unwrap();
        assert_eq!(updated.staff_id, "S_D");
        assert_eq!(updated.revision, night.revision + 1);

        assert!(env.state.assignment_repo.find_by_id(&leave.assignment_id).unwrap().is_none());
        let on_day: Vec<_> = env
            .state
            .schedule_api
            .list_assignments(&manager(), &schedule.schedule_id)
            .unwrap()
            .into_iter()
            .filter(|a| a.staff_id == "S_D" && a.date == date(2024, 5, 15))
            .collect();
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].shift_type, ShiftType::Night);

        // 审计: 改派记录旧值与新值
        let logs = env.state.action_log_repo.find_by_entity(&night.assignment_id).unwrap();
        assert!(logs.iter().any(|l| l.action_type == "ReassignSlot"));
    }

    // ==========================================
    // 发布锁定
    // ==========================================

    #[test]
    fn test_published_schedule_rejects_mutations() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_B", true);
        let schedule = create_schedule(&env, 2024, 5);
        let slot = assign(&env, &schedule, "S_A", date(2024, 5, 16), ShiftType::Night);

        env.state
            .schedule_api
            .publish_schedule(&manager(), &schedule.schedule_id)
            .unwrap();

        let err = env
            .state
            .schedule_api
            .reassign_slot(&manager(), &slot.assignment_id, "S_B")
            .unwrap_err();
        assert!(matches!(err, ApiError::ScheduleLocked { .. }));

        let err = env
            .state
            .schedule_api
            .assign_slot(&manager(), &schedule.schedule_id, "S_B", date(2024, 5, 17), ShiftType::Day)
            .unwrap_err();
        assert!(matches!(err, ApiError::ScheduleLocked { .. }));

        let err = env
            .state
            .schedule_api
            .remove_assignment(&manager(), &slot.assignment_id)
            .unwrap_err();
        assert!(matches!(err, ApiError::ScheduleLocked { .. }));

        let err = env
            .state
            .schedule_api
            .delete_schedule(&admin(), &schedule.schedule_id)
            .unwrap_err();
        assert!(matches!(err, ApiError::ScheduleLocked { .. }));

        let err = env
            .state
            .swap_api
            .create_swap_request(
                &staff("S_A"),
                &SwapDraft {
                    initiator_staff_id: "S_A".to_string(),
                    recipient_staff_id: "S_B".to_string(),
                    assignment_id: slot.assignment_id.clone(),
                    proposed_date: None,
                    reason: "家中有事".to_string(),
                    swap_type: SwapType::GiveAway,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::ScheduleLocked { .. }));

        let stored = env.state.assignment_repo.find_by_id(&slot.assignment_id).unwrap().unwrap();
        assert_eq!(stored.staff_id, "S_A");
    }

    #[test]
    fn test_publish_twice_keeps_first_publication() {
        let env = env();
        let schedule = create_schedule(&env, 2024, 5);

        let first = env
            .state
            .schedule_api
            .publish_schedule(&manager(), &schedule.schedule_id)
            .unwrap();
        assert_eq!(first.status, ScheduleStatus::Published);
        assert_eq!(first.published_by.as_deref(), Some("MGR01"));
        assert!(first.published_at.is_some());

        let err = env
            .state
            .schedule_api
            .publish_schedule(&admin(), &schedule.schedule_id)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState { ref from, .. } if from == "PUBLISHED"));
        assert_eq!(err.kind(), ErrorKind::State);

        let stored = env
            .state
            .schedule_api
            .get_schedule(&manager(), &schedule.schedule_id)
            .unwrap();
        assert_eq!(stored.published_at, first.published_at);
        assert_eq!(stored.published_by.as_deref(), Some("MGR01"));

        let published: Vec<_> = env
            .events
            .events()
            .into_iter()
            .filter(|e| e.event_type == ShiftEventType::SchedulePublished)
            .collect();
        assert_eq!(published.len(), 1);
    }

    #[test]
    fn test_delete_draft_schedule() {
        let env = env();
        add_staff(&env, "S_A", true);
        let schedule = create_schedule(&env, 2024, 5);
        let slot = assign(&env, &schedule, "S_A", date(2024, 5, 2), ShiftType::Day);

        env.state
            .schedule_api
            .delete_schedule(&manager(), &schedule.schedule_id)
            .unwrap();

        let err = env
            .state
            .schedule_api
            .get_schedule(&manager(), &schedule.schedule_id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(env.state.assignment_repo.find_by_id(&slot.assignment_id).unwrap().is_none());
    }

    // ==========================================
    // 并发
    // ==========================================

    #[test]
    fn test_concurrent_reassign_into_same_slot() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_B", true);
        add_staff(&env, "S_C", true);
        let schedule = create_schedule(&env, 2024, 5);
        let first = assign(&env, &schedule, "S_A", date(2024, 5, 13), ShiftType::Day);
        let second = assign(&env, &schedule, "S_B", date(2024, 5, 13), ShiftType::Night);

        let handles: Vec<_> = [first.assignment_id.clone(), second.assignment_id.clone()]
            .into_iter()
            .map(|assignment_id| {
                let api = Arc::clone(&env.state.schedule_api);
                thread::spawn(move || api.reassign_slot(&manager(), &assignment_id, "S_C"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1, "恰好一个改派成功");
        let rejected = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(rejected, ApiError::DuplicateAssignment { .. }));

        let for_c = env
            .state
            .schedule_api
            .list_assignments(&manager(), &schedule.schedule_id)
            .unwrap()
            .into_iter()
            .filter(|a| a.staff_id == "S_C")
            .count();
        assert_eq!(for_c, 1);
    }

    // ==========================================
    // 权限
    // ==========================================

    #[test]
    fn test_mutations_require_branch_manager() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_B", true);
        let schedule = create_schedule(&env, 2024, 5);
        let slot = assign(&env, &schedule, "S_A", date(2024, 5, 21), ShiftType::Day);

        let err = env
            .state
            .schedule_api
            .reassign_slot(&other_manager(), &slot.assignment_id, "S_B")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = env
            .state
            .schedule_api
            .publish_schedule(&staff("S_A"), &schedule.schedule_id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        // 本网点人员可查看
        let visible = env
            .state
            .schedule_api
            .list_assignments(&staff("S_B"), &schedule.schedule_id)
            .unwrap();
        assert_eq!(visible.len(), 1);

        // 管理员不受网点限制
        env.state
            .schedule_api
            .reassign_slot(&admin(), &slot.assignment_id, "S_B")
            .unwrap();
    }

    // ==========================================
    // 校验与汇总
    // ==========================================

    #[test]
    fn test_staff_summary_and_calendar() {
        let env = env();
        add_staff(&env, "S_A", true);
        add_staff(&env, "S_IDLE", true);
        let schedule = create_schedule(&env, 2024, 5);
        assign(&env, &schedule, "S_A", date(2024, 5, 6), ShiftType::Day);
        assign(&env, &schedule, "S_A", date(2024, 5, 7), ShiftType::Night);
        assign(&env, &schedule, "S_A", date(2024, 5, 8), ShiftType::Off);

        let summary = env
            .state
            .schedule_api
            .staff_summary(&manager(), &schedule.schedule_id)
            .unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].staff_id, "S_A");
        assert_eq!(summary[0].day_shifts, 1);
        assert_eq!(summary[0].night_shifts, 1);
        assert_eq!(summary[0].off_days, 1);
        assert_eq!(summary[1].staff_id, "S_IDLE");
        assert_eq!(summary[1].night_shifts, 0);

        let holiday = env
            .state
            .schedule_api
            .add_holiday(&manager(), &schedule.schedule_id, date(2024, 5, 1), "劳动节")
            .unwrap();
        assert_eq!(
            env.state
                .schedule_api
                .list_holidays(&staff("S_A"), &schedule.schedule_id)
                .unwrap()
                .len(),
            1
        );
        env.state
            .schedule_api
            .remove_holiday(&manager(), &schedule.schedule_id, &holiday.holiday_id)
            .unwrap();
        assert!(env
            .state
            .schedule_api
            .list_holidays(&manager(), &schedule.schedule_id)
            .unwrap()
            .is_empty());

        let report = env
            .state
            .schedule_api
            .can_assign(&manager(), &schedule.schedule_id, "S_IDLE", ShiftType::Day, date(2024, 5, 9))
            .unwrap();
        assert!(report.is_valid);

        let report = env
            .state
            .schedule_api
            .can_assign(&manager(), &schedule.schedule_id, "S_NOBODY", ShiftType::Day, date(2024, 5, 9))
            .unwrap();
        assert!(!report.is_valid);
        assert!(!report.errors.is_empty());
    }
}
