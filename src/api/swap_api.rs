// ==========================================
// 值班排班系统 - 换班 API
// ==========================================
// 职责: 换班申请的发起、答复、生效、撤销与查询
// 权限:
// - 发起: 仅发起人本人
// - 答复: 仅接收人
// - 生效: 本网点 MANAGER / ADMIN
// - 撤销: 发起人或本网点 MANAGER / ADMIN
// 事件: 各状态变更提交后发布 ShiftEvent
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::error::{logged, ApiError, ApiResult};
use crate::api::validator::{
    require_branch_manager, require_non_empty, validate_max_len, validate_opt_text, MAX_TEXT_LEN,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::actor::Actor;
use crate::domain::swap::SwapRequest;
use crate::domain::types::SwapStatus;
use crate::engine::audit::AuditRecorder;
use crate::engine::events::{
    OptionalEventPublisher, ShiftEvent, ShiftEventPublisher, ShiftEventType,
};
use crate::engine::mutation::AssignmentMutationEngine;
use crate::engine::swap::{SwapApplyOutcome, SwapDraft, SwapNegotiationEngine};
use crate::repository::swap_repo::SwapRequestRepository;

// ==========================================
// SwapApi - 换班 API
// ==========================================
pub struct SwapApi {
    swap_repo: Arc<SwapRequestRepository>,
    swap_engine: Arc<SwapNegotiationEngine>,
    mutation: Arc<AssignmentMutationEngine>,
    audit: AuditRecorder,
    event_publisher: OptionalEventPublisher,
}

impl SwapApi {
    pub fn new(
        swap_repo: Arc<SwapRequestRepository>,
        swap_engine: Arc<SwapNegotiationEngine>,
        mutation: Arc<AssignmentMutationEngine>,
        audit: AuditRecorder,
        event_publisher: Option<Arc<dyn ShiftEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            swap_repo,
            swap_engine,
            mutation,
            audit,
            event_publisher,
        }
    }

    /// 申请所属排班表的网点
    fn branch_of(&self, request: &SwapRequest) -> ApiResult<String> {
        Ok(self.mutation.load_schedule(&request.schedule_id)?.branch_id)
    }

    // ==========================================
    // 发起
    // ==========================================

    /// 发起换班
    ///
    /// # 返回
    /// - Err(Forbidden): 操作人不是发起人本人
    /// - Err(NotOwner): 发起人当前不持有该排班
    /// - Err(ScheduleLocked): 排班表已发布
    pub fn create_swap_request(&self, actor: &Actor, draft: &SwapDraft) -> ApiResult<SwapRequest> {
        logged("create_swap_request", &actor.actor_id, || {
            require_non_empty("initiator_staff_id", &draft.initiator_staff_id)?;
            require_non_empty("recipient_staff_id", &draft.recipient_staff_id)?;
            require_non_empty("assignment_id", &draft.assignment_id)?;
            require_non_empty("reason", &draft.reason)?;
            validate_max_len("reason", &draft.reason, MAX_TEXT_LEN)?;

            if actor.actor_id != draft.initiator_staff_id {
                return Err(ApiError::forbidden(&actor.actor_id, "create_swap_request"));
            }

            let request = self.swap_engine.create(draft)?;

            self.audit.record(
                ActionLog::new(ActionType::CreateSwap, &actor.actor_id, "SwapRequest", &request.request_id)
                    .with_new_value(&request),
            );
            self.event_publisher.publish(
                ShiftEvent::new(
                    ShiftEventType::SwapRequested,
                    request.schedule_id.as_str(),
                    request.request_id.as_str(),
                    actor.actor_id.as_str(),
                )
                .notify(request.recipient_staff_id.as_str()),
            );
            info!(
                actor = %actor.actor_id,
                request_id = %request.request_id,
                recipient = %request.recipient_staff_id,
                "换班申请已发起"
            );
            Ok(request)
        })
    }

    // ==========================================
    // 接收人答复
    // ==========================================

    /// 接收人同意/拒绝
    ///
    /// # 返回
    /// - Err(Forbidden): 操作人不是接收人
    /// - Err(InvalidState): 申请不处于 PENDING_RECIPIENT
    pub fn decide_swap(
        &self,
        actor: &Actor,
        request_id: &str,
        accept: bool,
        response: Option<String>,
    ) -> ApiResult<SwapRequest> {
        logged("decide_swap", &actor.actor_id, || {
            validate_opt_text("response", response.as_deref())?;
            let before = self.swap_engine.load(request_id)?;
            if actor.actor_id != before.recipient_staff_id {
                return Err(ApiError::forbidden(&actor.actor_id, "decide_swap"));
            }

            let decided = self.swap_engine.decide(request_id, accept, response)?;

            self.audit.record(
                ActionLog::new(ActionType::DecideSwap, &actor.actor_id, "SwapRequest", request_id)
                    .with_old_value(&before)
                    .with_new_value(&decided),
            );
            self.event_publisher.publish(
                ShiftEvent::new(
                    ShiftEventType::SwapDecided,
                    decided.schedule_id.as_str(),
                    request_id,
                    actor.actor_id.as_str(),
                )
                .notify(decided.initiator_staff_id.as_str()),
            );
            info!(actor = %actor.actor_id, request_id = %request_id, status = %decided.status, "换班申请已答复");
            Ok(decided)
        })
    }

    // ==========================================
    // 生效
    // ==========================================

    /// 换班生效 (经理/管理员)
    ///
    /// 重新执行完整改派校验, 改派与状态变更同事务提交
    pub fn apply_swap(
        &self,
        actor: &Actor,
        request_id: &str,
        manager_notes: Option<String>,
    ) -> ApiResult<SwapApplyOutcome> {
        logged("apply_swap", &actor.actor_id, || {
            validate_opt_text("manager_notes", manager_notes.as_deref())?;
            let before = self.swap_engine.load(request_id)?;
            let branch_id = self.branch_of(&before)?;
            require_branch_manager(actor, &branch_id, "apply_swap")?;

            let outcome = self
                .swap_engine
                .apply(request_id, &actor.actor_id, manager_notes)?;

            self.audit.record(
                ActionLog::new(ActionType::ApplySwap, &actor.actor_id, "SwapRequest", request_id)
                    .with_old_value(&before)
                    .with_new_value(&outcome.request),
            );
            for assignment in &outcome.assignments {
                self.audit.record(
                    ActionLog::new(ActionType::ReassignSlot, &actor.actor_id, "Assignment", &assignment.assignment_id)
                        .with_new_value(assignment)
                        .with_detail(format!("swap_request={}", request_id)),
                );
            }
            self.event_publisher.publish(
                ShiftEvent::new(
                    ShiftEventType::SwapApplied,
                    outcome.request.schedule_id.as_str(),
                    request_id,
                    actor.actor_id.as_str(),
                )
                .notify(outcome.request.initiator_staff_id.as_str())
                .notify(outcome.request.recipient_staff_id.as_str()),
            );
            info!(
                actor = %actor.actor_id,
                request_id = %request_id,
                moved = outcome.assignments.len(),
                "换班已生效"
            );
            Ok(outcome)
        })
    }

    // ==========================================
    // 撤销
    // ==========================================

    /// 撤销换班 (发起人或经理/管理员; 任一非终态)
    pub fn cancel_swap(&self, actor: &Actor, request_id: &str) -> ApiResult<SwapRequest> {
        logged("cancel_swap", &actor.actor_id, || {
            let before = self.swap_engine.load(request_id)?;
            if actor.actor_id != before.initiator_staff_id {
                let branch_id = self.branch_of(&before)?;
                require_branch_manager(actor, &branch_id, "cancel_swap")?;
            }

            let cancelled = self.swap_engine.cancel(request_id, &actor.actor_id)?;

            self.audit.record(
                ActionLog::new(ActionType::CancelSwap, &actor.actor_id, "SwapRequest", request_id)
                    .with_old_value(&before)
                    .with_new_value(&cancelled),
            );
            let mut event = ShiftEvent::new(
                ShiftEventType::SwapCancelled,
                cancelled.schedule_id.as_str(),
                request_id,
                actor.actor_id.as_str(),
            )
            .notify(cancelled.recipient_staff_id.as_str());
            if actor.actor_id != cancelled.initiator_staff_id {
                event = event.notify(cancelled.initiator_staff_id.as_str());
            }
            self.event_publisher.publish(event);

            info!(actor = %actor.actor_id, request_id = %request_id, "换班申请已撤销");
            Ok(cancelled)
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询单个申请 (发起人、接收人或网点管理者)
    pub fn get_swap_request(&self, actor: &Actor, request_id: &str) -> ApiResult<SwapRequest> {
        logged("get_swap_request", &actor.actor_id, || {
            let request = self.swap_engine.load(request_id)?;
            if actor.actor_id != request.initiator_staff_id
                && actor.actor_id != request.recipient_staff_id
            {
                let branch_id = self.branch_of(&request)?;
                require_branch_manager(actor, &branch_id, "get_swap_request")?;
            }
            Ok(request)
        })
    }

    /// 按排班表 (可选状态) 查询 (网点管理者)
    pub fn list_swap_requests(
        &self,
        actor: &Actor,
        schedule_id: &str,
        status: Option<SwapStatus>,
    ) -> ApiResult<Vec<SwapRequest>> {
        logged("list_swap_requests", &actor.actor_id, || {
            let schedule = self.mutation.load_schedule(schedule_id)?;
            require_branch_manager(actor, &schedule.branch_id, "list_swap_requests")?;
            Ok(self.swap_repo.list_by_schedule(schedule_id, status)?)
        })
    }

    /// 本人相关的申请 (发起或接收)
    pub fn list_my_swap_requests(&self, actor: &Actor) -> ApiResult<Vec<SwapRequest>> {
        Ok(self.swap_repo.list_by_staff(&actor.actor_id)?)
    }
}
