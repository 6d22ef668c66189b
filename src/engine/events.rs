// ==========================================
// 值班排班系统 - 引擎层事件发布
// ==========================================
// 职责: 定义值班事件发布 trait (通知投递由外部实现)
// 时机: 事务提交之后发布, 发布失败不回滚业务变更
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 值班事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftEventType {
    /// 发起换班 (通知接收人)
    SwapRequested,
    /// 接收人已答复 (通知发起人)
    SwapDecided,
    /// 换班已生效
    SwapApplied,
    /// 换班已撤销
    SwapCancelled,
    /// 排班表已发布
    SchedulePublished,
}

impl ShiftEventType {
    pub fn as_str(&self) -> &str {
        match self {
            ShiftEventType::SwapRequested => "SwapRequested",
            ShiftEventType::SwapDecided => "SwapDecided",
            ShiftEventType::SwapApplied => "SwapApplied",
            ShiftEventType::SwapCancelled => "SwapCancelled",
            ShiftEventType::SchedulePublished => "SchedulePublished",
        }
    }
}

/// 值班事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftEvent {
    /// 事件类型
    pub event_type: ShiftEventType,
    /// 所属排班表
    pub schedule_id: String,
    /// 事件主体 (换班申请ID / 排班表ID)
    pub entity_id: String,
    /// 触发人
    pub actor: String,
    /// 需要通知的人员
    pub recipients: Vec<String>,
}

impl ShiftEvent {
    pub fn new(
        event_type: ShiftEventType,
        schedule_id: impl Into<String>,
        entity_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            schedule_id: schedule_id.into(),
            entity_id: entity_id.into(),
            actor: actor.into(),
            recipients: Vec::new(),
        }
    }

    pub fn notify(mut self, staff_id: impl Into<String>) -> Self {
        self.recipients.push(staff_id.into());
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 值班事件发布者
///
/// # 返回
/// - `Ok(message_id)`: 投递ID (不支持时为空字符串)
pub trait ShiftEventPublisher: Send + Sync {
    fn publish(&self, event: ShiftEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者 (默认)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ShiftEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: ShiftEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - entity_id={}, event_type={}",
            event.entity_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn ShiftEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn ShiftEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (失败只记录 warn, 不向调用方传播)
    pub fn publish(&self, event: ShiftEvent) {
        let event_type = event.event_type;
        let entity_id = event.entity_id.clone();
        match &self.inner {
            Some(publisher) => {
                if let Err(e) = publisher.publish(event) {
                    tracing::warn!(
                        "事件发布失败 - entity_id={}, event_type={}: {}",
                        entity_id,
                        event_type.as_str(),
                        e
                    );
                }
            }
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - entity_id={}, event_type={}",
                    entity_id,
                    event_type.as_str()
                );
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<ShiftEvent>>,
    }

    impl ShiftEventPublisher for RecordingPublisher {
        fn publish(&self, event: ShiftEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok("MSG1".to_string())
        }
    }

    struct FailingPublisher;

    impl ShiftEventPublisher for FailingPublisher {
        fn publish(&self, _event: ShiftEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            Err("mail gateway down".into())
        }
    }

    #[test]
    fn test_event_builder() {
        let event = ShiftEvent::new(ShiftEventType::SwapRequested, "SCH1", "R1", "S1").notify("S2");
        assert_eq!(event.recipients, vec!["S2".to_string()]);
        assert_eq!(event.event_type.as_str(), "SwapRequested");
    }

    #[test]
    fn test_noop_publisher() {
        let result = NoOpEventPublisher.publish(ShiftEvent::new(
            ShiftEventType::SchedulePublished,
            "SCH1",
            "SCH1",
            "m1",
        ));
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_publisher_forwards() {
        let recorder = Arc::new(RecordingPublisher::default());
        let publisher = OptionalEventPublisher::with_publisher(recorder.clone());
        assert!(publisher.is_configured());

        publisher.publish(ShiftEvent::new(ShiftEventType::SwapApplied, "SCH1", "R1", "m1"));
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_optional_publisher_swallows_failures() {
        let publisher = OptionalEventPublisher::with_publisher(Arc::new(FailingPublisher));
        // 不 panic, 不返回错误
        publisher.publish(ShiftEvent::new(ShiftEventType::SwapCancelled, "SCH1", "R1", "S1"));

        let none = OptionalEventPublisher::none();
        assert!(!none.is_configured());
        none.publish(ShiftEvent::new(ShiftEventType::SwapDecided, "SCH1", "R1", "S2"));
    }
}
