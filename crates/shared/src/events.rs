//! 事件契约
//!
//! 定义两个服务之间交换的全部事件的线上格式。字段为 snake_case JSON，
//! `event_id` 每次发射全局唯一，是 inbox 去重的唯一键。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// 事件类型常量
// ---------------------------------------------------------------------------

/// 集中管理所有事件类型名称，防止字符串散落在各服务中导致拼写不一致
pub mod event_types {
    pub const ORDER_CREATED: &str = "orders.created";
    pub const PAYMENT_PROCESSED: &str = "payments.processed";
}

// ---------------------------------------------------------------------------
// OrderCreated
// ---------------------------------------------------------------------------

/// 订单创建事件
///
/// 订单服务在创建订单的同一事务中写入 outbox，由分发器发布到
/// `orders.events` exchange，支付服务据此发起扣款。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreated {
    /// 事件唯一标识（UUID v7），inbox 去重键
    pub event_id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    /// 订单金额（最小货币单位的正整数）
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderCreated {
    /// 构建新事件，自动生成 UUID v7 作为 event_id
    pub fn new(order_id: Uuid, user_id: Uuid, amount: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            order_id,
            user_id,
            amount,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentProcessed
// ---------------------------------------------------------------------------

/// 支付结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

/// 支付处理完成事件
///
/// 支付服务在处理事务中写入 outbox，由分发器发布到 `payments.events`
/// exchange，订单服务据此落定订单状态。失败时 `reason` 携带业务原因
/// （`insufficient_funds` / `account_missing`），成功时整个字段省略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProcessed {
    /// 事件唯一标识（UUID v7），与触发它的 OrderCreated 无关
    pub event_id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl PaymentProcessed {
    /// 构建新事件，自动生成 UUID v7 作为 event_id
    ///
    /// 空字符串的 reason 归一化为 None，保证成功事件不携带该字段。
    pub fn new(
        order_id: Uuid,
        user_id: Uuid,
        amount: i64,
        status: PaymentStatus,
        reason: impl Into<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        let reason: String = reason.into();
        Self {
            event_id: Uuid::now_v7(),
            order_id,
            user_id,
            amount,
            status,
            reason: if reason.is_empty() { None } else { Some(reason) },
            processed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_constants() {
        assert_eq!(event_types::ORDER_CREATED, "orders.created");
        assert_eq!(event_types::PAYMENT_PROCESSED, "payments.processed");
    }

    #[test]
    fn test_order_created_round_trip() {
        let event = OrderCreated::new(Uuid::now_v7(), Uuid::now_v7(), 400, Utc::now());

        let json = serde_json::to_string(&event).unwrap();

        // 线上格式为 snake_case
        assert!(json.contains("\"event_id\""));
        assert!(json.contains("\"order_id\""));
        assert!(json.contains("\"user_id\""));
        assert!(json.contains("\"created_at\""));

        let decoded: OrderCreated = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.event_id, event.event_id);
        assert_eq!(decoded.order_id, event.order_id);
        assert_eq!(decoded.amount, 400);
    }

    #[test]
    fn test_payment_processed_success_omits_reason() {
        let event = PaymentProcessed::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            400,
            PaymentStatus::Succeeded,
            "",
            Utc::now(),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"status\":\"succeeded\""));
        assert!(!json.contains("reason"));

        let decoded: PaymentProcessed = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.status, PaymentStatus::Succeeded);
        assert_eq!(decoded.reason, None);
    }

    #[test]
    fn test_payment_processed_failure_carries_reason() {
        let event = PaymentProcessed::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            500,
            PaymentStatus::Failed,
            "insufficient_funds",
            Utc::now(),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("\"reason\":\"insufficient_funds\""));
    }

    #[test]
    fn test_unknown_payment_status_is_rejected() {
        // 状态枚举是严格契约，未知取值视为永久性解析失败
        let json = r#"{
            "event_id": "0192f0c1-0000-7000-8000-000000000001",
            "order_id": "0192f0c1-0000-7000-8000-000000000002",
            "user_id": "0192f0c1-0000-7000-8000-000000000003",
            "amount": 100,
            "status": "refunded",
            "processed_at": "2025-01-15T10:30:00Z"
        }"#;

        let result: Result<PaymentProcessed, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
