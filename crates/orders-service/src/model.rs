//! 订单实体定义

use chrono::{DateTime, Utc};
use commerce_shared::events::PaymentStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 订单状态
///
/// 以 pending 创建，收到首个被接受的支付结果后一次性转入
/// paid 或 failed，此后不再变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    /// 支付结果到订单终态的映射：succeeded -> paid，其余 -> failed
    pub fn from_payment(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Succeeded => Self::Paid,
            PaymentStatus::Failed => Self::Failed,
        }
    }
}

/// 订单
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 订单金额（最小货币单位的正整数），创建后不可变
    pub amount: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(serde_json::to_string(&OrderStatus::Paid).unwrap(), "\"paid\"");
        assert_eq!(
            serde_json::to_string(&OrderStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_from_payment_mapping() {
        assert_eq!(
            OrderStatus::from_payment(PaymentStatus::Succeeded),
            OrderStatus::Paid
        );
        assert_eq!(
            OrderStatus::from_payment(PaymentStatus::Failed),
            OrderStatus::Failed
        );
    }
}
