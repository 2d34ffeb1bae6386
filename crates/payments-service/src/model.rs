//! 支付服务实体定义
//!
//! 所有枚举同时支持数据库（sqlx）和 JSON（serde）序列化，
//! 数据库中以小写文本存储。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 支付单状态
///
/// 首次观察到订单创建事件时以 processing 建单，
/// 同一事务内落定为 succeeded 或 failed，此后不再变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PaymentState {
    Processing,
    Succeeded,
    Failed,
}

/// 余额流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Debit,
}

/// 支付单
///
/// 以 order_id 为主键，保证一个订单至多一条支付记录；
/// `reason` 在失败时携带业务原因，成功时为空串。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub status: PaymentState,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PaymentState::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentState::Succeeded).unwrap(),
            "\"succeeded\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentState::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_transaction_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Deposit).unwrap(),
            "\"deposit\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionKind::Debit).unwrap(),
            "\"debit\""
        );
    }
}
