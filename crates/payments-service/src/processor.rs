//! 支付处理器
//!
//! 对每条订单创建事件执行单个数据库事务：
//! inbox 登记（去重）→ 支付单建档（按 order_id 去重）→ 账户行锁 →
//! 扣款或失败归因 → 支付单落定 → 结果事件写入 payment_outbox → 提交。
//! 事务中途的任何数据库错误都会整体回滚，消息重新入队后由 inbox
//! 保证最终只生效一次。

use chrono::Utc;
use commerce_shared::error::CommerceError;
use commerce_shared::events::{OrderCreated, PaymentProcessed, PaymentStatus, event_types};
use commerce_shared::inbox;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::PaymentsError;
use crate::model::{Payment, PaymentState, TransactionKind};

/// 账户余额的扣款判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebitDecision {
    /// 余额充足，执行扣款
    Debit,
    /// 不可扣款，携带写入事件的业务原因
    Fail(&'static str),
}

/// 根据锁定后的余额判定能否扣款
///
/// 行不存在与余额不足是业务结果而非错误——照常提交事务并在结果
/// 事件中带出原因。
fn classify(balance: Option<i64>, amount: i64) -> DebitDecision {
    match balance {
        None => DebitDecision::Fail("account_missing"),
        Some(balance) if balance < amount => DebitDecision::Fail("insufficient_funds"),
        Some(_) => DebitDecision::Debit,
    }
}

/// 支付处理器
#[derive(Clone)]
pub struct PaymentProcessor {
    pool: PgPool,
}

impl PaymentProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 处理一条订单创建事件
    ///
    /// 返回 None 表示事件已处理过（幂等跳过），Some 为本次落定的结果。
    /// 同一账户的并发扣款通过 `FOR UPDATE` 行锁串行化。
    pub async fn handle_order_created(
        &self,
        event: &OrderCreated,
    ) -> Result<Option<PaymentStatus>, PaymentsError> {
        let mut tx = self.pool.begin().await?;

        if !inbox::try_insert(
            &mut tx,
            "payment_inbox",
            event.event_id,
            event_types::ORDER_CREATED,
        )
        .await?
        {
            return Ok(None);
        }

        // 按 order_id 建档；inbox 行丢失后的极端重放场景下为 no-op
        sqlx::query(
            "INSERT INTO payments (order_id, user_id, amount, status, reason, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, '', NOW(), NOW()) \
             ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(event.order_id)
        .bind(event.user_id)
        .bind(event.amount)
        .bind(PaymentState::Processing)
        .execute(&mut *tx)
        .await?;

        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE user_id = $1 FOR UPDATE")
                .bind(event.user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (state, reason) = match classify(balance, event.amount) {
            DebitDecision::Fail(reason) => (PaymentState::Failed, reason),
            DebitDecision::Debit => {
                let updated = sqlx::query(
                    "UPDATE accounts \
                     SET balance = balance - $2, updated_at = NOW() \
                     WHERE user_id = $1",
                )
                .bind(event.user_id)
                .bind(event.amount)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    // 行在锁定与更新之间消失的竞态，与账户缺失同样归因
                    (PaymentState::Failed, "account_missing")
                } else {
                    sqlx::query(
                        "INSERT INTO account_transactions (id, user_id, order_id, amount, kind) \
                         VALUES ($1, $2, $3, $4, $5)",
                    )
                    .bind(Uuid::now_v7())
                    .bind(event.user_id)
                    .bind(event.order_id)
                    .bind(event.amount)
                    .bind(TransactionKind::Debit)
                    .execute(&mut *tx)
                    .await?;

                    (PaymentState::Succeeded, "")
                }
            }
        };

        sqlx::query(
            "UPDATE payments SET status = $2, reason = $3, updated_at = NOW() WHERE order_id = $1",
        )
        .bind(event.order_id)
        .bind(state)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        let result_status = if state == PaymentState::Succeeded {
            PaymentStatus::Succeeded
        } else {
            PaymentStatus::Failed
        };

        let result = PaymentProcessed::new(
            event.order_id,
            event.user_id,
            event.amount,
            result_status,
            reason,
            Utc::now(),
        );
        let payload = serde_json::to_vec(&result).map_err(CommerceError::from)?;

        sqlx::query(
            "INSERT INTO payment_outbox (event_id, event_type, payload) VALUES ($1, $2, $3)",
        )
        .bind(result.event_id)
        .bind(event_types::PAYMENT_PROCESSED)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_id = %event.order_id,
            user_id = %event.user_id,
            amount = event.amount,
            status = ?result_status,
            reason,
            "支付处理完成"
        );

        Ok(Some(result_status))
    }

    /// 按订单查询支付单
    pub async fn get_payment(&self, order_id: Uuid) -> Result<Option<Payment>, PaymentsError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT order_id, user_id, amount, status, reason, created_at, updated_at \
             FROM payments \
             WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_account() {
        assert_eq!(classify(None, 100), DebitDecision::Fail("account_missing"));
    }

    #[test]
    fn test_classify_insufficient_funds() {
        assert_eq!(
            classify(Some(99), 100),
            DebitDecision::Fail("insufficient_funds")
        );
        assert_eq!(
            classify(Some(0), 1),
            DebitDecision::Fail("insufficient_funds")
        );
    }

    #[test]
    fn test_classify_exact_balance_debits() {
        // 余额恰好等于金额时允许扣款，扣完为 0 不违反非负约束
        assert_eq!(classify(Some(100), 100), DebitDecision::Debit);
        assert_eq!(classify(Some(1000), 400), DebitDecision::Debit);
    }
}
