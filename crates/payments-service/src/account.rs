//! 账户服务
//!
//! 提供开户、充值、查余额三个操作。充值与流水写入在同一事务内完成，
//! 保证流水的存款总和减去成功扣款总和恒等于当前余额。

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::PaymentsError;
use crate::model::TransactionKind;

/// 账户服务
#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 开户，初始余额为 0
    ///
    /// 重复开户通过主键唯一约束识别，映射为 AccountExists。
    pub async fn create(&self, user_id: Uuid) -> Result<(), PaymentsError> {
        let result = sqlx::query(
            "INSERT INTO accounts (user_id, balance, created_at, updated_at) \
             VALUES ($1, 0, NOW(), NOW())",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(user_id = %user_id, "账户已创建");
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(PaymentsError::AccountExists { user_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 充值，返回充值后的余额
    ///
    /// 余额更新与 deposit 流水在同一事务内提交。
    pub async fn deposit(&self, user_id: Uuid, amount: i64) -> Result<i64, PaymentsError> {
        if amount <= 0 {
            return Err(PaymentsError::InvalidAmount { amount });
        }

        let mut tx = self.pool.begin().await?;

        let balance: Option<i64> = sqlx::query_scalar(
            "UPDATE accounts \
             SET balance = balance + $2, updated_at = NOW() \
             WHERE user_id = $1 \
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(balance) = balance else {
            return Err(PaymentsError::AccountNotFound { user_id });
        };

        sqlx::query(
            "INSERT INTO account_transactions (id, user_id, order_id, amount, kind) \
             VALUES ($1, $2, NULL, $3, $4)",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(amount)
        .bind(TransactionKind::Deposit)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id = %user_id, amount, balance, "充值完成");
        Ok(balance)
    }

    /// 查询当前余额
    pub async fn get_balance(&self, user_id: Uuid) -> Result<i64, PaymentsError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        balance.ok_or(PaymentsError::AccountNotFound { user_id })
    }
}
