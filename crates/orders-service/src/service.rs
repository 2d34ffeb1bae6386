//! 订单命令路径
//!
//! 创建订单时在同一事务内写入订单行与 OrderCreated outbox 行——
//! 事务提交即保证下游扣款终将发生。支付结果到达时在同一事务内
//! 完成 inbox 去重与订单状态落定。

use chrono::Utc;
use commerce_shared::error::CommerceError;
use commerce_shared::events::{OrderCreated, PaymentProcessed, event_types};
use commerce_shared::inbox;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::OrdersError;
use crate::model::{Order, OrderStatus};

/// 订单服务
#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建订单
    ///
    /// 订单行与 outbox 行同事务提交；任一失败则整体回滚，
    /// 不会出现有订单无事件（或反之）的中间态。
    pub async fn create(&self, user_id: Uuid, amount: i64) -> Result<Order, OrdersError> {
        if amount <= 0 {
            return Err(OrdersError::InvalidAmount { amount });
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::now_v7(),
            user_id,
            amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, user_id, amount, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.amount)
        .bind(order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        let event = OrderCreated::new(order.id, user_id, amount, now);
        let payload = serde_json::to_vec(&event).map_err(CommerceError::from)?;

        sqlx::query(
            "INSERT INTO order_outbox (event_id, event_type, payload) VALUES ($1, $2, $3)",
        )
        .bind(event.event_id)
        .bind(event_types::ORDER_CREATED)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(order_id = %order.id, user_id = %user_id, amount, "订单已创建");
        Ok(order)
    }

    /// 列出用户的全部订单，按创建时间倒序
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Order>, OrdersError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, user_id, amount, status, created_at, updated_at \
             FROM orders \
             WHERE user_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// 获取单个订单，按用户隔离
    pub async fn get(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, OrdersError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, user_id, amount, status, created_at, updated_at \
             FROM orders \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        order.ok_or(OrdersError::OrderNotFound { order_id })
    }

    /// 应用支付结果事件
    ///
    /// 返回 None 表示没有发生状态变化（事件重复，或订单已在终态），
    /// Some 为本次落定的新状态。状态更新带 `status = 'pending'` 守卫：
    /// 终态订单对任何后续结果保持不变。订单行尚不存在（结果事件先于
    /// 订单提交到达的病态重排）时返回错误，由 broker 重投吸收。
    pub async fn apply_payment_result(
        &self,
        event: &PaymentProcessed,
    ) -> Result<Option<OrderStatus>, OrdersError> {
        let mut tx = self.pool.begin().await?;

        if !inbox::try_insert(
            &mut tx,
            "order_inbox",
            event.event_id,
            event_types::PAYMENT_PROCESSED,
        )
        .await?
        {
            return Ok(None);
        }

        let status = OrderStatus::from_payment(event.status);

        let updated = sqlx::query(
            "UPDATE orders \
             SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(event.order_id)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let existing: Option<OrderStatus> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(event.order_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return match existing {
                // 订单已在终态：提交 inbox 登记即可，状态保持单调
                Some(terminal) => {
                    tx.commit().await?;
                    info!(
                        order_id = %event.order_id,
                        status = ?terminal,
                        "订单已在终态，忽略后续支付结果"
                    );
                    Ok(None)
                }
                // 订单行还不存在：回滚整个事务（含 inbox 行），等待重投
                None => Err(OrdersError::OrderNotFound {
                    order_id: event.order_id,
                }),
            };
        }

        tx.commit().await?;

        info!(order_id = %event.order_id, status = ?status, "订单状态已落定");
        Ok(Some(status))
    }
}
