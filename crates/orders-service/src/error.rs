//! 订单服务专用错误类型
//!
//! 在共享库 CommerceError 基础上定义本服务特有的错误变体，
//! 并给出到 HTTP 状态码的映射。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use commerce_shared::error::CommerceError;
use tracing::error;
use uuid::Uuid;

/// 订单服务错误
#[derive(Debug, thiserror::Error)]
pub enum OrdersError {
    /// 下单金额必须为正数
    #[error("金额必须为正数: {amount}")]
    InvalidAmount { amount: i64 },

    /// 订单不存在（或不属于该用户）
    #[error("订单不存在: order_id={order_id}")]
    OrderNotFound { order_id: Uuid },

    /// 请求缺少 X-User-ID 头
    #[error("缺少 X-User-ID 请求头")]
    MissingUserHeader,

    /// X-User-ID 不是合法的 UUID
    #[error("X-User-ID 不是合法的 UUID: {0}")]
    InvalidUserId(String),

    /// 透传共享库错误，避免在每个 match 分支手动转换
    #[error(transparent)]
    Shared(#[from] CommerceError),
}

impl OrdersError {
    /// 该错误能否通过消息重投恢复
    ///
    /// 订单尚不存在是结果事件先于订单提交到达的病态重排，重投即可
    /// 吸收；基础设施瞬时故障按共享库的判定；其余为永久性失败。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OrderNotFound { .. } => true,
            Self::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for OrdersError {
    fn from(err: sqlx::Error) -> Self {
        Self::Shared(CommerceError::from(err))
    }
}

impl IntoResponse for OrdersError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::OrderNotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            Self::InvalidAmount { .. } | Self::MissingUserHeader | Self::InvalidUserId(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Shared(e) => {
                error!(code = e.code(), error = %e, "请求处理失败");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrdersError::InvalidAmount { amount: 0 };
        assert_eq!(err.to_string(), "金额必须为正数: 0");

        let order_id = Uuid::now_v7();
        let err = OrdersError::OrderNotFound { order_id };
        assert_eq!(err.to_string(), format!("订单不存在: order_id={order_id}"));
    }

    #[test]
    fn test_is_retryable() {
        // 病态重排靠重投吸收
        let not_found = OrdersError::OrderNotFound {
            order_id: Uuid::now_v7(),
        };
        assert!(not_found.is_retryable());

        // 基础设施瞬时故障可重投
        let db_err = OrdersError::Shared(CommerceError::Database(sqlx::Error::PoolTimedOut));
        assert!(db_err.is_retryable());

        // 永久性失败不重投
        let invalid = OrdersError::Shared(CommerceError::InvalidEvent("坏负载".to_string()));
        assert!(!invalid.is_retryable());
        assert!(!OrdersError::InvalidAmount { amount: 0 }.is_retryable());
    }

    #[test]
    fn test_http_status_mapping() {
        let resp = OrdersError::OrderNotFound {
            order_id: Uuid::now_v7(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = OrdersError::InvalidAmount { amount: -1 }.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = OrdersError::Shared(CommerceError::Internal("boom".to_string()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
