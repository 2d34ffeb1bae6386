//! 支付服务专用错误类型
//!
//! 在共享库 CommerceError 基础上定义本服务特有的错误变体，
//! 并给出到 HTTP 状态码的映射。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use commerce_shared::error::CommerceError;
use tracing::error;
use uuid::Uuid;

/// 支付服务错误
#[derive(Debug, thiserror::Error)]
pub enum PaymentsError {
    /// 开户时账户已存在，HTTP 层映射为 409
    #[error("账户已存在: user_id={user_id}")]
    AccountExists { user_id: Uuid },

    /// 充值 / 查询目标账户不存在
    #[error("账户不存在: user_id={user_id}")]
    AccountNotFound { user_id: Uuid },

    /// 充值金额必须为正数
    #[error("金额必须为正数: {amount}")]
    InvalidAmount { amount: i64 },

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

impl PaymentsError {
    /// 该错误能否通过消息重投恢复
    ///
    /// 处理器事务中只有基础设施瞬时故障值得重投（按共享库的判定）；
    /// 账户缺失、余额不足等业务结果不会走到这里——它们照常提交并
    /// 反映在结果事件里。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for PaymentsError {
    fn from(err: sqlx::Error) -> Self {
        Self::Shared(CommerceError::from(err))
    }
}

impl IntoResponse for PaymentsError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::AccountExists { .. } => (StatusCode::CONFLICT, self.to_string()),
            Self::AccountNotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
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
        let user_id = Uuid::now_v7();
        let err = PaymentsError::AccountExists { user_id };
        assert_eq!(err.to_string(), format!("账户已存在: user_id={user_id}"));

        let err = PaymentsError::InvalidAmount { amount: -5 };
        assert_eq!(err.to_string(), "金额必须为正数: -5");

        let err = PaymentsError::MissingUserHeader;
        assert_eq!(err.to_string(), "缺少 X-User-ID 请求头");
    }

    #[test]
    fn test_is_retryable() {
        // 基础设施瞬时故障可重投
        let db_err = PaymentsError::Shared(CommerceError::Database(sqlx::Error::PoolTimedOut));
        assert!(db_err.is_retryable());

        // 永久性失败不重投
        let invalid = PaymentsError::Shared(CommerceError::InvalidEvent("坏负载".to_string()));
        assert!(!invalid.is_retryable());
        assert!(
            !PaymentsError::AccountExists {
                user_id: Uuid::now_v7()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_http_status_mapping() {
        let user_id = Uuid::now_v7();

        let resp = PaymentsError::AccountExists { user_id }.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = PaymentsError::AccountNotFound { user_id }.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = PaymentsError::MissingUserHeader.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = PaymentsError::Shared(CommerceError::Internal("boom".to_string()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
