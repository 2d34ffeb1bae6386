//! 统一错误处理模块
//!
//! 定义两个服务共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum CommerceError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("记录已存在: {entity} id={id}")]
    AlreadyExists { entity: String, id: String },

    // ==================== 消息队列错误 ====================
    #[error("AMQP 错误: {0}")]
    Amqp(String),

    #[error("发布超时: {exchange}")]
    PublishTimeout { exchange: String },

    // ==================== 事件错误 ====================
    #[error("事件反序列化失败: {0}")]
    InvalidEvent(String),

    #[error("事件序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, CommerceError>;

impl CommerceError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migrate(_) => "MIGRATE_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Amqp(_) => "AMQP_ERROR",
            Self::PublishTimeout { .. } => "PUBLISH_TIMEOUT",
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 基础设施层的瞬时故障（数据库不可用、broker 不可达、发布超时）
    /// 可以通过退避重试恢复；业务与解析错误不重试。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Amqp(_) | Self::PublishTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = CommerceError::NotFound {
            entity: "Order".to_string(),
            id: "0192f0c1-0000-7000-8000-000000000001".to_string(),
        };
        assert_eq!(err.code(), "NOT_FOUND");

        let err = CommerceError::Amqp("连接被拒绝".to_string());
        assert_eq!(err.code(), "AMQP_ERROR");
    }

    #[test]
    fn test_is_retryable() {
        let db_err = CommerceError::Database(sqlx::Error::PoolTimedOut);
        assert!(db_err.is_retryable());

        let timeout = CommerceError::PublishTimeout {
            exchange: "orders.events".to_string(),
        };
        assert!(timeout.is_retryable());

        let invalid = CommerceError::InvalidEvent("负载非 JSON".to_string());
        assert!(!invalid.is_retryable());

        let validation = CommerceError::Validation("金额必须为正数".to_string());
        assert!(!validation.is_retryable());
    }
}
