//! 共享库
//!
//! 包含订单服务与支付服务共用的配置、错误处理、数据库连接、
//! AMQP 消息、事件契约以及 outbox/inbox 可靠投递基础设施。

pub mod amqp;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod inbox;
pub mod outbox;
pub mod telemetry;
