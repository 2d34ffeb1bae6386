//! 支付服务
//!
//! 消费订单创建事件，在单个数据库事务内完成 inbox 去重、账户行锁、
//! 扣款（或失败归因）、支付单落定和结果事件的 outbox 写入；
//! 另提供账户开户 / 充值 / 查余额的 HTTP 接口。

pub mod account;
pub mod consumer;
pub mod error;
pub mod http;
pub mod model;
pub mod processor;
