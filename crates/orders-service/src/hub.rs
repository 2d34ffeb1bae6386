//! 实时状态推送中心
//!
//! 进程内的 `order_id -> 订阅者集合` 注册表。注册、注销、广播全部
//! 经由一条命令通道交给单个所有者任务串行处理，注册表本身无锁。
//! 广播是非阻塞的：订阅者的有界缓冲写满即被驱逐并关闭其通道——
//! 慢消费者不能拖住其余订阅者。跨进程的实时推送不在本模块范围内。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::OrderStatus;

/// 单个订阅者的缓冲上限，写满即视为慢消费者
const SUBSCRIBER_BUFFER: usize = 256;

/// 推送给订阅者的状态变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

enum HubCommand {
    Register {
        order_id: Uuid,
        subscriber_id: u64,
        sink: mpsc::Sender<OrderUpdate>,
    },
    Unregister {
        order_id: Uuid,
        subscriber_id: u64,
    },
    Broadcast(OrderUpdate),
}

/// 注册表所有者任务
pub struct Hub {
    commands: mpsc::UnboundedReceiver<HubCommand>,
    subscribers: HashMap<Uuid, HashMap<u64, mpsc::Sender<OrderUpdate>>>,
}

/// 供其他任务使用的句柄，可自由克隆
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    next_id: Arc<AtomicU64>,
}

/// 单个订阅，drop 时自动注销
pub struct Subscription {
    commands: mpsc::UnboundedSender<HubCommand>,
    order_id: Uuid,
    subscriber_id: u64,
    updates: mpsc::Receiver<OrderUpdate>,
}

impl Hub {
    pub fn new() -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                commands: rx,
                subscribers: HashMap::new(),
            },
            HubHandle {
                commands: tx,
                next_id: Arc::new(AtomicU64::new(0)),
            },
        )
    }

    /// 运行所有者循环，直到收到关闭信号或全部句柄被丢弃
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("实时推送中心已启动");

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // 发送端被丢弃等同于关闭
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.apply(cmd);
                }
            }
        }

        // 清空注册表即丢弃所有发送端，订阅者的接收端随之关闭
        self.subscribers.clear();
        info!("实时推送中心已关闭");
    }

    fn apply(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register {
                order_id,
                subscriber_id,
                sink,
            } => {
                self.subscribers
                    .entry(order_id)
                    .or_default()
                    .insert(subscriber_id, sink);
            }
            HubCommand::Unregister {
                order_id,
                subscriber_id,
            } => {
                if let Some(set) = self.subscribers.get_mut(&order_id) {
                    set.remove(&subscriber_id);
                    if set.is_empty() {
                        self.subscribers.remove(&order_id);
                    }
                }
            }
            HubCommand::Broadcast(update) => {
                let Some(set) = self.subscribers.get_mut(&update.order_id) else {
                    return;
                };

                // try_send 非阻塞：缓冲写满或对端已关闭的订阅者当场驱逐
                set.retain(|subscriber_id, sink| match sink.try_send(update.clone()) {
                    Ok(()) => true,
                    Err(_) => {
                        debug!(
                            order_id = %update.order_id,
                            subscriber_id,
                            "订阅者缓冲已满或已断开，驱逐"
                        );
                        false
                    }
                });

                if set.is_empty() {
                    self.subscribers.remove(&update.order_id);
                }
            }
        }
    }
}

impl HubHandle {
    /// 订阅某个订单的状态变更
    pub fn subscribe(&self, order_id: Uuid) -> Subscription {
        let subscriber_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sink, updates) = mpsc::channel(SUBSCRIBER_BUFFER);

        let _ = self.commands.send(HubCommand::Register {
            order_id,
            subscriber_id,
            sink,
        });

        Subscription {
            commands: self.commands.clone(),
            order_id,
            subscriber_id,
            updates,
        }
    }

    /// 广播一条状态变更给该订单的所有订阅者
    ///
    /// 推送中心已关闭时静默丢弃。
    pub fn broadcast(&self, update: OrderUpdate) {
        let _ = self.commands.send(HubCommand::Broadcast(update));
    }
}

impl Subscription {
    /// 接收下一条状态变更；None 表示已被驱逐或推送中心已关闭
    pub async fn recv(&mut self) -> Option<OrderUpdate> {
        self.updates.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.commands.send(HubCommand::Unregister {
            order_id: self.order_id,
            subscriber_id: self.subscriber_id,
        });
    }
}
