//! Pub/Sub port - Redis または InMemory
//!
//! publish 側と subscribe 側は別コネクションとして扱う
//! （Redis では subscribe 中のコネクションで PUBLISH できないため）。
//!
//! # 実装
//! - `RedisPublisher` / `RedisSubscriber`（本番用）
//! - `InMemoryPublisher` / `InMemorySubscriber`（テスト用）

use async_trait::async_trait;

use crate::domain::TransportError;

/// Publisher はチャネルへの publish を担当
///
/// # 契約
/// - `connect()` 前、`disconnect()` 後の `publish()` は `TransportError::NotConnected`
#[async_trait]
pub trait Publisher: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<(), TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Subscriber はチャネルからのメッセージ受信を担当
///
/// コールバックではなく「1 件待つ」操作を公開する。
///
/// # 契約
/// - `recv()` は subscribe 済みチャネルのメッセージが届くまで待つ
/// - ストリームが閉じたら `Ok(None)`
/// - `try_recv()` は待たずに、すでに届いているメッセージだけを返す
#[async_trait]
pub trait Subscriber: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn subscribe(&mut self, channel: &str) -> Result<(), TransportError>;

    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    async fn try_recv(&mut self) -> Result<Option<String>, TransportError>;

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
