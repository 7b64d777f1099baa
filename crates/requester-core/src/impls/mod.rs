//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **RedisPublisher / RedisSubscriber**: 本番用の pub/sub
//! - **ReqwestTransport**: 本番用の HTTP クライアント
//! - **InMemoryBroker**: テスト・開発用の pub/sub

pub mod inmem_pubsub;
pub mod redis_pubsub;
pub mod reqwest_http;

pub use self::inmem_pubsub::{InMemoryBroker, InMemoryPublisher, InMemorySubscriber};
pub use self::redis_pubsub::{RedisPublisher, RedisSubscriber, redis_pair};
pub use self::reqwest_http::ReqwestTransport;
