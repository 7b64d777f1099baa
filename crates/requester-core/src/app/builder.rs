//! CoordinatorBuilder - Coordinator の構築とワイヤリング
//!
//! # Fail-fast
//! - 設定の検証を最初に行い、不備があればアダプタを作る前に `BuildError`
//! - Redis クライアントと HTTP クライアントの生成失敗も `BuildError`
//!
//! 接続そのものは `Coordinator::start()` で行う（ここではネットワークに触れない）。

use std::time::Duration;

use super::coordinator::Coordinator;
use super::executor::RequestExecutor;
use crate::config::{ConfigError, WorkerConfig};
use crate::domain::TransportError;
use crate::impls::{RedisPublisher, RedisSubscriber, ReqwestTransport, redis_pair};
use crate::ports::{HttpTransport, Publisher, Subscriber};

/// 本番構成の Coordinator
pub type RedisCoordinator = Coordinator<RedisPublisher, RedisSubscriber, ReqwestTransport>;

/// CoordinatorBuilder は設定からアダプタを組み立てる
///
/// # 使用例
/// ```ignore
/// let mut coordinator = CoordinatorBuilder::new(WorkerConfig::from_env()?)
///     .request_timeout(Some(Duration::from_secs(30)))
///     .build_redis()?;
/// let envelope = coordinator.run().await?;
/// ```
pub struct CoordinatorBuilder {
    config: WorkerConfig,
    request_timeout: Option<Duration>,
}

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create client: {0}")]
    Client(#[from] TransportError),
}

impl CoordinatorBuilder {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            request_timeout: None,
        }
    }

    /// HTTP リクエスト全体のタイムアウト（`None` なら無制限）
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 任意のアダプタで構築（テスト・開発用）
    pub fn build_with<P, S, H>(self, publisher: P, subscriber: S, transport: H) -> Result<Coordinator<P, S, H>, BuildError>
    where
        P: Publisher,
        S: Subscriber,
        H: HttpTransport,
    {
        self.config.validate()?;
        Ok(Coordinator::new(
            self.config,
            publisher,
            subscriber,
            RequestExecutor::new(transport),
        ))
    }

    /// Redis + reqwest で構築
    pub fn build_redis(self) -> Result<RedisCoordinator, BuildError> {
        self.config.validate()?;
        let (publisher, subscriber) = redis_pair(&self.config.broker)?;
        let transport = ReqwestTransport::new(self.request_timeout)?;
        self.build_with(publisher, subscriber, transport)
    }
}
