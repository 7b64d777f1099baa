//! Redis pub/sub adapter.
//!
//! Two connections per worker, like any Redis pub/sub client: a multiplexed
//! connection for PUBLISH and a dedicated connection in subscriber mode.

use futures::{FutureExt, StreamExt};
use redis::aio::{MultiplexedConnection, PubSub};
use redis::{AsyncCommands, Client, IntoConnectionInfo};
use tracing::debug;

use crate::config::BrokerConfig;
use crate::domain::TransportError;
use crate::domain::errors::describe_chain;
use crate::ports::{Publisher, Subscriber};

/// Open a client for the configured broker.
///
/// Credentials from the config take precedence over any embedded in the URL.
/// No connection is made yet.
pub fn open_client(config: &BrokerConfig) -> Result<Client, TransportError> {
    let mut info = config
        .url
        .as_str()
        .into_connection_info()
        .map_err(|e| TransportError::Connect(describe_chain(&e)))?;
    if let Some(username) = &config.username {
        info.redis.username = Some(username.clone());
    }
    if let Some(password) = &config.password {
        info.redis.password = Some(password.clone());
    }
    Client::open(info).map_err(|e| TransportError::Connect(describe_chain(&e)))
}

/// Build the publisher/subscriber pair sharing one client.
pub fn redis_pair(config: &BrokerConfig) -> Result<(RedisPublisher, RedisSubscriber), TransportError> {
    let client = open_client(config)?;
    Ok((RedisPublisher::new(client.clone()), RedisSubscriber::new(client)))
}

pub struct RedisPublisher {
    client: Client,
    conn: Option<MultiplexedConnection>,
}

impl RedisPublisher {
    pub fn new(client: Client) -> Self {
        Self { client, conn: None }
    }
}

#[async_trait::async_trait]
impl Publisher for RedisPublisher {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TransportError::Connect(describe_chain(&e)))?;
        self.conn = Some(conn);
        Ok(())
    }

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<(), TransportError> {
        let conn = self.conn.as_mut().ok_or(TransportError::NotConnected)?;
        let receivers: i64 = conn
            .publish(channel, payload)
            .await
            .map_err(|e| TransportError::Publish {
                channel: channel.to_string(),
                reason: describe_chain(&e),
            })?;
        debug!(channel, receivers, bytes = payload.len(), "published");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        // The multiplexed connection closes once the last handle is dropped.
        self.conn.take().map(drop).ok_or(TransportError::NotConnected)
    }
}

pub struct RedisSubscriber {
    client: Client,
    pubsub: Option<PubSub>,
}

impl RedisSubscriber {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            pubsub: None,
        }
    }

    fn pubsub(&mut self) -> Result<&mut PubSub, TransportError> {
        self.pubsub.as_mut().ok_or(TransportError::NotConnected)
    }
}

/// Invalid UTF-8 is replaced rather than rejected, so a garbled task still
/// reaches the parser and ends as a failed result.
fn payload_of(msg: redis::Msg) -> String {
    String::from_utf8_lossy(msg.get_payload_bytes()).into_owned()
}

#[async_trait::async_trait]
impl Subscriber for RedisSubscriber {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| TransportError::Connect(describe_chain(&e)))?;
        self.pubsub = Some(pubsub);
        Ok(())
    }

    async fn subscribe(&mut self, channel: &str) -> Result<(), TransportError> {
        self.pubsub()?
            .subscribe(channel)
            .await
            .map_err(|e| TransportError::Subscription {
                channel: channel.to_string(),
                reason: describe_chain(&e),
            })
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        let next = self.pubsub()?.on_message().next().await;
        Ok(next.map(payload_of))
    }

    async fn try_recv(&mut self) -> Result<Option<String>, TransportError> {
        let next = self.pubsub()?.on_message().next().now_or_never().flatten();
        Ok(next.map(payload_of))
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), TransportError> {
        self.pubsub()?
            .unsubscribe(channel)
            .await
            .map_err(|e| TransportError::Subscription {
                channel: channel.to_string(),
                reason: describe_chain(&e),
            })
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.pubsub.take().map(drop).ok_or(TransportError::NotConnected)
    }
}
