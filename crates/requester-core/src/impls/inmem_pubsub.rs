//! InMemoryBroker - プロセス内 pub/sub（テスト・開発用）
//!
//! # 実装詳細
//! - チャネル名ごとに購読者の送信側（`mpsc::UnboundedSender`）を保持
//! - 送信側の強参照はブローカーだけが持つ。購読がすべて外れると受信側は閉じる
//! - publish は配送と同時に履歴に記録される（順序の検証用）
//! - connect / subscribe / unsubscribe / disconnect も操作ログに記録される
//! - 購読者が増えたら `Notify` で通知（「subscribe 済みになるまで待つ」ため）
//! - 障害注入: 接続拒否、特定チャネルへの publish 失敗
//!
//! Redis の PUBLISH と同じく、購読者がいないチャネルへのメッセージは失われる。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use crate::domain::TransportError;
use crate::ports::{Publisher, Subscriber};

#[derive(Default)]
struct BrokerState {
    /// channel -> (subscriber id, sender)
    subscriptions: HashMap<String, Vec<(u64, mpsc::UnboundedSender<String>)>>,
    /// Every accepted publish, in order.
    history: Vec<(String, String)>,
    /// Connection-level calls, in order (e.g. `"unsubscribe in"`).
    operations: Vec<String>,
    failing_channels: HashSet<String>,
    refuse_connections: bool,
    next_subscriber_id: u64,
}

impl BrokerState {
    fn deliver(&mut self, channel: &str, payload: &str) -> usize {
        self.history.push((channel.to_string(), payload.to_string()));
        let Some(subs) = self.subscriptions.get_mut(channel) else {
            return 0;
        };
        subs.retain(|(_, tx)| tx.send(payload.to_string()).is_ok());
        subs.len()
    }

    fn record(&mut self, operation: impl Into<String>) {
        self.operations.push(operation.into());
    }

    fn remove_subscriber(&mut self, channel: &str, id: u64) {
        if let Some(subs) = self.subscriptions.get_mut(channel) {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }
}

/// InMemoryBroker は pub/sub ブローカーの代役
///
/// # 使用例
/// ```ignore
/// let broker = InMemoryBroker::new();
/// let mut coordinator = Coordinator::new(settings, broker.publisher(), broker.subscriber(), executor);
/// broker.wait_for_subscriber("in").await;
/// broker.publish("in", r#"{"inputs":{"url":"http://x"}}"#);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    subscribed: Arc<Notify>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publisher(&self) -> InMemoryPublisher {
        InMemoryPublisher {
            broker: self.clone(),
            connected: false,
        }
    }

    pub fn subscriber(&self) -> InMemorySubscriber {
        let id = {
            let mut state = self.state();
            state.next_subscriber_id += 1;
            state.next_subscriber_id
        };
        InMemorySubscriber {
            broker: self.clone(),
            id,
            connected: false,
            channels: HashSet::new(),
            sender: None,
            receiver: None,
        }
    }

    /// 外部パブリッシャー（スケジューラ側）として publish。配送できた購読者数を返す。
    pub fn publish(&self, channel: &str, payload: &str) -> usize {
        self.state().deliver(channel, payload)
    }

    /// `channel` に publish されたペイロード（古い順）
    pub fn published(&self, channel: &str) -> Vec<String> {
        self.state()
            .history
            .iter()
            .filter(|(ch, _)| ch == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// 全チャネルの publish 履歴（古い順）
    pub fn history(&self) -> Vec<(String, String)> {
        self.state().history.clone()
    }

    /// connect / subscribe / unsubscribe / disconnect の呼び出し順
    pub fn operations(&self) -> Vec<String> {
        self.state().operations.clone()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state()
            .subscriptions
            .get(channel)
            .map_or(0, |subs| subs.iter().filter(|(_, tx)| !tx.is_closed()).count())
    }

    /// `channel` に購読者が現れるまで待つ
    pub async fn wait_for_subscriber(&self, channel: &str) {
        loop {
            let notified = self.subscribed.notified();
            if self.subscriber_count(channel) > 0 {
                return;
            }
            notified.await;
        }
    }

    /// 以降の `connect()` を失敗させる
    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    /// 以降、`channel` への `Publisher::publish` を失敗させる
    pub fn fail_publishes_to(&self, channel: &str) {
        self.state().failing_channels.insert(channel.to_string());
    }

    /// `channel` の購読をすべて切断する（ストリーム終了の再現）
    pub fn close_channel(&self, channel: &str) {
        self.state().subscriptions.remove(channel);
    }
}

pub struct InMemoryPublisher {
    broker: InMemoryBroker,
    connected: bool,
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.broker.state();
        if state.refuse_connections {
            return Err(TransportError::Connect("broker refused connection".into()));
        }
        state.record("publisher connect");
        self.connected = true;
        Ok(())
    }

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let mut state = self.broker.state();
        if state.failing_channels.contains(channel) {
            return Err(TransportError::Publish {
                channel: channel.to_string(),
                reason: "injected failure".into(),
            });
        }
        state.deliver(channel, payload);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.broker.state().record("publisher disconnect");
        self.connected = false;
        Ok(())
    }
}

/// 購読者の受信キュー
///
/// 自分では送信側の weak 参照だけを持ち、購読のたびにブローカーへ強参照を渡す。
pub struct InMemorySubscriber {
    broker: InMemoryBroker,
    id: u64,
    connected: bool,
    channels: HashSet<String>,
    sender: Option<mpsc::WeakUnboundedSender<String>>,
    receiver: Option<mpsc::UnboundedReceiver<String>>,
}

impl InMemorySubscriber {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn not_subscribed() -> TransportError {
        TransportError::Subscription {
            channel: String::new(),
            reason: "no active subscription".into(),
        }
    }
}

#[async_trait]
impl Subscriber for InMemorySubscriber {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.broker.state();
        if state.refuse_connections {
            return Err(TransportError::Connect("broker refused connection".into()));
        }
        state.record("subscriber connect");
        self.connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, channel: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let tx = match self.sender.as_ref().and_then(mpsc::WeakUnboundedSender::upgrade) {
            Some(tx) => tx,
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.receiver = Some(rx);
                tx
            }
        };
        self.sender = Some(tx.downgrade());
        {
            let mut state = self.broker.state();
            state.record(format!("subscribe {channel}"));
            state
                .subscriptions
                .entry(channel.to_string())
                .or_default()
                .push((self.id, tx));
        }
        self.channels.insert(channel.to_string());
        self.broker.subscribed.notify_waiters();
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        self.ensure_connected()?;
        if self.channels.is_empty() {
            return Err(Self::not_subscribed());
        }
        let receiver = self.receiver.as_mut().ok_or_else(Self::not_subscribed)?;
        Ok(receiver.recv().await)
    }

    async fn try_recv(&mut self) -> Result<Option<String>, TransportError> {
        self.ensure_connected()?;
        Ok(self.receiver.as_mut().and_then(|rx| rx.try_recv().ok()))
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        {
            let mut state = self.broker.state();
            state.record(format!("unsubscribe {channel}"));
            state.remove_subscriber(channel, self.id);
        }
        self.channels.remove(channel);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.ensure_connected()?;
        {
            let mut state = self.broker.state();
            state.record("subscriber disconnect");
            for channel in &self.channels {
                state.remove_subscriber(channel, self.id);
            }
        }
        self.channels.clear();
        self.sender = None;
        self.receiver = None;
        self.connected = false;
        Ok(())
    }
}
