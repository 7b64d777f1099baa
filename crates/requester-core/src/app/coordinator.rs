//! Coordinator - 1 プロセス 1 タスクのライフサイクル
//!
//! # フロー
//! 1. connect: publish 用・subscribe 用の両コネクションを確立（失敗は致命的）
//! 2. announce: ready チャネルに空ペイロードを publish
//! 3. await: input チャネルを subscribe し、最初の 1 件を待つ
//! 4. dispatch: RequestExecutor を実行し、成功/失敗を ResultEnvelope に変換
//!    （ここでエラーや panic を外に漏らさない）
//! 5. publish & teardown: output チャネルに publish し、
//!    unsubscribe → subscriber 切断 → publisher 切断 を必ず実行
//!
//! Coordinator は使い捨て。`Closed` 以降の操作はすべて `StateError`。

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};

use super::executor::RequestExecutor;
use crate::config::WorkerConfig;
use crate::domain::{Phase, RequestError, ResultEnvelope, RunId, TransportError};
use crate::ports::{HttpTransport, Publisher, Subscriber};

/// 現在の phase では許されない操作
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} while coordinator is {phase}")]
pub struct StateError {
    pub operation: &'static str,
    pub phase: Phase,
}

/// プロトコル境界の失敗（envelope には変換されない）
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("startup failed: {0}")]
    Startup(TransportError),

    #[error("waiting for a task failed: {0}")]
    Receive(TransportError),

    #[error("input subscription closed before a task arrived")]
    SubscriptionClosed,

    #[error("failed to encode result envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to publish result envelope: {0}")]
    Publish(TransportError),

    #[error("teardown failed: {}", join_errors(.0))]
    Teardown(Vec<TransportError>),
}

fn join_errors(errors: &[TransportError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct Coordinator<P, S, H> {
    config: WorkerConfig,
    publisher: P,
    subscriber: S,
    executor: RequestExecutor<H>,
    phase: Phase,
    run_id: RunId,
    dropped_messages: usize,
}

impl<P, S, H> Coordinator<P, S, H>
where
    P: Publisher,
    S: Subscriber,
    H: HttpTransport,
{
    pub fn new(config: WorkerConfig, publisher: P, subscriber: S, executor: RequestExecutor<H>) -> Self {
        Self {
            config,
            publisher,
            subscriber,
            executor,
            phase: Phase::Connecting,
            run_id: RunId::generate(),
            dropped_messages: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// teardown 時に捨てた 2 件目以降のタスク数
    pub fn dropped_messages(&self) -> usize {
        self.dropped_messages
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<(), StateError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(StateError {
                operation,
                phase: self.phase,
            })
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        debug!(from = %self.phase, to = %next, "phase");
        self.phase = next;
    }

    /// 全フェーズを順に実行し、publish した envelope を返す
    pub async fn run(&mut self) -> Result<ResultEnvelope, WorkerError> {
        let span = info_span!(
            "run",
            run_id = %self.run_id,
            instance = %self.config.identity.instance_id,
            extension = %self.config.identity.extension_id,
        );
        async move {
            self.start().await?;
            let message = self.await_task().await?;
            let envelope = self.dispatch(&message).await?;
            self.publish_and_teardown(&envelope).await?;
            Ok(envelope)
        }
        .instrument(span)
        .await
    }

    /// Phase 1-2: connect both sides, then announce readiness.
    ///
    /// Any failure here is fatal: the coordinator goes straight to `Closed`
    /// without publishing anything else.
    pub async fn start(&mut self) -> Result<(), WorkerError> {
        self.expect_phase("start", Phase::Connecting)?;
        match self.connect_and_announce().await {
            Ok(()) => {
                self.advance(Phase::Ready);
                Ok(())
            }
            Err(err) => {
                self.advance(Phase::Closed);
                Err(WorkerError::Startup(err))
            }
        }
    }

    async fn connect_and_announce(&mut self) -> Result<(), TransportError> {
        self.publisher.connect().await?;
        self.subscriber.connect().await?;
        debug!("connected");
        self.publisher.publish(&self.config.channels.ready, "").await?;
        info!(channel = %self.config.channels.ready, "ready");
        Ok(())
    }

    /// Phase 3: subscribe to the input channel and wait for the first message.
    ///
    /// If the subscription fails or ends first, teardown still runs and the
    /// coordinator is closed.
    pub async fn await_task(&mut self) -> Result<String, WorkerError> {
        self.expect_phase("await a task", Phase::Ready)?;
        self.advance(Phase::AwaitingTask);

        let received = match self.subscriber.subscribe(&self.config.channels.input).await {
            Ok(()) => {
                debug!(channel = %self.config.channels.input, "subscribed");
                self.subscriber.recv().await
            }
            Err(err) => Err(err),
        };

        let failure = match received {
            Ok(Some(message)) => {
                info!(bytes = message.len(), "task received");
                self.advance(Phase::Processing);
                return Ok(message);
            }
            Ok(None) => WorkerError::SubscriptionClosed,
            Err(err) => WorkerError::Receive(err),
        };
        if let Err(err) = self.teardown().await {
            warn!(error = %err, "teardown after failed wait");
        }
        Err(failure)
    }

    /// Phase 4: run the executor and capture the outcome as an envelope.
    ///
    /// Never fails once the phase check passes: errors and panics from the
    /// executor both become a Failed envelope.
    pub async fn dispatch(&mut self, message: &str) -> Result<ResultEnvelope, WorkerError> {
        self.expect_phase("dispatch", Phase::Processing)?;

        let outcome = AssertUnwindSafe(self.executor.execute_message(message))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(RequestError::Panicked(panic_message(payload.as_ref()))));

        let identity = &self.config.identity;
        let envelope = match outcome {
            Ok(output) => {
                info!(status = output.status, "request completed");
                ResultEnvelope::completed(identity, output)
            }
            Err(err) => {
                warn!(error = %err, "request failed");
                ResultEnvelope::failed(identity, err.to_string())
            }
        };
        self.advance(Phase::Publishing);
        Ok(envelope)
    }

    /// Phase 5: publish the envelope, then tear down unconditionally.
    ///
    /// A publish failure is reported ahead of any teardown failure.
    pub async fn publish_and_teardown(&mut self, envelope: &ResultEnvelope) -> Result<(), WorkerError> {
        self.expect_phase("publish", Phase::Publishing)?;
        let published = self.publish_envelope(envelope).await;
        let torn_down = self.teardown().await;
        published?;
        torn_down
    }

    async fn publish_envelope(&mut self, envelope: &ResultEnvelope) -> Result<(), WorkerError> {
        let payload = envelope.to_payload()?;
        self.publisher
            .publish(&self.config.channels.output, &payload)
            .await
            .map_err(WorkerError::Publish)?;
        info!(channel = %self.config.channels.output, kind = envelope.kind(), "result published");
        Ok(())
    }

    /// unsubscribe → subscriber 切断 → publisher 切断
    ///
    /// 各ステップは前のステップが失敗しても実行する。
    async fn teardown(&mut self) -> Result<(), WorkerError> {
        self.dropped_messages = self.drain_extra_messages().await;
        let mut failures = Vec::new();

        if let Err(err) = self.subscriber.unsubscribe(&self.config.channels.input).await {
            warn!(error = %err, "unsubscribe failed");
            failures.push(err);
        }
        if let Err(err) = self.subscriber.disconnect().await {
            warn!(error = %err, "subscriber disconnect failed");
            failures.push(err);
        }
        if let Err(err) = self.publisher.disconnect().await {
            warn!(error = %err, "publisher disconnect failed");
            failures.push(err);
        }

        self.advance(Phase::Closed);
        info!(dropped = self.dropped_messages, "closed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(WorkerError::Teardown(failures))
        }
    }

    /// 2 件目以降のタスクは処理しない。受信済みのものは警告して捨てる
    async fn drain_extra_messages(&mut self) -> usize {
        let mut dropped = 0;
        loop {
            match self.subscriber.try_recv().await {
                Ok(Some(message)) => {
                    dropped += 1;
                    warn!(
                        channel = %self.config.channels.input,
                        bytes = message.len(),
                        "dropping task message received after the first"
                    );
                }
                Ok(None) => break,
                Err(err) => {
                    debug!(error = %err, "could not drain input subscription");
                    break;
                }
            }
        }
        dropped
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
