//! Phase - Coordinator のライフサイクル状態
//!
//! # 状態遷移
//! `Connecting → Ready → AwaitingTask → Processing → Publishing → Closed`
//!
//! - 前の状態に戻る遷移はない
//! - `Closed` は終端（ちょうど 1 回だけ到達する）
//! - `Ready` 以前の異常終了は `Connecting → Closed`（致命的な起動失敗）のみ
//! - `AwaitingTask → Closed` はタスク受信前にサブスクリプションが壊れた場合

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Connecting,
    Ready,
    AwaitingTask,
    Processing,
    Publishing,
    Closed,
}

impl Phase {
    /// 許可された遷移かどうか
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Connecting, Ready)
                | (Connecting, Closed)
                | (Ready, AwaitingTask)
                | (AwaitingTask, Processing)
                | (AwaitingTask, Closed)
                | (Processing, Publishing)
                | (Publishing, Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Connecting => "connecting",
            Phase::Ready => "ready",
            Phase::AwaitingTask => "awaiting_task",
            Phase::Processing => "processing",
            Phase::Publishing => "publishing",
            Phase::Closed => "closed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
