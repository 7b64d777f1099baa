//! Identifiers.
//!
//! - `WorkflowIdentity`: 外部（環境変数）から与えられる、プロセス固定の識別子。
//!   タスクからは導出しない。
//! - `RunId`: 1 プロセス = 1 実行を識別する ULID。ログの相関用で、ワイヤには載らない。

use std::fmt;
use ulid::Ulid;

/// Process-identity constants stamped onto every result envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowIdentity {
    pub instance_id: String,
    pub extension_id: String,
}

impl WorkflowIdentity {
    pub fn new(instance_id: impl Into<String>, extension_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            extension_id: extension_id.into(),
        }
    }
}

/// RunId は ULID ベースの実行 ID
///
/// 時刻でソート可能なので、複数ワーカーのログを並べたときに起動順が分かる。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(Ulid);

impl RunId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}
