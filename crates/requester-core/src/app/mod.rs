//! App - アプリケーション層
//!
//! ports を組み合わせて 1 タスク分のライフサイクルを実装する。
//!
//! # 主要コンポーネント
//! - **CoordinatorBuilder**: 設定からの構築とワイヤリング
//! - **Coordinator**: connect → ready → await → dispatch → publish → teardown
//! - **RequestExecutor**: タスクを HTTP 呼び出しに変換

pub mod builder;
pub mod coordinator;
pub mod executor;

pub use self::builder::{BuildError, CoordinatorBuilder, RedisCoordinator};
pub use self::coordinator::{Coordinator, StateError, WorkerError};
pub use self::executor::RequestExecutor;
