//! requester-core
//!
//! One-shot request relay: announce readiness on a pub/sub channel, take a
//! single HTTP task, perform it, and publish the normalized result.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（task, outcome, envelope, state, ids, errors）
//! - **ports**: 抽象化レイヤー（Publisher, Subscriber, HttpTransport）
//! - **impls**: 実装（Redis, reqwest, InMemoryBroker）
//! - **app**: アプリケーションロジック（builder, coordinator, executor）
//! - **config**: 環境変数からの設定
//! - **observability**: tracing の初期化

pub mod domain;
pub mod ports;
pub mod app;
pub mod impls;
pub mod config;
pub mod observability;
