//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。外部システム（pub/sub ブローカー、
//! HTTP）へのインターフェースだけを定義し、実装の詳細は `impls` に置く。

pub mod http;
pub mod pubsub;

pub use self::http::{HttpRequest, HttpResponse, HttpTransport};
pub use self::pubsub::{Publisher, Subscriber};
