//! HttpTransport port - HTTP 呼び出しの抽象化
//!
//! 低レベルのコネクション管理・TLS・タイムアウトは実装側の責務。
//! ここでは `request(method, url, headers, body) -> (status, headers, bodyText)` だけを定義する。

use async_trait::async_trait;

use crate::domain::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Raw response as the transport saw it.
///
/// `headers` keeps every pair in transport order, including repeated names;
/// flattening is the executor's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// # Thread Safety
/// - `Send + Sync` を要求（Executor が `&self` で呼ぶため）
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
