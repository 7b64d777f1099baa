//! RequestExecutor - タスクを HTTP 呼び出しに変換し、結果を正規化する
//!
//! # フロー
//! 1. 入力検証（URL 必須、メソッド）: 失敗時はネットワーク呼び出しをしない
//! 2. `HttpTransport::request()` で送信
//! 3. レスポンスを `{status, headers, data}` に正規化
//!
//! Coordinator には依存しない。

use tracing::debug;

use crate::domain::{RequestError, RequestOutput, TaskDescription, flatten_headers};
use crate::ports::{HttpRequest, HttpTransport};

const CONTENT_TYPE: &str = "content-type";
const JSON_CONTENT_TYPE: &str = "application/json";

pub struct RequestExecutor<H> {
    transport: H,
}

impl<H: HttpTransport> RequestExecutor<H> {
    pub fn new(transport: H) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &H {
        &self.transport
    }

    /// 検証済みの `HttpRequest` を組み立てる（送信はしない）
    ///
    /// body があり、`content-type` が指定されていなければ JSON を付与する。
    pub fn build_request(task: &TaskDescription) -> Result<HttpRequest, RequestError> {
        let inputs = &task.inputs;
        let url = inputs.url()?.to_string();
        let method = inputs.method()?;
        let body = inputs.body_text();

        let mut headers: Vec<(String, String)> = inputs
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let has_content_type = headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE));
        if body.is_some() && !has_content_type {
            headers.push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// タスクを実行して正規化済みの結果を返す
    pub async fn execute(&self, task: &TaskDescription) -> Result<RequestOutput, RequestError> {
        let request = Self::build_request(task)?;
        debug!(
            method = %request.method,
            url = %request.url,
            has_body = request.body.is_some(),
            "sending request"
        );

        let response = self.transport.request(request).await?;
        debug!(status = response.status, bytes = response.body.len(), "response received");

        Ok(RequestOutput::new(
            response.status,
            flatten_headers(response.headers),
            response.body,
        ))
    }

    /// 生メッセージをパースしてから `execute()`
    pub async fn execute_message(&self, message: &str) -> Result<RequestOutput, RequestError> {
        let task = TaskDescription::parse(message)?;
        self.execute(&task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TransportError, ValidationError};
    use crate::ports::HttpResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// 呼び出しを記録し、固定レスポンスを返す
    struct RecordingTransport {
        calls: Mutex<Vec<HttpRequest>>,
        response: Result<HttpResponse, TransportError>,
    }

    impl RecordingTransport {
        fn replying(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Ok(HttpResponse {
                    status,
                    headers: headers
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    body: body.to_string(),
                }),
            }
        }

        fn failing(err: TransportError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Err(err),
            }
        }

        fn calls(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(request);
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn missing_url_makes_no_call() {
        let executor = RequestExecutor::new(RecordingTransport::replying(200, &[], ""));

        let err = executor
            .execute_message(r#"{"inputs":{"method":"GET"}}"#)
            .await
            .unwrap_err();

        assert_eq!(err, RequestError::Validation(ValidationError::MissingUrl));
        assert_eq!(err.to_string(), "URL is required in the inputs");
        assert!(executor.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn get_is_default_and_no_body_is_sent() {
        let executor = RequestExecutor::new(RecordingTransport::replying(200, &[], "ok"));

        executor
            .execute_message(r#"{"inputs":{"url":"http://x/test"}}"#)
            .await
            .unwrap();

        let calls = executor.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].url, "http://x/test");
        assert_eq!(calls[0].body, None);
        assert!(calls[0].headers.is_empty());
    }

    #[tokio::test]
    async fn post_body_is_json_serialized() {
        let executor = RequestExecutor::new(RecordingTransport::replying(201, &[], ""));

        executor
            .execute_message(r#"{"inputs":{"url":"http://x/test","method":"POST","body":{"k":"v"}}}"#)
            .await
            .unwrap();

        let call = &executor.transport().calls()[0];
        assert_eq!(call.method, "POST");
        assert_eq!(call.body.as_deref(), Some(r#"{"k":"v"}"#));
        assert!(
            call.headers
                .contains(&("content-type".to_string(), "application/json".to_string()))
        );
    }

    #[tokio::test]
    async fn caller_content_type_is_kept() {
        let executor = RequestExecutor::new(RecordingTransport::replying(200, &[], ""));

        executor
            .execute_message(
                r#"{"inputs":{"url":"http://x","method":"PUT","headers":{"Content-Type":"application/vnd.api+json"},"body":[1]}}"#,
            )
            .await
            .unwrap();

        let call = &executor.transport().calls()[0];
        assert_eq!(
            call.headers,
            vec![("Content-Type".to_string(), "application/vnd.api+json".to_string())]
        );
    }

    #[tokio::test]
    async fn json_response_is_parsed() {
        let executor = RequestExecutor::new(RecordingTransport::replying(
            200,
            &[("content-type", "application/json")],
            r#"{"a":1}"#,
        ));

        let output = executor
            .execute_message(r#"{"inputs":{"url":"http://x"}}"#)
            .await
            .unwrap();

        assert_eq!(output.status, 200);
        assert_eq!(output.data, json!({"a": 1}));
        assert_eq!(output.headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn text_response_is_kept_raw() {
        let executor = RequestExecutor::new(RecordingTransport::replying(500, &[], "not json"));

        let output = executor
            .execute_message(r#"{"inputs":{"url":"http://x"}}"#)
            .await
            .unwrap();

        assert_eq!(output.status, 500);
        assert_eq!(output.data, json!("not json"));
    }

    #[tokio::test]
    async fn repeated_response_headers_keep_last_value() {
        let executor = RequestExecutor::new(RecordingTransport::replying(
            200,
            &[("set-cookie", "a=1"), ("set-cookie", "b=2")],
            "",
        ));

        let output = executor
            .execute_message(r#"{"inputs":{"url":"http://x"}}"#)
            .await
            .unwrap();

        assert_eq!(output.headers.len(), 1);
        assert_eq!(output.headers["set-cookie"], "b=2");
    }

    #[tokio::test]
    async fn transport_failure_is_forwarded() {
        let executor = RequestExecutor::new(RecordingTransport::failing(TransportError::Request(
            "error sending request: connection refused".into(),
        )));

        let err = executor
            .execute_message(r#"{"inputs":{"url":"http://x"}}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, RequestError::Transport(_)));
        assert_eq!(err.to_string(), "error sending request: connection refused");
    }

    #[tokio::test]
    async fn unparseable_message_makes_no_call() {
        let executor = RequestExecutor::new(RecordingTransport::replying(200, &[], ""));

        let err = executor.execute_message("{not json").await.unwrap_err();

        assert!(matches!(
            err,
            RequestError::Validation(ValidationError::MalformedMessage(_))
        ));
        assert!(executor.transport().calls().is_empty());
    }
}
