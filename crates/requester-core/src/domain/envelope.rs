//! ResultEnvelope - 出力チャネルに publish する唯一のメッセージ
//!
//! プロセスの生存期間中にちょうど 1 回だけ生成・シリアライズ・publish される。
//!
//! # ワイヤ形式
//! - completed: `{"type":"completed","workflowInstanceId":..,"workflowExtensionId":..,"output":{..}}`
//! - failed: `{"type":"failed","workflowInstanceId":..,"workflowExtensionId":..,"error":".."}`

use serde::{Deserialize, Serialize};

use super::ids::WorkflowIdentity;
use super::outcome::RequestOutput;

/// ResultEnvelope は Completed / Failed のどちらか一方
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ResultEnvelope {
    Completed {
        workflow_instance_id: String,
        workflow_extension_id: String,
        output: RequestOutput,
    },
    Failed {
        workflow_instance_id: String,
        workflow_extension_id: String,
        error: String,
    },
}

impl ResultEnvelope {
    pub fn completed(identity: &WorkflowIdentity, output: RequestOutput) -> Self {
        Self::Completed {
            workflow_instance_id: identity.instance_id.clone(),
            workflow_extension_id: identity.extension_id.clone(),
            output,
        }
    }

    pub fn failed(identity: &WorkflowIdentity, error: impl Into<String>) -> Self {
        Self::Failed {
            workflow_instance_id: identity.instance_id.clone(),
            workflow_extension_id: identity.extension_id.clone(),
            error: error.into(),
        }
    }

    /// `"completed"` / `"failed"`（ログ用）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// 出力チャネルに流す JSON テキスト
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
