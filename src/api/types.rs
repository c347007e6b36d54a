//! Subnoto 公共 API 的请求 / 响应结构
//!
//! 字段名与远程服务的 JSON 保持一致（camelCase）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 信封状态（远程服务持有状态机，这里只读）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Uploading,
    Draft,
    Approving,
    Signing,
    Complete,
    Declined,
    Canceled,
}

impl EnvelopeStatus {
    /// 终态：签署完成、被拒绝或被取消
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnvelopeStatus::Complete | EnvelopeStatus::Declined | EnvelopeStatus::Canceled
        )
    }

    /// 仍可继续签署
    pub fn is_unsigned(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeStatus::Uploading => "uploading",
            EnvelopeStatus::Draft => "draft",
            EnvelopeStatus::Approving => "approving",
            EnvelopeStatus::Signing => "signing",
            EnvelopeStatus::Complete => "complete",
            EnvelopeStatus::Declined => "declined",
            EnvelopeStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(EnvelopeStatus::Uploading),
            "draft" => Ok(EnvelopeStatus::Draft),
            "approving" => Ok(EnvelopeStatus::Approving),
            "signing" => Ok(EnvelopeStatus::Signing),
            "complete" => Ok(EnvelopeStatus::Complete),
            "declined" => Ok(EnvelopeStatus::Declined),
            "canceled" => Ok(EnvelopeStatus::Canceled),
            other => Err(format!("Unknown envelope status: {}", other)),
        }
    }
}

/// 上传文档（multipart 表单）
#[derive(Debug, Clone, PartialEq)]
pub struct UploadDocumentRequest {
    pub workspace_uuid: String,
    pub envelope_title: String,
    pub file_name: String,
    pub file: Vec<u8>,
    /// 让服务端识别文档里的 Smart Anchor
    pub detect_smart_anchors: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentResponse {
    pub envelope_uuid: Option<String>,
    pub document_uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(rename = "type")]
    pub kind: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
}

impl Recipient {
    /// 手动添加的签署人
    pub fn manual(email: impl Into<String>, firstname: &str, lastname: &str) -> Self {
        Self {
            kind: "manual".to_string(),
            email: email.into(),
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecipientsRequest {
    pub workspace_uuid: String,
    pub envelope_uuid: String,
    pub recipients: Vec<Recipient>,
}

/// 签名位置块
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlock {
    #[serde(rename = "type")]
    pub kind: String,
    /// 远程接口要求页码为字符串
    pub page: String,
    pub x: u32,
    pub y: u32,
    pub recipient_email: String,
}

impl SignatureBlock {
    pub fn signature(page: u32, x: u32, y: u32, recipient_email: impl Into<String>) -> Self {
        Self {
            kind: "signature".to_string(),
            page: page.to_string(),
            x,
            y,
            recipient_email: recipient_email.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBlocksRequest {
    pub workspace_uuid: String,
    pub envelope_uuid: String,
    pub document_uuid: String,
    pub blocks: Vec<SignatureBlock>,
}

/// 分发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMethod {
    /// 不发邮件，签署链接通过 iframe 交付
    None,
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEnvelopeRequest {
    pub workspace_uuid: String,
    pub envelope_uuid: String,
    pub distribution_method: DistributionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IframeTokenRequest {
    pub workspace_uuid: String,
    pub envelope_uuid: String,
    pub signer_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IframeTokenResponse {
    pub iframe_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEnvelopeRequest {
    pub workspace_uuid: String,
    pub envelope_uuid: String,
}

/// 只取用得到的字段，其余忽略
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEnvelopeResponse {
    pub status: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoamiResponse {
    pub team_uuid: String,
    pub team_name: String,
    pub owner_email: String,
    pub owner_uuid: String,
    pub access_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_terminal_split() {
        let unsigned = ["uploading", "draft", "approving", "signing"];
        let terminal = ["complete", "declined", "canceled"];

        for s in unsigned {
            assert!(s.parse::<EnvelopeStatus>().unwrap().is_unsigned(), "{s}");
        }
        for s in terminal {
            assert!(s.parse::<EnvelopeStatus>().unwrap().is_terminal(), "{s}");
        }
        assert!("archived".parse::<EnvelopeStatus>().is_err());
    }

    #[test]
    fn test_block_serializes_page_as_string() {
        let block = SignatureBlock::signature(1, 100, 400, "a@b.c");
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "signature", "page": "1", "x": 100, "y": 400, "recipientEmail": "a@b.c"})
        );
    }

    #[test]
    fn test_send_request_uses_none_distribution() {
        let req = SendEnvelopeRequest {
            workspace_uuid: "ws".into(),
            envelope_uuid: "env".into(),
            distribution_method: DistributionMethod::None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["distributionMethod"], "none");
        assert_eq!(value["workspaceUuid"], "ws");
    }
}
