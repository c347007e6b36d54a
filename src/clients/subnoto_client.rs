/// Subnoto API 客户端
///
/// 封装所有与签署服务 HTTP 接口相关的调用逻辑
use crate::api::{
    AddBlocksRequest, AddRecipientsRequest, GetEnvelopeRequest, GetEnvelopeResponse,
    IframeTokenRequest, IframeTokenResponse, SendEnvelopeRequest, SigningApi,
    UploadDocumentRequest, UploadDocumentResponse, WhoamiResponse,
};
use crate::config::Config;
use crate::error::{ApiError, ConfigError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const UPLOAD_PATH: &str = "/public/envelope/create-from-file";
const ADD_RECIPIENTS_PATH: &str = "/public/envelope/add-recipients";
const ADD_BLOCKS_PATH: &str = "/public/envelope/add-blocks";
const SEND_PATH: &str = "/public/envelope/send";
const IFRAME_TOKEN_PATH: &str = "/public/authentication/create-iframe-token";
const GET_ENVELOPE_PATH: &str = "/public/envelope/get";
const WHOAMI_PATH: &str = "/public/utils/whoami";

/// Subnoto API 客户端
pub struct SubnotoClient {
    http: reqwest::Client,
    base_url: String,
    access_key: String,
    secret_key: String,
}

impl SubnotoClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::ClientBuildFailed {
                message: e.to_string(),
            })?;

        if !config.unattested {
            warn!("⚠️ 未设置 SUBNOTO_UNATTESTED=true，本客户端不执行 enclave 证明握手");
        }

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 发送 JSON 请求并解析响应
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .json(body)
            .send()
            .await
            .map_err(|e| request_error(&self.base_url, e))?;

        self.read_response(path, response).await
    }

    /// 检查状态码并解析响应体
    async fn read_response<R: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<R, ApiError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| request_error(&self.base_url, e))?;

        debug!("{} 响应: {} ({} 字节)", path, status, text.len());

        if !status.is_success() {
            return Err(ApiError::from_response_body(
                &self.base_url,
                status.as_u16(),
                &text,
            ));
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| {
            ApiError::remote(
                Some("invalid_response".to_string()),
                Some(format!("Invalid response from {}: {}", path, e)),
            )
        })
    }
}

/// 区分"连不上服务"和"服务已响应但请求失败"
///
/// 只有连接失败和超时才提示检查 API / 隧道，其余错误保留原始信息
fn request_error(base_url: &str, err: reqwest::Error) -> ApiError {
    if err.is_connect() || err.is_timeout() {
        ApiError::transport(base_url, err)
    } else {
        ApiError::remote(None, Some(format!("Subnoto API request failed: {}", err)))
    }
}

#[async_trait]
impl SigningApi for SubnotoClient {
    async fn upload_document(
        &self,
        request: UploadDocumentRequest,
    ) -> Result<UploadDocumentResponse, ApiError> {
        let url = format!("{}{}", self.base_url, UPLOAD_PATH);
        debug!(
            "POST {} (标题: {}, {} 字节)",
            url,
            request.envelope_title,
            request.file.len()
        );

        let part = Part::bytes(request.file)
            .file_name(request.file_name)
            .mime_str("application/pdf")
            .map_err(|e| ApiError::remote(None, Some(e.to_string())))?;

        let mut form = Form::new()
            .text("workspaceUuid", request.workspace_uuid)
            .text("envelopeTitle", request.envelope_title)
            .part("file", part);
        if request.detect_smart_anchors {
            form = form.text("detectSmartAnchors", "true");
        }

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(&self.base_url, e))?;

        self.read_response(UPLOAD_PATH, response).await
    }

    async fn add_recipients(&self, request: AddRecipientsRequest) -> Result<(), ApiError> {
        let _: Value = self.post_json(ADD_RECIPIENTS_PATH, &request).await?;
        Ok(())
    }

    async fn add_blocks(&self, request: AddBlocksRequest) -> Result<(), ApiError> {
        let _: Value = self.post_json(ADD_BLOCKS_PATH, &request).await?;
        Ok(())
    }

    async fn send_envelope(&self, request: SendEnvelopeRequest) -> Result<(), ApiError> {
        let _: Value = self.post_json(SEND_PATH, &request).await?;
        Ok(())
    }

    async fn create_iframe_token(
        &self,
        request: IframeTokenRequest,
    ) -> Result<IframeTokenResponse, ApiError> {
        self.post_json(IFRAME_TOKEN_PATH, &request).await
    }

    async fn get_envelope(
        &self,
        request: GetEnvelopeRequest,
    ) -> Result<GetEnvelopeResponse, ApiError> {
        self.post_json(GET_ENVELOPE_PATH, &request).await
    }

    async fn whoami(&self) -> Result<WhoamiResponse, ApiError> {
        self.post_json(WHOAMI_PATH, &json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(base_url: &str) -> Config {
        let env = HashMap::from([
            ("SUBNOTO_BASE_URL", base_url.to_string()),
            ("SUBNOTO_ACCESS_KEY", "ak".to_string()),
            ("SUBNOTO_SECRET_KEY", "sk".to_string()),
            ("WORKSPACE_UUID", "ws".to_string()),
            ("SUBNOTO_UNATTESTED", "true".to_string()),
            ("SUBNOTO_TIMEOUT_SECS", "2".to_string()),
        ]);
        Config::from_lookup(|k| env.get(k).cloned()).unwrap()
    }

    /// 本地单次响应的 HTTP 服务；`reply` 为 None 时只接收请求不响应
    async fn one_shot_server(reply: Option<&'static [u8]>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            match reply {
                Some(bytes) => {
                    let _ = socket.write_all(bytes).await;
                }
                None => tokio::time::sleep(std::time::Duration::from_secs(10)).await,
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = SubnotoClient::new(&config("https://enclave.subnoto.com/")).unwrap();
        assert_eq!(client.base_url(), "https://enclave.subnoto.com");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // 端口 9 (discard) 在测试环境中不会有服务监听
        let client = SubnotoClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client.whoami().await.unwrap_err();

        assert_eq!(err.category(), "TransportError");
        assert!(err
            .to_string()
            .starts_with("Cannot reach Subnoto API at http://127.0.0.1:9."));
    }

    #[tokio::test]
    async fn test_truncated_body_is_not_transport_error() {
        // 响应头声明 100 字节，实际只发送 4 字节后断开
        let base = one_shot_server(Some(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"a\""
                .as_slice(),
        ))
        .await;
        let client = SubnotoClient::new(&config(&base)).unwrap();
        let err = client.whoami().await.unwrap_err();

        assert_eq!(err.category(), "RemoteApiError");
        assert!(!err.to_string().starts_with("Cannot reach Subnoto API"));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let base = one_shot_server(None).await;
        let client = SubnotoClient::new(&config(&base)).unwrap();
        let err = client.whoami().await.unwrap_err();

        assert_eq!(err.category(), "TransportError");
    }
}
