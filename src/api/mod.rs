//! API 模块
//!
//! 定义与 Subnoto 签署服务交互的契约；具体 HTTP 实现在 `clients/`

pub mod types;

use async_trait::async_trait;

use crate::error::ApiError;

pub use types::{
    AddBlocksRequest, AddRecipientsRequest, DistributionMethod, EnvelopeStatus,
    GetEnvelopeRequest, GetEnvelopeResponse, IframeTokenRequest, IframeTokenResponse, Recipient,
    SendEnvelopeRequest, SignatureBlock, UploadDocumentRequest, UploadDocumentResponse,
    WhoamiResponse,
};

/// 远程签署服务
///
/// 每个方法对应一个远程接口。实现方负责把所有失败形态归一化为 `ApiError`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SigningApi: Send + Sync {
    async fn upload_document(
        &self,
        request: UploadDocumentRequest,
    ) -> Result<UploadDocumentResponse, ApiError>;

    async fn add_recipients(&self, request: AddRecipientsRequest) -> Result<(), ApiError>;

    async fn add_blocks(&self, request: AddBlocksRequest) -> Result<(), ApiError>;

    async fn send_envelope(&self, request: SendEnvelopeRequest) -> Result<(), ApiError>;

    async fn create_iframe_token(
        &self,
        request: IframeTokenRequest,
    ) -> Result<IframeTokenResponse, ApiError>;

    async fn get_envelope(&self, request: GetEnvelopeRequest)
        -> Result<GetEnvelopeResponse, ApiError>;

    async fn whoami(&self) -> Result<WhoamiResponse, ApiError>;
}
