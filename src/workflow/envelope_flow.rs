//! 信封处理流程 - 流程层
//!
//! 核心职责：把"一份 PDF"变成"可以在 iframe 里签署的信封"
//!
//! 流程顺序：
//! 1. 上传文档 → 得到 envelope / document ID
//! 2. 添加签署人（Smart Anchor 文档跳过）
//! 3. 添加签名块（Smart Anchor 文档跳过）
//! 4. 发送（分发方式 none，不发邮件）
//!
//! 任一步失败立即返回该步的错误，不重试、不回滚；
//! 远程服务上已创建的半成品信封保持原样。

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::api::{
    AddBlocksRequest, AddRecipientsRequest, DistributionMethod, EnvelopeStatus,
    GetEnvelopeRequest, IframeTokenRequest, Recipient, SendEnvelopeRequest, SignatureBlock,
    SigningApi, UploadDocumentRequest,
};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, WorkflowStep};
use crate::services::ledger::StatusLookup;
use crate::utils::logging::truncate_uuid;
use crate::workflow::embed_url::build_embed_sign_url;
use crate::workflow::envelope_ctx::{EnvelopeCtx, Placement, SIGNER_FIRSTNAME, SIGNER_LASTNAME};

/// 创建成功的信封
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEnvelope {
    pub envelope_uuid: String,
    pub document_uuid: String,
}

/// 嵌入签署链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningLink {
    pub iframe_url: String,
}

/// 账号 / 工作区信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub api_base_url: String,
    pub team_uuid: String,
    pub team_name: String,
    pub owner_email: String,
    pub owner_uuid: String,
    pub access_key: String,
}

/// 信封处理流程
///
/// - 编排创建信封的四个远程步骤
/// - 签发 iframe token 并生成签署链接
/// - 不持有任何本地状态（列表由调用方写入）
pub struct EnvelopeFlow<A: SigningApi> {
    api: A,
    workspace_uuid: String,
    api_base_url: String,
    embed_base_url: String,
}

impl<A: SigningApi> EnvelopeFlow<A> {
    /// 创建新的信封处理流程
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            api,
            workspace_uuid: config.workspace_uuid.clone(),
            api_base_url: config.api_base_url.clone(),
            embed_base_url: config.embed_base_url.clone(),
        }
    }

    /// 创建并发送信封
    pub async fn create_envelope(&self, ctx: &EnvelopeCtx<'_>) -> AppResult<CreatedEnvelope> {
        ctx.validate()?;
        info!("📄 开始创建信封 {}", ctx);

        // ========== 步骤 1: 上传文档 ==========
        info!("步骤 1/4: 上传文档...");
        let uploaded = self
            .api
            .upload_document(UploadDocumentRequest {
                workspace_uuid: self.workspace_uuid.clone(),
                envelope_title: ctx.title.to_string(),
                file_name: ctx.file_name.to_string(),
                file: ctx.document.to_vec(),
                detect_smart_anchors: ctx.placement == Placement::SmartAnchor,
            })
            .await
            .map_err(|e| self.step_failed(WorkflowStep::Upload, e))?;

        let (envelope_uuid, document_uuid) =
            match (uploaded.envelope_uuid, uploaded.document_uuid) {
                (Some(env), Some(doc)) if !env.is_empty() && !doc.is_empty() => (env, doc),
                _ => {
                    return Err(
                        self.step_failed(WorkflowStep::Upload, ApiError::missing("envelope_uuid"))
                    )
                }
            };
        info!(
            "✓ 步骤 1 完成, envelope: {}, document: {}",
            envelope_uuid, document_uuid
        );

        // ========== 步骤 2 / 3: 添加签署人和签名块 ==========
        match ctx.placement {
            Placement::Coordinates { page, x, y } => {
                info!("步骤 2/4: 添加签署人 {}...", ctx.signer_email);
                self.api
                    .add_recipients(AddRecipientsRequest {
                        workspace_uuid: self.workspace_uuid.clone(),
                        envelope_uuid: envelope_uuid.clone(),
                        recipients: vec![Recipient::manual(
                            ctx.signer_email,
                            SIGNER_FIRSTNAME,
                            SIGNER_LASTNAME,
                        )],
                    })
                    .await
                    .map_err(|e| self.step_failed(WorkflowStep::Recipients, e))?;
                info!("✓ 步骤 2 完成");

                info!("步骤 3/4: 添加签名块 (第 {} 页, {}, {})...", page, x, y);
                self.api
                    .add_blocks(AddBlocksRequest {
                        workspace_uuid: self.workspace_uuid.clone(),
                        envelope_uuid: envelope_uuid.clone(),
                        document_uuid: document_uuid.clone(),
                        blocks: vec![SignatureBlock::signature(page, x, y, ctx.signer_email)],
                    })
                    .await
                    .map_err(|e| self.step_failed(WorkflowStep::Blocks, e))?;
                info!("✓ 步骤 3 完成");
            }
            Placement::SmartAnchor => {
                // 签署人和签名位置都由上传时识别的 Smart Anchor 提供
                info!("步骤 2-3/4: 文档内含 Smart Anchor，跳过添加签署人和签名块");
            }
        }

        // ========== 步骤 4: 发送 ==========
        info!("步骤 4/4: 发送信封 (分发方式: none)...");
        self.api
            .send_envelope(SendEnvelopeRequest {
                workspace_uuid: self.workspace_uuid.clone(),
                envelope_uuid: envelope_uuid.clone(),
                distribution_method: DistributionMethod::None,
            })
            .await
            .map_err(|e| self.step_failed(WorkflowStep::Send, e))?;
        info!("✅ 信封已发送: {}", envelope_uuid);

        Ok(CreatedEnvelope {
            envelope_uuid,
            document_uuid,
        })
    }

    /// 签发新的 iframe token 并生成签署链接
    ///
    /// token 短期有效，每次打开签署页面都要重新调用
    pub async fn issue_signing_link(
        &self,
        envelope_uuid: &str,
        signer_email: &str,
    ) -> AppResult<SigningLink> {
        debug!(
            "为信封 {} 签发 iframe token (签署人: {})",
            truncate_uuid(envelope_uuid, 12),
            signer_email
        );

        let response = self
            .api
            .create_iframe_token(IframeTokenRequest {
                workspace_uuid: self.workspace_uuid.clone(),
                envelope_uuid: envelope_uuid.to_string(),
                signer_email: signer_email.to_string(),
            })
            .await
            .map_err(|e| self.step_failed(WorkflowStep::Token, e))?;

        let token = response
            .iframe_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| self.step_failed(WorkflowStep::Token, ApiError::missing("iframe_token")))?;

        Ok(SigningLink {
            iframe_url: build_embed_sign_url(&self.embed_base_url, &token),
        })
    }

    /// 查询信封当前状态
    pub async fn query_status(&self, envelope_uuid: &str) -> AppResult<EnvelopeStatus> {
        let response = self
            .api
            .get_envelope(GetEnvelopeRequest {
                workspace_uuid: self.workspace_uuid.clone(),
                envelope_uuid: envelope_uuid.to_string(),
            })
            .await
            .map_err(|e| WorkflowStep::Status.fail(e))?;

        let status = response
            .status
            .ok_or_else(|| WorkflowStep::Status.fail(ApiError::missing("status")))?;

        status.parse::<EnvelopeStatus>().map_err(|msg| {
            WorkflowStep::Status.fail(ApiError::remote(
                Some("unknown_status".to_string()),
                Some(msg),
            ))
        })
    }

    /// 查询 API key 所属账号
    pub async fn whoami(&self) -> AppResult<AccountInfo> {
        let response = self
            .api
            .whoami()
            .await
            .map_err(|e| self.step_failed(WorkflowStep::Whoami, e))?;

        Ok(AccountInfo {
            api_base_url: self.api_base_url.clone(),
            team_uuid: response.team_uuid,
            team_name: response.team_name,
            owner_email: response.owner_email,
            owner_uuid: response.owner_uuid,
            access_key: response.access_key,
        })
    }

    /// API key 所属账号的邮箱，演示中用作默认签署人
    pub async fn owner_email(&self) -> AppResult<String> {
        let info = self.whoami().await?;
        if info.owner_email.is_empty() {
            return Err(WorkflowStep::Whoami.fail(ApiError::missing("owner_email")));
        }
        Ok(info.owner_email)
    }

    /// 记录并包装失败步骤
    fn step_failed(&self, step: WorkflowStep, source: ApiError) -> AppError {
        error!("❌ {} 失败 ({}): {}", step, source.category(), source);
        step.fail(source)
    }
}

#[async_trait]
impl<A: SigningApi> StatusLookup for EnvelopeFlow<A> {
    async fn lookup_status(&self, envelope_uuid: &str) -> AppResult<EnvelopeStatus> {
        self.query_status(envelope_uuid).await
    }
}
