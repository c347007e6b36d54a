//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 把命令行的每个子命令翻译成一次完整的业务调用：
//! 读取本地文件 → 交给 `EnvelopeFlow` → 写入已保存信封列表 → 返回结果给 CLI。
//!
//! ## 设计特点
//!
//! - **配置先行**：`App` 只能由 `Config` 构造，配置错误一定发生在任何远程调用之前
//! - **可替换实现**：`with_api` 注入任意 `SigningApi`，测试中使用 mock
//! - **链接不落盘**：iframe token 短期有效，每次展示都重新签发

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::{info, warn};

use crate::api::{EnvelopeStatus, SigningApi};
use crate::clients::SubnotoClient;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::load_quote_form;
use crate::orchestrator::batch_processor::{BatchItem, BatchRunner};
use crate::services::ledger::{scan, EnvelopeLedger, SavedEnvelopeRecord};
use crate::services::quote_pdf::QuotePdfBuilder;
use crate::services::title_generator::random_title;
use crate::utils::logging::truncate_uuid;
use crate::workflow::{AccountInfo, CreatedEnvelope, EnvelopeCtx, EnvelopeFlow, Placement, SigningLink};

/// 示例 PDF 上传时使用的文件名
const SAMPLE_FILE_NAME: &str = "sample-multipage.pdf";

/// 创建并可直接签署的信封
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableEnvelope {
    pub envelope: CreatedEnvelope,
    pub title: String,
    pub signer_email: String,
    pub link: SigningLink,
}

/// 继续签署列表中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEnvelope {
    pub record: SavedEnvelopeRecord,
    /// 仅在请求链接且签发成功时存在
    pub link: Option<SigningLink>,
}

/// `resume` 的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResumeReport {
    pub pending: Vec<PendingEnvelope>,
    /// 已结束并从列表中移除的数量
    pub pruned: usize,
    /// 状态查询失败、本次未显示的数量
    pub unknown: usize,
}

/// 应用主结构
pub struct App<A: SigningApi> {
    config: Config,
    flow: EnvelopeFlow<A>,
    ledger: EnvelopeLedger,
}

impl App<SubnotoClient> {
    /// 初始化应用（使用真实的 HTTP 客户端）
    pub fn initialize(config: Config) -> AppResult<Self> {
        let client = SubnotoClient::new(&config)?;
        Ok(Self::with_api(client, config))
    }
}

impl<A: SigningApi> App<A> {
    pub fn with_api(api: A, config: Config) -> Self {
        let flow = EnvelopeFlow::new(api, &config);
        let ledger = EnvelopeLedger::new(&config.ledger_path);
        Self {
            config,
            flow,
            ledger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &EnvelopeLedger {
        &self.ledger
    }

    /// 用示例 PDF 创建信封并签发签署链接
    ///
    /// # 参数
    /// - `title`: 信封标题，缺省时随机生成
    /// - `signer`: 签署人邮箱，缺省时使用 API key 所属账号的邮箱
    pub async fn create_and_sign(
        &self,
        title: Option<&str>,
        signer: Option<&str>,
    ) -> AppResult<SignableEnvelope> {
        let document = self.read_sample_pdf().await?;
        let signer_email = self.resolve_signer(signer).await?;
        let title = match title {
            Some(t) => t.to_string(),
            None => random_title(&mut StdRng::from_entropy()),
        };

        let ctx = EnvelopeCtx::new(&document, &title, &signer_email).with_file_name(SAMPLE_FILE_NAME);
        let envelope = self.flow.create_envelope(&ctx).await?;
        self.ledger
            .save(&envelope.envelope_uuid, Some(signer_email.as_str()))?;

        let link = self
            .flow
            .issue_signing_link(&envelope.envelope_uuid, &signer_email)
            .await?;

        Ok(SignableEnvelope {
            envelope,
            title,
            signer_email,
            link,
        })
    }

    /// 从报价单表单生成带 Smart Anchor 的 PDF，创建信封并签发链接
    pub async fn create_quote(
        &self,
        form_path: &Path,
        title: Option<&str>,
    ) -> AppResult<SignableEnvelope> {
        let form = load_quote_form(form_path).await?;
        let document = QuotePdfBuilder::new().render(&form)?;
        info!("🧾 报价单 PDF 已生成 ({} 字节)", document.len());

        let title = title
            .map(|t| t.to_string())
            .unwrap_or_else(|| form.envelope_title());
        let file_name = format!("quote-{}.pdf", form.quote_number);

        let ctx = EnvelopeCtx::new(&document, &title, &form.signer_email)
            .with_placement(Placement::SmartAnchor)
            .with_file_name(&file_name);
        let envelope = self.flow.create_envelope(&ctx).await?;
        self.ledger
            .save(&envelope.envelope_uuid, Some(form.signer_email.as_str()))?;

        let link = self
            .flow
            .issue_signing_link(&envelope.envelope_uuid, &form.signer_email)
            .await?;

        Ok(SignableEnvelope {
            envelope,
            title,
            signer_email: form.signer_email,
            link,
        })
    }

    /// 批量创建信封，签署人为 API key 所属账号
    pub async fn batch(&self, count: usize, delay_ms: u64) -> AppResult<Vec<BatchItem>> {
        if count == 0 {
            return Err(AppError::validation("Batch count must be at least 1"));
        }
        let document = self.read_sample_pdf().await?;
        let signer_email = self.flow.owner_email().await?;

        let mut rng = StdRng::from_entropy();
        BatchRunner::new(&self.flow)
            .run_batch(&document, &signer_email, count, delay_ms, &mut rng)
            .await
    }

    /// 列出仍可继续签署的信封，并移除已结束的记录
    ///
    /// # 参数
    /// - `with_links`: 是否为每个信封重新签发签署链接
    pub async fn resume(&self, with_links: bool) -> AppResult<ResumeReport> {
        let records = self.ledger.load();
        info!("📁 已保存 {} 个信封，正在查询状态...", records.len());

        let result = scan(records, &self.flow).await;
        let pruned = self.ledger.prune(&result.terminal)?;

        // 账号邮箱只查询一次；查询失败时这些记录不签发链接，列表照常返回
        let mut owner_email: Option<Option<String>> = None;
        let mut pending = Vec::with_capacity(result.unsigned.len());

        for record in result.unsigned {
            let link = if with_links {
                let signer = match &record.signer_email {
                    Some(email) => Some(email.clone()),
                    None => {
                        if owner_email.is_none() {
                            owner_email = Some(self.lookup_owner_email().await);
                        }
                        owner_email.clone().flatten()
                    }
                };
                match signer {
                    Some(signer) => self.try_issue_link(&record.envelope_uuid, &signer).await,
                    None => None,
                }
            } else {
                None
            };
            pending.push(PendingEnvelope { record, link });
        }

        Ok(ResumeReport {
            pending,
            pruned,
            unknown: result.unknown,
        })
    }

    /// 为已有信封重新签发签署链接
    pub async fn link(&self, envelope_uuid: &str, signer: Option<&str>) -> AppResult<SigningLink> {
        let signer_email = match signer {
            Some(s) => s.to_string(),
            None => match self.saved_signer(envelope_uuid) {
                Some(email) => email,
                None => self.flow.owner_email().await?,
            },
        };
        self.flow
            .issue_signing_link(envelope_uuid, &signer_email)
            .await
    }

    pub async fn status(&self, envelope_uuid: &str) -> AppResult<EnvelopeStatus> {
        self.flow.query_status(envelope_uuid).await
    }

    pub async fn whoami(&self) -> AppResult<AccountInfo> {
        self.flow.whoami().await
    }

    async fn lookup_owner_email(&self) -> Option<String> {
        match self.flow.owner_email().await {
            Ok(email) => Some(email),
            Err(e) => {
                warn!("⚠️ 无法获取账号邮箱，未保存签署人的信封不签发链接: {}", e);
                None
            }
        }
    }

    async fn try_issue_link(&self, envelope_uuid: &str, signer: &str) -> Option<SigningLink> {
        match self.flow.issue_signing_link(envelope_uuid, signer).await {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(
                    "⚠️ 信封 {} 签发链接失败: {}",
                    truncate_uuid(envelope_uuid, 12),
                    e
                );
                None
            }
        }
    }

    async fn resolve_signer(&self, signer: Option<&str>) -> AppResult<String> {
        match signer.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Ok(s.to_string()),
            None => self.flow.owner_email().await,
        }
    }

    fn saved_signer(&self, envelope_uuid: &str) -> Option<String> {
        self.ledger
            .load()
            .into_iter()
            .find(|r| r.envelope_uuid == envelope_uuid)
            .and_then(|r| r.signer_email)
    }

    async fn read_sample_pdf(&self) -> AppResult<Vec<u8>> {
        let path = &self.config.sample_pdf_path;
        tokio::fs::read(path)
            .await
            .map_err(|e| AppError::storage(path.as_str(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        GetEnvelopeResponse, IframeTokenResponse, MockSigningApi, UploadDocumentResponse,
        WhoamiResponse,
    };
    use std::collections::HashMap;
    use tempfile::TempDir;

    const PDF: &[u8] = b"%PDF-1.4\n%demo\n";

    fn config_in(dir: &TempDir) -> Config {
        let env = HashMap::from([
            ("SUBNOTO_BASE_URL", "https://enclave.subnoto.com".to_string()),
            ("SUBNOTO_ACCESS_KEY", "ak".to_string()),
            ("SUBNOTO_SECRET_KEY", "sk".to_string()),
            ("WORKSPACE_UUID", "ws".to_string()),
        ]);
        let mut config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        config.ledger_path = dir.path().join("ledger.json").display().to_string();
        config.sample_pdf_path = dir.path().join("sample.pdf").display().to_string();
        std::fs::write(&config.sample_pdf_path, PDF).unwrap();
        config
    }

    fn whoami() -> WhoamiResponse {
        WhoamiResponse {
            team_uuid: "team".to_string(),
            team_name: "Acme".to_string(),
            owner_email: "owner@acme.io".to_string(),
            owner_uuid: "user".to_string(),
            access_key: "ak".to_string(),
        }
    }

    fn expect_create(api: &mut MockSigningApi) {
        api.expect_upload_document().times(1).returning(|_| {
            Ok(UploadDocumentResponse {
                envelope_uuid: Some("env-1".to_string()),
                document_uuid: Some("doc-1".to_string()),
            })
        });
        api.expect_add_recipients().times(1).returning(|_| Ok(()));
        api.expect_send_envelope().times(1).returning(|_| Ok(()));
    }

    fn token(value: &str) -> Result<IframeTokenResponse, crate::error::ApiError> {
        Ok(IframeTokenResponse {
            iframe_token: Some(value.to_string()),
        })
    }

    fn status(value: &str) -> Result<GetEnvelopeResponse, crate::error::ApiError> {
        Ok(GetEnvelopeResponse {
            status: Some(value.to_string()),
            title: None,
        })
    }

    #[tokio::test]
    async fn test_create_and_sign_saves_and_links() {
        let dir = TempDir::new().unwrap();
        let mut api = MockSigningApi::new();
        expect_create(&mut api);
        api.expect_add_blocks().times(1).returning(|_| Ok(()));
        api.expect_whoami().never();
        api.expect_create_iframe_token()
            .withf(|req| req.envelope_uuid == "env-1" && req.signer_email == "s@example.com")
            .times(1)
            .returning(|_| token("tok"));

        let app = App::with_api(api, config_in(&dir));
        let created = app
            .create_and_sign(Some("Contract"), Some("s@example.com"))
            .await
            .unwrap();

        assert_eq!(created.title, "Contract");
        assert_eq!(created.link.iframe_url, "https://app.subnoto.com/embeds/sign#t=tok");

        let records = app.ledger().load();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].envelope_uuid, "env-1");
        assert_eq!(records[0].signer_email.as_deref(), Some("s@example.com"));
    }

    #[tokio::test]
    async fn test_default_signer_is_account_owner() {
        let dir = TempDir::new().unwrap();
        let mut api = MockSigningApi::new();
        api.expect_whoami().times(1).returning(|| Ok(whoami()));
        expect_create(&mut api);
        api.expect_add_blocks()
            .withf(|req| req.blocks[0].recipient_email == "owner@acme.io")
            .times(1)
            .returning(|_| Ok(()));
        api.expect_create_iframe_token().returning(|_| token("tok"));

        let app = App::with_api(api, config_in(&dir));
        let created = app.create_and_sign(None, None).await.unwrap();
        assert_eq!(created.signer_email, "owner@acme.io");
        assert!(!created.title.is_empty());
    }

    #[tokio::test]
    async fn test_missing_sample_pdf_makes_no_remote_call() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.sample_pdf_path = dir.path().join("nope.pdf").display().to_string();

        let app = App::with_api(MockSigningApi::new(), config);
        let err = app
            .create_and_sign(None, Some("s@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "StorageError");
    }

    #[tokio::test]
    async fn test_failed_creation_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let mut api = MockSigningApi::new();
        api.expect_upload_document()
            .returning(|_| Err(crate::error::ApiError::remote(None, None)));

        let app = App::with_api(api, config_in(&dir));
        let err = app
            .create_and_sign(Some("t"), Some("s@example.com"))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "UploadError");
        assert!(app.ledger().load().is_empty());
    }

    #[tokio::test]
    async fn test_quote_uses_smart_anchor_and_saves_signer() {
        let dir = TempDir::new().unwrap();
        let form_path = dir.path().join("quote.toml");
        std::fs::write(
            &form_path,
            r#"
quoteNumber = "Q-9"
quoteDate = "2025-01-01"
validityDate = "2025-02-01"
clientName = "Jane"
signerEmail = "jane@acme.io"
taxRatePercent = 20

[[lineItems]]
description = "Work"
quantity = 2
unitPrice = 100
"#,
        )
        .unwrap();

        let mut api = MockSigningApi::new();
        api.expect_upload_document()
            .withf(|req| {
                req.detect_smart_anchors
                    && req.envelope_title == "Quote Q-9 - Jane"
                    && req.file_name == "quote-Q-9.pdf"
                    && req.file.starts_with(b"%PDF-")
            })
            .times(1)
            .returning(|_| {
                Ok(UploadDocumentResponse {
                    envelope_uuid: Some("env-q".to_string()),
                    document_uuid: Some("doc-q".to_string()),
                })
            });
        api.expect_add_recipients().never();
        api.expect_add_blocks().never();
        api.expect_send_envelope().times(1).returning(|_| Ok(()));
        api.expect_create_iframe_token()
            .withf(|req| req.signer_email == "jane@acme.io")
            .returning(|_| token("q"));

        let app = App::with_api(api, config_in(&dir));
        let created = app.create_quote(&form_path, None).await.unwrap();

        assert_eq!(created.envelope.envelope_uuid, "env-q");
        let records = app.ledger().load();
        assert_eq!(records[0].signer_email.as_deref(), Some("jane@acme.io"));
    }

    #[tokio::test]
    async fn test_resume_prunes_finished_and_links_pending() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let ledger = EnvelopeLedger::new(&config.ledger_path);
        ledger.save("draft", Some("a@example.com")).unwrap();
        ledger.save("done", None).unwrap();
        ledger.save("lost", None).unwrap();
        ledger.save("signing", None).unwrap();

        let statuses = HashMap::from([("draft", "draft"), ("done", "complete"), ("signing", "signing")]);
        let mut api = MockSigningApi::new();
        api.expect_get_envelope().returning(move |req| {
            match statuses.get(req.envelope_uuid.as_str()) {
                Some(s) => status(s),
                None => Err(crate::error::ApiError::remote(None, None)),
            }
        });
        api.expect_whoami().times(1).returning(|| Ok(whoami()));
        api.expect_create_iframe_token()
            .returning(|req| token(&format!("{}-{}", req.envelope_uuid, req.signer_email)));

        let app = App::with_api(api, config);
        let report = app.resume(true).await.unwrap();

        assert_eq!(report.pruned, 1);
        assert_eq!(report.unknown, 1);
        let links: Vec<_> = report
            .pending
            .iter()
            .map(|p| p.link.as_ref().unwrap().iframe_url.as_str())
            .collect();
        assert_eq!(
            links,
            vec![
                "https://app.subnoto.com/embeds/sign#t=draft-a@example.com",
                "https://app.subnoto.com/embeds/sign#t=signing-owner@acme.io",
            ]
        );

        // 已结束的被移除，查询失败的保留
        let uuids: Vec<_> = app.ledger().load().into_iter().map(|r| r.envelope_uuid).collect();
        assert_eq!(uuids, vec!["draft", "lost", "signing"]);
    }

    #[tokio::test]
    async fn test_resume_keeps_listing_when_owner_lookup_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let ledger = EnvelopeLedger::new(&config.ledger_path);
        ledger.save("has-signer", Some("a@x.io")).unwrap();
        ledger.save("no-signer", None).unwrap();
        ledger.save("no-signer-2", None).unwrap();
        ledger.save("done", None).unwrap();

        let mut api = MockSigningApi::new();
        api.expect_get_envelope().returning(|req| {
            if req.envelope_uuid == "done" {
                status("complete")
            } else {
                status("signing")
            }
        });
        // 账号邮箱只查询一次，失败后不再重试
        api.expect_whoami()
            .times(1)
            .returning(|| Err(crate::error::ApiError::remote(None, None)));
        api.expect_create_iframe_token()
            .withf(|req| req.envelope_uuid == "has-signer")
            .times(1)
            .returning(|_| token("ok"));

        let app = App::with_api(api, config);
        let report = app.resume(true).await.unwrap();

        assert_eq!(report.pruned, 1);
        let listed: Vec<_> = report
            .pending
            .iter()
            .map(|p| (p.record.envelope_uuid.as_str(), p.link.is_some()))
            .collect();
        assert_eq!(
            listed,
            vec![("has-signer", true), ("no-signer", false), ("no-signer-2", false)]
        );

        let uuids: Vec<_> = app.ledger().load().into_iter().map(|r| r.envelope_uuid).collect();
        assert_eq!(uuids, vec!["has-signer", "no-signer", "no-signer-2"]);
    }

    #[tokio::test]
    async fn test_link_prefers_saved_signer() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        EnvelopeLedger::new(&config.ledger_path)
            .save("env-1", Some("saved@example.com"))
            .unwrap();

        let mut api = MockSigningApi::new();
        api.expect_whoami().never();
        api.expect_create_iframe_token()
            .withf(|req| req.signer_email == "saved@example.com")
            .times(1)
            .returning(|_| token("t"));

        let app = App::with_api(api, config);
        let link = app.link("env-1", None).await.unwrap();
        assert!(link.iframe_url.ends_with("#t=t"));
    }

    #[tokio::test]
    async fn test_batch_zero_rejected_before_any_call() {
        let dir = TempDir::new().unwrap();
        let app = App::with_api(MockSigningApi::new(), config_in(&dir));
        let err = app.batch(0, 0).await.unwrap_err();
        assert_eq!(err.category(), "ValidationError");
    }
}
