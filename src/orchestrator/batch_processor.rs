//! 批量信封处理器 - 编排层
//!
//! ## 职责
//!
//! 用同一份文档连续创建 N 个信封，每个信封使用随机标题。
//!
//! ## 设计特点
//!
//! - **顺序执行**：一个完成（或失败）后等待固定间隔，再开始下一个
//! - **不提前终止**：单个失败只记录在结果里，后续照常执行
//! - **固定间隔**：失败不会拉长等待时间
//! - **向下委托**：每个信封交给 `EnvelopeFlow` 处理

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::api::SigningApi;
use crate::error::{AppError, AppResult};
use crate::services::title_generator::random_title;
use crate::utils::logging::{log_batch_item, print_batch_stats};
use crate::workflow::{EnvelopeCtx, EnvelopeFlow};

/// 单个信封的处理结果（顺序与提交顺序一致）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchItem {
    Created {
        envelope_uuid: String,
        document_uuid: String,
        title: String,
    },
    Failed {
        error: String,
    },
}

impl BatchItem {
    pub fn is_created(&self) -> bool {
        matches!(self, BatchItem::Created { .. })
    }
}

/// 批次统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchStats {
    pub fn from_items(items: &[BatchItem]) -> Self {
        let success = items.iter().filter(|i| i.is_created()).count();
        Self {
            success,
            failed: items.len() - success,
            total: items.len(),
        }
    }
}

/// 批量信封处理器
pub struct BatchRunner<'a, A: SigningApi> {
    flow: &'a EnvelopeFlow<A>,
}

impl<'a, A: SigningApi> BatchRunner<'a, A> {
    pub fn new(flow: &'a EnvelopeFlow<A>) -> Self {
        Self { flow }
    }

    /// 顺序创建 `count` 个信封
    ///
    /// # 参数
    /// - `document`: 每个信封共用的 PDF
    /// - `signer_email`: 签署人
    /// - `count`: 信封数量，必须大于 0
    /// - `delay_ms`: 相邻两次请求之间的等待（毫秒）
    /// - `rng`: 标题使用的随机源
    ///
    /// # 返回
    /// 长度等于 `count` 的结果列表
    pub async fn run_batch<R>(
        &self,
        document: &[u8],
        signer_email: &str,
        count: usize,
        delay_ms: u64,
        rng: &mut R,
    ) -> AppResult<Vec<BatchItem>>
    where
        R: Rng + Send + ?Sized,
    {
        if count == 0 {
            return Err(AppError::validation("Batch count must be at least 1"));
        }

        info!("📦 开始批量创建 {} 个信封，间隔 {} ms", count, delay_ms);

        let mut items = Vec::with_capacity(count);

        for index in 0..count {
            let title = random_title(rng);
            let ctx = EnvelopeCtx::new(document, &title, signer_email)
                .with_file_name("sample-multipage.pdf");

            let item = match self.flow.create_envelope(&ctx).await {
                Ok(created) => BatchItem::Created {
                    envelope_uuid: created.envelope_uuid,
                    document_uuid: created.document_uuid,
                    title,
                },
                Err(e) => {
                    error!("[信封 {}/{}] ❌ 创建失败: {}", index + 1, count, e);
                    BatchItem::Failed {
                        error: e.to_string(),
                    }
                }
            };

            log_batch_item(index + 1, count, &item);
            items.push(item);

            if index + 1 < count {
                sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        print_batch_stats(&BatchStats::from_items(&items));
        Ok(items)
    }
}
