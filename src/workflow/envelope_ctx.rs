//! 信封创建上下文
//!
//! 封装"把哪份文档、以什么标题、交给谁签、签名放在哪"这一信息

use std::fmt::Display;

use crate::error::{AppError, AppResult};

/// 默认签名块位置：第 1 页 (100, 400)
pub const DEFAULT_BLOCK_PAGE: u32 = 1;
pub const DEFAULT_BLOCK_X: u32 = 100;
pub const DEFAULT_BLOCK_Y: u32 = 400;

/// 演示用签署人姓名
pub const SIGNER_FIRSTNAME: &str = "Demo";
pub const SIGNER_LASTNAME: &str = "Signer";

/// 签名位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// 按坐标添加签名块
    Coordinates { page: u32, x: u32, y: u32 },
    /// 文档内容里已嵌入 Smart Anchor，跳过添加签名块
    SmartAnchor,
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Coordinates {
            page: DEFAULT_BLOCK_PAGE,
            x: DEFAULT_BLOCK_X,
            y: DEFAULT_BLOCK_Y,
        }
    }
}

/// 信封创建上下文
#[derive(Debug, Clone)]
pub struct EnvelopeCtx<'a> {
    /// PDF 原始字节
    pub document: &'a [u8],
    /// 信封标题
    pub title: &'a str,
    /// 签署人邮箱
    pub signer_email: &'a str,
    /// 签名位置
    pub placement: Placement,
    /// 上传时的文件名
    pub file_name: &'a str,
}

impl<'a> EnvelopeCtx<'a> {
    pub fn new(document: &'a [u8], title: &'a str, signer_email: &'a str) -> Self {
        Self {
            document,
            title,
            signer_email,
            placement: Placement::default(),
            file_name: "document.pdf",
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_file_name(mut self, file_name: &'a str) -> Self {
        self.file_name = file_name;
        self
    }

    /// 本地校验，任何远程调用之前执行
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Envelope title must not be empty"));
        }
        if self.signer_email.trim().is_empty() {
            return Err(AppError::validation("Signer email must not be empty"));
        }
        validate_pdf(self.document)
    }
}

impl Display for EnvelopeCtx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[信封 \"{}\" 签署人#{} {} 字节]",
            self.title,
            self.signer_email,
            self.document.len()
        )
    }
}

/// 检查 PDF 文件头
pub fn validate_pdf(document: &[u8]) -> AppResult<()> {
    if document.is_empty() {
        return Err(AppError::validation("Invalid PDF data: document is empty"));
    }
    if !document.starts_with(b"%PDF-") {
        return Err(AppError::validation("Invalid PDF data"));
    }
    Ok(())
}
