//! # Subnoto Embed Demo
//!
//! 通过 Subnoto 签署服务创建信封，并生成可嵌入 iframe 的签署链接
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `api/` - 远程签署服务的契约（`SigningApi`）和请求 / 响应类型
//! - `clients/` - `SubnotoClient`，基于 reqwest 的 HTTP 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `EnvelopeLedger` - 本地保存创建过的信封
//! - `QuotePdfBuilder` - 生成带 Smart Anchor 的报价单 PDF
//! - `random_title` - 随机信封标题
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个信封"的完整处理流程
//! - `EnvelopeCtx` - 上下文封装（文档 + 标题 + 签署人 + 签名位置）
//! - `EnvelopeFlow` - 流程编排（upload → recipients → blocks → send）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，对应每个 CLI 子命令
//! - `orchestrator/batch_processor` - 批量信封处理器
//!
//! ## 模块结构

pub mod api;
pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{EnvelopeStatus, SigningApi};
pub use clients::SubnotoClient;
pub use config::Config;
pub use error::{ApiError, AppError, AppResult, ConfigError, WorkflowStep};
pub use models::QuoteForm;
pub use orchestrator::{App, BatchItem, BatchRunner};
pub use services::{EnvelopeLedger, QuotePdfBuilder};
pub use workflow::{EnvelopeCtx, EnvelopeFlow, Placement};
