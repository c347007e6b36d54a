//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层把 CLI 的一次调用变成完整的业务过程，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 由 `Config` 构造，持有 `EnvelopeFlow` 和已保存信封列表
//! - 读取示例 PDF / 报价单表单
//! - 创建后写入列表，继续签署时清理已结束的信封
//!
//! ### `batch_processor` - 批量信封处理器
//! - 顺序创建 N 个信封，固定间隔
//! - 单个失败不影响后续
//! - 输出批次统计信息
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一个子命令)
//!     ↓
//! batch_processor (处理 N 个信封)
//!     ↓
//! workflow::EnvelopeFlow (处理单个信封)
//!     ↓
//! api::SigningApi (远程签署服务)
//! ```

pub mod app;
pub mod batch_processor;

// 重新导出主要类型
pub use app::{App, PendingEnvelope, ResumeReport, SignableEnvelope};
pub use batch_processor::{BatchItem, BatchRunner, BatchStats};
