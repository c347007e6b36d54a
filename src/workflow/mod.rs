//! 流程层（Workflow Layer）
//!
//! 定义"一个信封"从上传到可签署的完整流程

pub mod embed_url;
pub mod envelope_ctx;
pub mod envelope_flow;

pub use embed_url::build_embed_sign_url;
pub use envelope_ctx::{validate_pdf, EnvelopeCtx, Placement};
pub use envelope_flow::{AccountInfo, CreatedEnvelope, EnvelopeFlow, SigningLink};
