use crate::error::{AppError, AppResult};
use crate::models::quote::QuoteForm;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载报价单表单
pub async fn load_quote_form(toml_file_path: &Path) -> AppResult<QuoteForm> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::storage(toml_file_path.display().to_string(), e))?;

    let form = parse_quote_form(&content).map_err(|e| {
        AppError::Document(format!(
            "Invalid quote form {}: {}",
            toml_file_path.display(),
            e
        ))
    })?;

    tracing::info!(
        "成功加载报价单 {} ({} 个行项目)",
        form.quote_number,
        form.line_items.len()
    );

    Ok(form)
}

/// 解析 TOML 文本并做基本校验
pub fn parse_quote_form(content: &str) -> Result<QuoteForm, String> {
    let form: QuoteForm = toml::from_str(content).map_err(|e| e.to_string())?;

    if form.signer_email.trim().is_empty() {
        return Err("signerEmail must not be empty".to_string());
    }
    if form.line_items.iter().any(|i| i.quantity < 0.0 || i.unit_price < 0.0) {
        return Err("line item quantity and unitPrice must not be negative".to_string());
    }

    Ok(form)
}
