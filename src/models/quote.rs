use serde::{Deserialize, Serialize};

/// 报价单行项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl QuoteLineItem {
    /// 行金额 = 数量 × 单价
    pub fn amount(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// 报价单表单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteForm {
    pub quote_number: String,
    pub quote_date: String,
    pub validity_date: String,
    pub client_name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// 签署人邮箱，同时写进 Smart Anchor
    pub signer_email: String,
    #[serde(default)]
    pub line_items: Vec<QuoteLineItem>,
    #[serde(default)]
    pub tax_rate_percent: f64,
}

/// 报价单合计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

impl QuoteForm {
    pub fn totals(&self) -> QuoteTotals {
        let subtotal: f64 = self.line_items.iter().map(QuoteLineItem::amount).sum();
        let tax_amount = subtotal * self.tax_rate_percent / 100.0;
        QuoteTotals {
            subtotal,
            tax_amount,
            total: subtotal + tax_amount,
        }
    }

    /// 默认信封标题
    pub fn envelope_title(&self) -> String {
        format!("Quote {} - {}", self.quote_number, self.client_name)
    }
}
