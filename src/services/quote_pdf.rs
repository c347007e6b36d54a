//! 报价单 PDF 生成 - 业务能力层
//!
//! 只负责"表单 → PDF 字节"，签名位置通过 Smart Anchor 文本嵌入文档，
//! 上传时由签署服务识别，不再需要按坐标添加签名块。

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::quote::QuoteForm;
use crate::utils::logging::truncate_text;

/// A4 尺寸（pt）
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
/// 续页起始 y 坐标，以及内容允许到达的最低 y 坐标
const TOP_Y: i64 = 790;
const BOTTOM_Y: i64 = 60;
/// 签名区高度，与 Smart Anchor 中的签名框一致
const SIGNATURE_HEIGHT: i64 = 60;

/// 表格列的 x 坐标
const COL_DESC: i64 = MARGIN;
const COL_QTY: i64 = 300;
const COL_UNIT: i64 = 360;
const COL_AMOUNT: i64 = 470;

/// 生成 Smart Anchor 文本
///
/// 格式：`{{ 邮箱 | signature | 宽 | 高 }}`
pub fn smart_anchor(signer_email: &str) -> String {
    format!("{{{{ {} | signature | 180 | 60 }}}}", signer_email)
}

/// 金额格式化，例如 `EUR 1,234.50`
pub fn format_eur(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}EUR {}.{:02}", sign, grouped, cents % 100)
}

/// 报价单 PDF 生成器
#[derive(Debug, Default)]
pub struct QuotePdfBuilder;

impl QuotePdfBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 渲染 A4 报价单，行项目过多时自动续页
    ///
    /// 合计与签名区整体保持在同一页内
    pub fn render(&self, form: &QuoteForm) -> AppResult<Vec<u8>> {
        let mut page = PageWriter::new();
        let totals = form.totals();

        page.text(Font::Bold, 18, MARGIN, 790, "Quote");

        // ========== 报价单信息 ==========
        page.text(Font::Regular, 8, MARGIN, 760, "QUOTE NO.");
        page.text(Font::Regular, 10, MARGIN, 748, &form.quote_number);
        page.text(Font::Regular, 8, MARGIN, 730, "DATE");
        page.text(Font::Regular, 10, MARGIN, 718, &form.quote_date);
        page.text(Font::Regular, 8, MARGIN, 700, "VALID UNTIL");
        page.text(Font::Regular, 10, MARGIN, 688, &form.validity_date);

        // ========== 客户信息 ==========
        let mut y = 660;
        page.text(Font::Regular, 8, MARGIN, y, "CLIENT");
        y -= 12;
        page.text(Font::Regular, 10, MARGIN, y, &form.client_name);
        for line in [form.company.as_deref(), form.address.as_deref()]
            .into_iter()
            .flatten()
            .filter(|l| !l.is_empty())
        {
            y -= 12;
            page.text(Font::Regular, 10, MARGIN, y, line);
        }
        y -= 12;
        page.text(Font::Regular, 10, MARGIN, y, &form.signer_email);

        // ========== 行项目 ==========
        y -= 32;
        page.text(Font::Bold, 10, COL_DESC, y, "Description");
        page.text(Font::Bold, 10, COL_QTY, y, "Qty");
        page.text(Font::Bold, 10, COL_UNIT, y, "Unit price");
        page.text(Font::Bold, 10, COL_AMOUNT, y, "Amount");
        page.rule(y - 6, 2);

        for item in &form.line_items {
            y = page.reserve(y, 22);
            y -= 22;
            page.text(Font::Regular, 10, COL_DESC, y, &truncate_text(&item.description, 44));
            page.text(Font::Regular, 10, COL_QTY, y, &format_quantity(item.quantity));
            page.text(Font::Regular, 10, COL_UNIT, y, &format_eur(item.unit_price));
            page.text(Font::Regular, 10, COL_AMOUNT, y, &format_eur(item.amount()));
            page.rule(y - 6, 1);
        }

        // ========== 合计 ==========
        y = page.reserve(y, 30 + 16 * 3);
        y -= 30;
        let tax_label = format!("VAT ({}%)", format_quantity(form.tax_rate_percent));
        for (label, value) in [
            ("Subtotal", totals.subtotal),
            (tax_label.as_str(), totals.tax_amount),
            ("Total", totals.total),
        ] {
            page.text(Font::Regular, 10, COL_UNIT, y, label);
            page.text(Font::Bold, 10, COL_AMOUNT, y, &format_eur(value));
            y -= 16;
        }

        // ========== 签名 ==========
        y = page.reserve(y, 50 + SIGNATURE_HEIGHT);
        y -= 20;
        page.rule(y, 1);
        y -= 30;
        page.text(Font::Regular, 10, MARGIN, y, "Signature: ");
        // 白色文字，肉眼不可见，签署服务可识别
        page.fill_color(1);
        page.text(Font::Regular, 8, MARGIN + 60, y, &smart_anchor(&form.signer_email));
        page.fill_color(0);

        let bytes = page.finish(&format!("Quote {}", form.quote_number))?;
        debug!("报价单 {} 已生成，{} 字节", form.quote_number, bytes.len());
        Ok(bytes)
    }
}

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// 累积各页内容流，绘制总是写入最后一页
struct PageWriter {
    pages: Vec<Vec<Operation>>,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
        }
    }

    /// 当前页剩余高度不足 `needed` 时换页，返回可用的 y 坐标
    fn reserve(&mut self, y: i64, needed: i64) -> i64 {
        if y - needed >= BOTTOM_Y {
            return y;
        }
        self.pages.push(Vec::new());
        TOP_Y
    }

    fn push(&mut self, operations: impl IntoIterator<Item = Operation>) {
        if let Some(current) = self.pages.last_mut() {
            current.extend(operations);
        }
    }

    fn text(&mut self, font: Font, size: i64, x: i64, y: i64, text: &str) {
        self.push([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource_name().into(), Object::Integer(size)]),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
            Operation::new("Tj", vec![Object::string_literal(to_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// 横线
    fn rule(&mut self, y: i64, width: i64) {
        self.push([
            Operation::new("w", vec![Object::Integer(width)]),
            Operation::new("m", vec![Object::Integer(MARGIN), Object::Integer(y)]),
            Operation::new("l", vec![Object::Integer(PAGE_WIDTH - MARGIN), Object::Integer(y)]),
            Operation::new("S", vec![]),
        ]);
    }

    /// 灰度填充色，0 为黑、1 为白
    fn fill_color(&mut self, level: i64) {
        self.push([Operation::new(
            "rg",
            vec![Object::Integer(level), Object::Integer(level), Object::Integer(level)],
        )]);
    }

    fn finish(self, title: &str) -> AppResult<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(to_win_ansi(title)),
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| AppError::Document(format!("Failed to render PDF: {}", e)))?;
        Ok(buffer)
    }
}

/// 标准 Type1 字体只覆盖 Latin-1，其余字符替换为 `?`
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quote::QuoteLineItem;
    use crate::workflow::envelope_ctx::validate_pdf;

    fn form() -> QuoteForm {
        QuoteForm {
            quote_number: "Q-2025-001".to_string(),
            quote_date: "2025-01-10".to_string(),
            validity_date: "2025-02-10".to_string(),
            client_name: "Jane Doe".to_string(),
            company: Some("Acme Corp".to_string()),
            address: None,
            signer_email: "jane@acme.io".to_string(),
            line_items: vec![QuoteLineItem {
                description: "Implementation".to_string(),
                quantity: 3.0,
                unit_price: 1500.0,
            }],
            tax_rate_percent: 20.0,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_smart_anchor_format() {
        assert_eq!(
            smart_anchor("a@b.co"),
            "{{ a@b.co | signature | 180 | 60 }}"
        );
    }

    #[test]
    fn test_format_eur() {
        assert_eq!(format_eur(0.0), "EUR 0.00");
        assert_eq!(format_eur(1234.5), "EUR 1,234.50");
        assert_eq!(format_eur(1_000_000.0), "EUR 1,000,000.00");
        assert_eq!(format_eur(999.999), "EUR 1,000.00");
        assert_eq!(format_eur(-12.3), "-EUR 12.30");
    }

    #[test]
    fn test_render_embeds_anchor_and_totals() {
        let bytes = QuotePdfBuilder::new().render(&form()).unwrap();

        assert!(validate_pdf(&bytes).is_ok());
        assert!(contains(&bytes, b"{{ jane@acme.io | signature | 180 | 60 }}"));
        assert!(contains(&bytes, b"EUR 5,400.00"));
        assert!(contains(&bytes, b"Acme Corp"));
    }

    #[test]
    fn test_rendered_pdf_parses_back() {
        let bytes = QuotePdfBuilder::new().render(&form()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    /// 返回 (页数, 锚点所在页码, 锚点 y 坐标)
    fn locate_anchor(bytes: &[u8], anchor: &str) -> (usize, Option<(u32, i64)>) {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        for (number, page_id) in &pages {
            let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
            let mut last_y = None;
            for op in &content.operations {
                match op.operator.as_str() {
                    "Td" => last_y = op.operands.get(1).and_then(|o| o.as_i64().ok()),
                    "Tj" => {
                        if let Some(Object::String(text, _)) = op.operands.first() {
                            if text.as_slice() == anchor.as_bytes() {
                                return (pages.len(), last_y.map(|y| (*number, y)));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        (pages.len(), None)
    }

    #[test]
    fn test_long_quote_flows_onto_next_page() {
        let mut long = form();
        long.line_items = (1..=60)
            .map(|i| QuoteLineItem {
                description: format!("Item {}", i),
                quantity: 1.0,
                unit_price: 10.0,
            })
            .collect();

        let bytes = QuotePdfBuilder::new().render(&long).unwrap();
        let (pages, anchor) = locate_anchor(&bytes, &smart_anchor("jane@acme.io"));

        assert!(pages > 1, "应当续页: {pages}");
        let (page, y) = anchor.expect("未找到 Smart Anchor");
        assert_eq!(page as usize, pages, "锚点应在最后一页");
        assert!(y >= BOTTOM_Y && y < PAGE_HEIGHT, "锚点超出页面: {y}");
        assert!(y - SIGNATURE_HEIGHT >= 0, "签名框超出页面: {y}");
        assert!(contains(&bytes, b"EUR 600.00"));
    }

    #[test]
    fn test_short_quote_anchor_on_first_page() {
        let bytes = QuotePdfBuilder::new().render(&form()).unwrap();
        let (pages, anchor) = locate_anchor(&bytes, &smart_anchor("jane@acme.io"));
        assert_eq!(pages, 1);
        assert!(matches!(anchor, Some((1, y)) if y >= BOTTOM_Y));
    }

    #[test]
    fn test_non_latin_text_replaced() {
        assert_eq!(to_win_ansi("Café 中"), b"Caf\xe9 ?".to_vec());
    }
}
