//! 随机信封标题
//!
//! 从四组词表中各取一个词，用空格拼接。标题只用于展示，不保证唯一

use rand::seq::SliceRandom;
use rand::Rng;

/// 四组词表：时期 / 文档类别 / 合同类型 / 后缀
pub const TITLE_PARTS: [&[&str]; 4] = [
    &["Q4 2024", "Q1 2025", "FY2024", "H2 2024", "January 2025", "Board"],
    &[
        "Financial Report",
        "Audit Summary",
        "Compliance Review",
        "Due Diligence",
        "Risk Assessment",
        "Budget Overview",
    ],
    &["Contract Amendment", "NDA", "Vendor Agreement", "SOW", "MSA", "Addendum"],
    &[
        "— Acme Corp",
        "— Confidential",
        "— Final",
        "— Signed",
        "— Draft",
        "— Rev. 2",
    ],
];

/// 生成一个随机标题，随机源由调用方传入
pub fn random_title<R: Rng + ?Sized>(rng: &mut R) -> String {
    TITLE_PARTS
        .iter()
        .filter_map(|words| words.choose(rng))
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
