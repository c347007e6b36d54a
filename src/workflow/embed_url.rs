/// 嵌入签署页面路径
pub const EMBED_SIGN_PATH: &str = "/embeds/sign";

/// 构造嵌入签署链接
///
/// token 放在 `#t=` 片段里，浏览器不会把它发给任何服务器
pub fn build_embed_sign_url(embed_base_url: &str, iframe_token: &str) -> String {
    format!(
        "{}{}#t={}",
        embed_base_url.trim_end_matches('/'),
        EMBED_SIGN_PATH,
        iframe_token
    )
}
