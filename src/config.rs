use crate::error::ConfigError;

/// 必填环境变量
pub const REQUIRED_VARS: [&str; 4] = [
    "SUBNOTO_BASE_URL",
    "SUBNOTO_ACCESS_KEY",
    "SUBNOTO_SECRET_KEY",
    "WORKSPACE_UUID",
];

/// 默认的嵌入签署页面域名
pub const DEFAULT_EMBED_BASE_URL: &str = "https://app.subnoto.com";

/// 程序配置文件
///
/// 只在启动时构造一次，之后按引用传给各层
#[derive(Clone, Debug)]
pub struct Config {
    // --- Subnoto API 配置 ---
    pub api_base_url: String,
    pub access_key: String,
    pub secret_key: String,
    pub workspace_uuid: String,
    /// 是否跳过 enclave 证明（SUBNOTO_UNATTESTED=true）
    pub unattested: bool,
    /// 嵌入签署页面的域名
    pub embed_base_url: String,
    // --- 本地配置 ---
    /// 已保存信封列表文件
    pub ledger_path: String,
    /// 示例 PDF 路径
    pub sample_pdf_path: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意来源读取配置，缺失的必填项一次性全部报出
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|name| get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVars { names: missing });
        }

        let required = |name: &str| get(name).unwrap_or_default();

        let request_timeout_secs = match get("SUBNOTO_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::EnvVarParseFailed {
                    var_name: "SUBNOTO_TIMEOUT_SECS".to_string(),
                    value,
                    expected_type: "u64".to_string(),
                })?,
            None => 30,
        };

        Ok(Self {
            api_base_url: required("SUBNOTO_BASE_URL"),
            access_key: required("SUBNOTO_ACCESS_KEY"),
            secret_key: required("SUBNOTO_SECRET_KEY"),
            workspace_uuid: required("WORKSPACE_UUID"),
            unattested: get("SUBNOTO_UNATTESTED").as_deref() == Some("true"),
            embed_base_url: get("SUBNOTO_EMBED_BASE_URL")
                .unwrap_or_else(|| DEFAULT_EMBED_BASE_URL.to_string()),
            ledger_path: get("SUBNOTO_LEDGER_PATH")
                .unwrap_or_else(|| "subnoto_embedded_demo_envelopes.json".to_string()),
            sample_pdf_path: get("SUBNOTO_SAMPLE_PDF")
                .unwrap_or_else(|| "assets/sample-multipage.pdf".to_string()),
            request_timeout_secs,
            verbose_logging: get("VERBOSE_LOGGING")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }
}
