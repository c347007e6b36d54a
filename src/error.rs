use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// 应用程序错误类型
///
/// 所有对外操作都返回 `AppResult`，`Display` 即给用户看的提示文字
#[derive(Debug)]
pub enum AppError {
    /// 配置错误（任何远程调用之前检测）
    Config(ConfigError),
    /// 本地输入校验失败
    Validation(String),
    /// 工作流某一步的远程调用失败
    Step {
        step: WorkflowStep,
        source: ApiError,
    },
    /// 本地文件读写失败
    Storage {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 报价单加载或 PDF 生成失败
    Document(String),
}

impl AppError {
    /// 错误分类名，便于日志和测试断言
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigError",
            AppError::Validation(_) => "ValidationError",
            AppError::Step { step, .. } => step.category(),
            AppError::Storage { .. } => "StorageError",
            AppError::Document(_) => "DocumentError",
        }
    }

    /// 失败的步骤（仅远程调用错误有）
    pub fn step(&self) -> Option<WorkflowStep> {
        match self {
            AppError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn storage(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Validation(msg) => write!(f, "{}", msg),
            // 远程服务没有给出消息时，使用步骤自带的兜底文字
            AppError::Step {
                step,
                source: ApiError::RemoteApi { message: None, .. },
            } => write!(f, "{}", step.fallback_message()),
            AppError::Step { source, .. } => write!(f, "{}", source),
            AppError::Storage { path, source } => {
                write!(f, "Failed to access {}: {}", path, source)
            }
            AppError::Document(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Step { source, .. } => Some(source),
            AppError::Storage { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::Document(format!("Failed to render PDF: {}", err))
    }
}

/// 信封工作流中的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Upload,
    Recipients,
    Blocks,
    Send,
    Token,
    Status,
    Whoami,
}

impl WorkflowStep {
    pub fn category(&self) -> &'static str {
        match self {
            WorkflowStep::Upload => "UploadError",
            WorkflowStep::Recipients => "RecipientError",
            WorkflowStep::Blocks => "BlockError",
            WorkflowStep::Send => "SendError",
            WorkflowStep::Token => "TokenError",
            WorkflowStep::Status => "StatusError",
            WorkflowStep::Whoami => "WhoamiError",
        }
    }

    pub fn fallback_message(&self) -> &'static str {
        match self {
            WorkflowStep::Upload => "Failed to create envelope",
            WorkflowStep::Recipients => "Failed to add recipients",
            WorkflowStep::Blocks => "Failed to add signature block",
            WorkflowStep::Send => "Failed to send envelope",
            WorkflowStep::Token => "Failed to create iframe token",
            WorkflowStep::Status => "Envelope not found",
            WorkflowStep::Whoami => "Failed to get whoami",
        }
    }

    /// 把底层 API 错误挂到当前步骤上
    pub fn fail(self, source: ApiError) -> AppError {
        AppError::Step { step: self, source }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStep::Upload => "upload",
            WorkflowStep::Recipients => "add-recipients",
            WorkflowStep::Blocks => "add-blocks",
            WorkflowStep::Send => "send",
            WorkflowStep::Token => "create-iframe-token",
            WorkflowStep::Status => "get-envelope",
            WorkflowStep::Whoami => "whoami",
        };
        write!(f, "{}", name)
    }
}

/// 远程 API 调用错误
///
/// 在收到响应的地方统一归一化，之后的代码不再检查原始响应体
#[derive(Debug)]
pub enum ApiError {
    /// 网络不可达、连接被拒绝、超时
    Transport {
        base_url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 会话握手失败
    Handshake { base_url: String, message: String },
    /// 远程调用完成，但返回了业务错误
    RemoteApi {
        code: Option<String>,
        message: Option<String>,
    },
}

impl ApiError {
    pub fn transport(
        base_url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ApiError::Transport {
            base_url: base_url.into(),
            source: Box::new(source),
        }
    }

    /// 远程调用成功但缺少必需字段
    pub fn missing(field: &str) -> Self {
        ApiError::RemoteApi {
            code: Some(format!("missing_{}", field)),
            message: None,
        }
    }

    pub fn remote(code: Option<String>, message: Option<String>) -> Self {
        ApiError::RemoteApi { code, message }
    }

    /// 归一化错误响应体
    ///
    /// 兼容 `{"error": {"code", "message"}}` 与 `{"code", "message"}` 两种结构，
    /// 非 JSON 响应体按纯文本处理
    pub fn from_response_body(base_url: &str, http_status: u16, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                let inner = value.get("error").filter(|v| v.is_object()).unwrap_or(&value);
                (
                    inner.get("code").and_then(value_to_string),
                    inner
                        .get("message")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                        .or_else(|| value.get("error").and_then(|v| v.as_str()).map(|s| s.to_string())),
                )
            }
            Err(_) => {
                let text = body.trim();
                (None, (!text.is_empty()).then(|| text.to_string()))
            }
        };

        let code = code.or_else(|| Some(http_status.to_string()));

        match message {
            Some(message) if is_handshake_message(&message) => ApiError::Handshake {
                base_url: base_url.to_string(),
                message,
            },
            message => ApiError::RemoteApi { code, message },
        }
    }

    /// 错误分类名
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::Transport { .. } => "TransportError",
            ApiError::Handshake { .. } => "HandshakeError",
            ApiError::RemoteApi { .. } => "RemoteApiError",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport { base_url, .. } => write!(
                f,
                "Cannot reach Subnoto API at {}. Check that the API or tunnel is running \
                 (e.g. start the api-proxy or use the cloud URL such as https://enclave.subnoto.com).",
                base_url
            ),
            ApiError::Handshake { base_url, message } => {
                write!(f, "Subnoto API handshake failed: {}.", message)?;
                if base_url.starts_with("http://") && base_url.contains("enclave.subnoto.com") {
                    write!(
                        f,
                        " Use HTTPS: set SUBNOTO_BASE_URL=https://enclave.subnoto.com in .env"
                    )?;
                }
                Ok(())
            }
            ApiError::RemoteApi {
                message: Some(message),
                ..
            } => write!(f, "{}", message),
            ApiError::RemoteApi {
                code: Some(code),
                message: None,
            } => write!(f, "Subnoto API error ({})", code),
            ApiError::RemoteApi {
                code: None,
                message: None,
            } => write!(f, "Subnoto API error"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少必填环境变量
    #[error("Missing env: {}", names.join(", "))]
    MissingVars { names: Vec<String> },
    /// 环境变量解析失败
    #[error("Invalid env {var_name}: '{value}' is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// HTTP 客户端初始化失败
    #[error("Failed to initialise HTTP client: {message}")]
    ClientBuildFailed { message: String },
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 握手失败的提示文字，大小写不敏感
static HANDSHAKE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn is_handshake_message(message: &str) -> bool {
    HANDSHAKE_PATTERN
        .get_or_init(|| Regex::new(r"(?i)no session id").expect("handshake pattern is valid"))
        .is_match(message)
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
