use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 输入校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 补全服务错误
    #[error("LLM错误: {0}")]
    Completion(#[from] CompletionError),
    /// 评分标准错误
    #[error("评分标准错误: {0}")]
    Rubric(#[from] RubricError),
}

/// 配置错误
///
/// 缺少 API 密钥属于致命错误，由表单宿主在任何核心操作之前处理。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
}

/// 输入校验错误
///
/// 在本地拒绝状态转换，绝不会触达网络边界。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 标题为空
    #[error("标题不能为空")]
    EmptyTitle,
    /// 正文为空
    #[error("正文不能为空")]
    EmptyContent,
    /// 没有提供图片
    #[error("至少需要提供一张图片")]
    NoImages,
    /// 图片内容为空
    #[error("图片内容为空")]
    EmptyImagePayload,
    /// 不支持的图片格式
    #[error("不支持的图片格式: {0}")]
    UnsupportedMediaType(String),
    /// 当前会话没有可提交的提取文本
    #[error("当前没有可提交的提取文本，请先提取图片")]
    NoExtractedText,
}

/// 补全服务错误
///
/// 所有网络、鉴权、限流、响应格式问题都在客户端边界转换为此类型。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 请求超时
    #[error("LLM API调用超时 (模型: {model}, {secs}秒)")]
    Timeout { model: String, secs: u64 },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 请求构建失败
    #[error("LLM请求构建失败: {message}")]
    InvalidRequest { message: String },
}

impl CompletionError {
    /// 是否值得重试
    ///
    /// 只有传输层或服务端的临时故障才重试，请求本身有问题时重试没有意义。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::ApiCallFailed { .. } | CompletionError::Timeout { .. }
        )
    }
}

/// 评分标准错误
#[derive(Debug, Error)]
pub enum RubricError {
    /// TOML 解析失败
    #[error("评分标准解析失败: {0}")]
    Parse(#[from] toml::de::Error),
    /// 内容不合法
    #[error("评分标准不合法: {reason}")]
    Invalid { reason: String },
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
