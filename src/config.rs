use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 图片分析流程的配置方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFlow {
    /// 先提取手写文本，由用户校对后再评改
    TwoStage,
    /// 一次请求内完成提取和评改，不经过用户校对
    SingleStage,
}

impl FromStr for ImageFlow {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two_stage" | "two-stage" => Ok(ImageFlow::TwoStage),
            "single_stage" | "single-stage" => Ok(ImageFlow::SingleStage),
            _ => Err(()),
        }
    }
}

/// 程序配置
#[derive(Clone)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 评改阶段的采样温度
    pub critique_temperature: f32,
    /// 评改阶段的最大输出 token 数
    pub critique_max_tokens: u32,
    /// 提取阶段的采样温度
    pub extraction_temperature: f32,
    /// 提取阶段的最大输出 token 数
    pub extraction_max_tokens: u32,
    // --- 重试与超时 ---
    /// 失败后的最大重试次数，0 表示不重试
    pub max_retries: u32,
    /// 首次重试前的等待时间，之后每次翻倍
    pub retry_backoff_ms: u64,
    /// 单次请求超时，None 表示不设超时
    pub request_timeout_secs: Option<u64>,
    // --- 流程配置 ---
    /// 外部评分标准文件，None 时使用内置标准
    pub rubric_path: Option<PathBuf>,
    pub image_flow: ImageFlow,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Config {
    /// 使用给定的 API 密钥和默认值创建配置
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            llm_api_key: api_key.into(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            critique_temperature: 0.6,
            critique_max_tokens: 2500,
            extraction_temperature: 0.0,
            extraction_max_tokens: 2000,
            max_retries: 0,
            retry_backoff_ms: 500,
            request_timeout_secs: None,
            rubric_path: None,
            image_flow: ImageFlow::TwoStage,
            verbose_logging: false,
        }
    }

    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 通过查找函数加载配置
    ///
    /// `OPENAI_API_KEY` 必须存在；其余变量缺省时使用默认值，存在但无法解析时报错。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound {
                var_name: "OPENAI_API_KEY".to_string(),
            })?;

        let default = Self::with_api_key(api_key);

        Ok(Self {
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            critique_temperature: parse_var(&lookup, "LLM_TEMPERATURE", "f32")?
                .unwrap_or(default.critique_temperature),
            critique_max_tokens: parse_var(&lookup, "LLM_MAX_OUTPUT_TOKENS", "u32")?
                .unwrap_or(default.critique_max_tokens),
            extraction_temperature: parse_var(&lookup, "EXTRACTION_TEMPERATURE", "f32")?
                .unwrap_or(default.extraction_temperature),
            extraction_max_tokens: parse_var(&lookup, "EXTRACTION_MAX_OUTPUT_TOKENS", "u32")?
                .unwrap_or(default.extraction_max_tokens),
            max_retries: parse_var(&lookup, "LLM_MAX_RETRIES", "u32")?
                .unwrap_or(default.max_retries),
            retry_backoff_ms: parse_var(&lookup, "LLM_RETRY_BACKOFF_MS", "u64")?
                .unwrap_or(default.retry_backoff_ms),
            request_timeout_secs: parse_var(&lookup, "LLM_REQUEST_TIMEOUT_SECS", "u64")?,
            rubric_path: lookup("RUBRIC_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            image_flow: parse_var(&lookup, "IMAGE_FLOW", "two_stage|single_stage")?
                .unwrap_or(default.image_flow),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", "bool")?
                .unwrap_or(default.verbose_logging),
            llm_api_key: default.llm_api_key,
        })
    }

    /// 单次请求超时
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("llm_api_key", &"***")
            .field("llm_api_base_url", &self.llm_api_base_url)
            .field("llm_model_name", &self.llm_model_name)
            .field("critique_temperature", &self.critique_temperature)
            .field("critique_max_tokens", &self.critique_max_tokens)
            .field("extraction_temperature", &self.extraction_temperature)
            .field("extraction_max_tokens", &self.extraction_max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rubric_path", &self.rubric_path)
            .field("image_flow", &self.image_flow)
            .field("verbose_logging", &self.verbose_logging)
            .finish()
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, expected_type: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::EnvVarNotFound {
                var_name: "OPENAI_API_KEY".to_string()
            }
        );

        let err = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { .. }));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.llm_api_key, "sk-test");
        assert_eq!(config.llm_model_name, "gpt-4o");
        assert_eq!(config.critique_temperature, 0.6);
        assert_eq!(config.critique_max_tokens, 2500);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.image_flow, ImageFlow::TwoStage);
        assert!(config.rubric_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_MODEL_NAME", "gpt-4o-mini"),
            ("LLM_MAX_RETRIES", "3"),
            ("LLM_REQUEST_TIMEOUT_SECS", "45"),
            ("IMAGE_FLOW", "single_stage"),
            ("RUBRIC_PATH", "/etc/rubric.toml"),
        ]))
        .unwrap();

        assert_eq!(config.llm_model_name, "gpt-4o-mini");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.image_flow, ImageFlow::SingleStage);
        assert_eq!(config.rubric_path, Some(PathBuf::from("/etc/rubric.toml")));
    }

    #[test]
    fn test_unparsable_value_is_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_MAX_RETRIES", "many"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::EnvVarParseFailed {
                var_name: "LLM_MAX_RETRIES".to_string(),
                value: "many".to_string(),
                expected_type: "u32".to_string(),
            }
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::with_api_key("sk-secret-value");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("***"));
    }
}
