//! LLM API 客户端
//!
//! 把消息序列发送到兼容 OpenAI 的 chat completion 接口。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//!
//! 所有传输、鉴权、限流和响应格式错误都在这里转换为 [`CompletionError`]，
//! 调用方永远不会收到未处理的底层错误。

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::CompletionError;
use crate::models::message::{ChatMessage, ContentPart, MessageContent, MessageSequence, Role};

/// 解码参数
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl CompletionParams {
    /// 评改阶段参数
    pub fn critique(config: &Config) -> Self {
        Self {
            model: config.llm_model_name.clone(),
            temperature: config.critique_temperature,
            max_output_tokens: config.critique_max_tokens,
        }
    }

    /// 提取阶段参数
    pub fn extraction(config: &Config) -> Self {
        Self {
            model: config.llm_model_name.clone(),
            temperature: config.extraction_temperature,
            max_output_tokens: config.extraction_max_tokens,
        }
    }
}

/// 重试策略，默认不重试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// 第 `attempt` 次重试前的等待时间（从 0 开始，每次翻倍）
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// 补全服务
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// 发送消息序列，返回生成的文本
    async fn complete(
        &self,
        messages: &MessageSequence,
        params: &CompletionParams,
    ) -> Result<String, CompletionError>;
}

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    retry: RetryPolicy,
    timeout: Option<Duration>,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        // 关闭 SDK 自带的 5xx/429 退避重试，重试只由 RetryPolicy 控制
        let no_backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Self {
            client: Client::with_config(openai_config).with_backoff(no_backoff),
            retry: RetryPolicy::from_config(config),
            timeout: config.request_timeout(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 发送一次请求，不做重试
    async fn send_once(
        &self,
        request: CreateChatCompletionRequest,
        model: &str,
    ) -> Result<String, CompletionError> {
        let chat = self.client.chat();
        let call = chat.create(request);

        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                CompletionError::Timeout {
                    model: model.to_string(),
                    secs: limit.as_secs(),
                }
            })?,
            None => call.await,
        }
        .map_err(|e| CompletionError::ApiCallFailed {
            model: model.to_string(),
            message: e.to_string(),
        })?;

        // 提取响应内容
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CompletionError::EmptyContent {
                model: model.to_string(),
            })
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(
        &self,
        messages: &MessageSequence,
        params: &CompletionParams,
    ) -> Result<String, CompletionError> {
        debug!(
            "调用 LLM API，模型: {}, 消息数: {}, 图片数: {}",
            params.model,
            messages.len(),
            messages.image_count()
        );

        let request = build_request(messages, params)?;

        let mut attempt = 0;
        loop {
            match self.send_once(request.clone(), &params.model).await {
                Ok(content) => {
                    debug!("LLM API 调用成功，返回 {} 字符", content.chars().count());
                    return Ok(content);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        "LLM API 调用失败: {}，{}ms 后进行第 {}/{} 次重试",
                        e,
                        delay.as_millis(),
                        attempt,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("LLM API 调用失败: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

/// 把消息序列转换为 API 请求
fn build_request(
    messages: &MessageSequence,
    params: &CompletionParams,
) -> Result<CreateChatCompletionRequest, CompletionError> {
    let request_messages = messages
        .messages()
        .iter()
        .map(to_request_message)
        .collect::<Result<Vec<_>, _>>()?;

    CreateChatCompletionRequestArgs::default()
        .model(&params.model)
        .messages(request_messages)
        .temperature(params.temperature)
        .max_tokens(params.max_output_tokens)
        .build()
        .map_err(invalid_request)
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage, CompletionError> {
    match message.role {
        Role::System => {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(message.text())
                .build()
                .map_err(invalid_request)?;
            Ok(ChatCompletionRequestMessage::System(system_msg))
        }
        Role::User => {
            let user_msg = match &message.content {
                MessageContent::Text(text) => ChatCompletionRequestUserMessageArgs::default()
                    .content(text.as_str())
                    .build(),
                MessageContent::Parts(parts) => ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(
                        parts.iter().map(to_content_part).collect(),
                    ))
                    .build(),
            }
            .map_err(invalid_request)?;
            Ok(ChatCompletionRequestMessage::User(user_msg))
        }
    }
}

fn to_content_part(part: &ContentPart) -> ChatCompletionRequestUserMessageContentPart {
    match part {
        ContentPart::Text(text) => ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText { text: text.clone() },
        ),
        ContentPart::ImageUrl(url) => ChatCompletionRequestUserMessageContentPart::ImageUrl(
            ChatCompletionRequestMessageContentPartImage {
                image_url: ImageUrl {
                    url: url.clone(),
                    detail: Some(ImageDetail::Auto),
                },
            },
        ),
    }
}

fn invalid_request(e: impl std::fmt::Display) -> CompletionError {
    CompletionError::InvalidRequest {
        message: e.to_string(),
    }
}
