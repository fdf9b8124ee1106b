//! 应用入口 - 编排层
//!
//! 表单宿主唯一需要直接接触的类型：
//!
//! 1. **应用初始化**：加载评分标准、创建 LLM 客户端、组装评改流程
//! 2. **会话管理**：为每个交互上下文创建独立的 [`AnalysisSession`]
//! 3. **操作转发**：把表单操作交给 [`EssayFlow`] 处理
//!
//! 配置缺失（例如没有 API 密钥）在 [`Config::from_env`] 阶段就会失败，
//! 不会进入这里。

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::clients::{CompletionClient, LlmClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::loaders::load_rubric_or_embedded;
use crate::models::rubric::RubricSpec;
use crate::utils::logging;
use crate::workflow::{Action, AnalysisSession, EssayFlow, FlowResponse};

/// 应用主结构
pub struct App {
    config: Config,
    rubric: Arc<RubricSpec>,
    flow: EssayFlow,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let client: Arc<dyn CompletionClient> = Arc::new(LlmClient::new(&config));
        Self::with_client(config, client).await
    }

    /// 使用指定的补全服务初始化应用
    pub async fn with_client(config: Config, client: Arc<dyn CompletionClient>) -> Result<Self> {
        let rubric = Arc::new(load_rubric_or_embedded(config.rubric_path.as_deref()).await?);
        info!(
            "📋 评分标准: {} (版本 {}, {} 条)",
            rubric.title,
            rubric.version,
            rubric.criteria.len()
        );

        let flow = EssayFlow::new(&config, rubric.clone(), client);

        Ok(Self {
            config,
            rubric,
            flow,
        })
    }

    /// 为新的交互上下文创建会话
    pub fn new_session(&self) -> AnalysisSession {
        AnalysisSession::default()
    }

    /// 处理一次表单操作
    ///
    /// 只有输入校验失败会返回错误；补全服务的失败体现在 [`FlowResponse`] 中。
    pub async fn handle(
        &self,
        session: &mut AnalysisSession,
        action: Action,
    ) -> AppResult<FlowResponse> {
        Ok(self.flow.handle(session, action).await?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rubric(&self) -> &RubricSpec {
        &self.rubric
    }

    pub fn flow(&self) -> &EssayFlow {
        &self.flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageFlow;
    use crate::error::{AppError, ValidationError};
    use crate::test_utils::fixtures::MINIMAL_RUBRIC;
    use crate::test_utils::FakeCompletionClient;
    use crate::workflow::{FlowOutcome, FlowState};

    #[tokio::test]
    async fn test_initialize_uses_embedded_rubric() {
        let app = App::initialize(Config::with_api_key("sk-test")).await.unwrap();
        assert_eq!(app.rubric().criteria.len(), 13);
        assert_eq!(app.flow().image_flow(), ImageFlow::TwoStage);
    }

    #[tokio::test]
    async fn test_rubric_file_overrides_embedded() {
        let path = std::env::temp_dir().join(format!("essay_app_rubric_{}.toml", std::process::id()));
        tokio::fs::write(&path, MINIMAL_RUBRIC).await.unwrap();

        let mut config = Config::with_api_key("sk-test");
        config.rubric_path = Some(path.clone());
        config.image_flow = ImageFlow::SingleStage;

        let client = Arc::new(FakeCompletionClient::new());
        let app = App::with_client(config, client).await.unwrap();
        assert_eq!(app.rubric().version, "test-1");
        assert_eq!(app.flow().image_flow(), ImageFlow::SingleStage);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_rubric_file_fails_initialization() {
        let mut config = Config::with_api_key("sk-test");
        config.rubric_path = Some("/nonexistent/rubric.toml".into());
        assert!(App::initialize(config).await.is_err());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let client = Arc::new(FakeCompletionClient::new());
        client.push_ok("추출 본문");
        let app = App::with_client(Config::with_api_key("sk-test"), client)
            .await
            .unwrap();

        let mut first = app.new_session();
        let second = app.new_session();

        let response = app
            .handle(
                &mut first,
                Action::ExtractImages {
                    images: vec![crate::test_utils::fixtures::jpeg(1)],
                },
            )
            .await
            .unwrap();

        assert_eq!(response.outcome, FlowOutcome::Extracted("추출 본문".to_string()));
        assert_eq!(first.state(), FlowState::ExtractedTextReady);
        assert_eq!(second.state(), FlowState::Idle);
        assert!(second.extracted_text().is_none());
    }

    #[tokio::test]
    async fn test_validation_error_surfaces_as_app_error() {
        let client = Arc::new(FakeCompletionClient::new());
        let app = App::with_client(Config::with_api_key("sk-test"), client.clone())
            .await
            .unwrap();
        let mut session = app.new_session();

        let err = app
            .handle(
                &mut session,
                Action::SubmitText {
                    title: "가족".to_string(),
                    content: String::new(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::EmptyContent)
        ));
        assert_eq!(client.call_count(), 0);
    }
}
