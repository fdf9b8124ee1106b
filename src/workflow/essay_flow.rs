//! 论说文评改流程 - 流程层
//!
//! 核心职责：定义一次用户操作对应的完整处理流程
//!
//! 流程 A（文本评改）：Idle → Submitted → Completed
//!
//! 流程 B（两阶段图片评改）：
//! Idle → ImagesStaged → Extracting → ExtractedTextReady → Submitted → Completed
//!
//! 单阶段图片评改：Idle → Submitted → Completed，一次请求内完成提取和评改。
//! 两种图片流程通过 [`ImageFlow`] 配置选择，不会混用。
//!
//! 每个操作只发起一次补全请求，并等待其完成或失败。

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::clients::{CompletionClient, CompletionParams};
use crate::config::{Config, ImageFlow};
use crate::error::{CompletionError, ValidationError};
use crate::models::essay::Essay;
use crate::models::feedback::FeedbackResult;
use crate::models::image::{stage_images, EncodedImage, ImageAsset, StagedImages};
use crate::models::message::MessageSequence;
use crate::models::rubric::RubricSpec;
use crate::services::{image_encoder, PromptBuilder, PromptMode};
use crate::utils::logging::truncate_text;
use crate::workflow::session::{AnalysisSession, FlowState};

/// 表单宿主发出的操作
#[derive(Debug, Clone)]
pub enum Action {
    /// 直接提交文本
    SubmitText { title: String, content: String },
    /// 提交图片：两阶段配置下只做提取，单阶段配置下直接评改
    ExtractImages { images: Vec<ImageAsset> },
    /// 提交（可能已修改的）提取文本
    SubmitCorrected { title: String },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::SubmitText { .. } => "submit-text",
            Action::ExtractImages { .. } => "extract-images",
            Action::SubmitCorrected { .. } => "submit-corrected",
        }
    }
}

/// 操作结果
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// 评改结果（成功或失败）
    Feedback(FeedbackResult),
    /// 提取出的文本，供用户在可编辑区域中校对
    Extracted(String),
    /// 提取失败，会话停在 ImagesStaged
    ExtractionFailed(CompletionError),
}

/// 非错误的提示信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowWarning {
    /// 图片超过上限，只保留了前几张
    ImagesTruncated { supplied: usize, kept: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowResponse {
    pub outcome: FlowOutcome,
    pub warnings: Vec<FlowWarning>,
}

impl FlowResponse {
    fn new(outcome: FlowOutcome) -> Self {
        Self {
            outcome,
            warnings: Vec::new(),
        }
    }

    /// `kept` 是实际编码并发送的图片数，空图片也算作未保留
    fn with_staging(mut self, staged: &StagedImages, kept: usize) -> Self {
        if kept < staged.supplied() {
            self.warnings.push(FlowWarning::ImagesTruncated {
                supplied: staged.supplied(),
                kept,
            });
        }
        self
    }

    /// 给表单宿主显示的文本
    pub fn display_text(&self) -> String {
        match &self.outcome {
            FlowOutcome::Feedback(feedback) => feedback.display_text(),
            FlowOutcome::Extracted(text) => text.clone(),
            FlowOutcome::ExtractionFailed(error) => {
                FeedbackResult::failed(error.clone()).display_text()
            }
        }
    }
}

/// 论说文评改流程
///
/// - 编排提示词构建、补全调用和会话状态转换
/// - 不持有会话，会话由调用方传入
/// - 校验失败时不修改会话，也不访问网络
pub struct EssayFlow {
    client: Arc<dyn CompletionClient>,
    prompt_builder: PromptBuilder,
    critique_params: CompletionParams,
    extraction_params: CompletionParams,
    image_flow: ImageFlow,
}

impl EssayFlow {
    /// 创建新的评改流程
    pub fn new(config: &Config, rubric: Arc<RubricSpec>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            prompt_builder: PromptBuilder::new(rubric),
            critique_params: CompletionParams::critique(config),
            extraction_params: CompletionParams::extraction(config),
            image_flow: config.image_flow,
        }
    }

    pub fn with_image_flow(mut self, image_flow: ImageFlow) -> Self {
        self.image_flow = image_flow;
        self
    }

    pub fn image_flow(&self) -> ImageFlow {
        self.image_flow
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.prompt_builder
    }

    /// 处理一次用户操作
    pub async fn handle(
        &self,
        session: &mut AnalysisSession,
        action: Action,
    ) -> Result<FlowResponse, ValidationError> {
        info!("{} ▶ 收到操作: {}", session, action.name());

        let result = match action {
            Action::SubmitText { title, content } => self.submit_text(session, title, content).await,
            Action::ExtractImages { images } => match self.image_flow {
                ImageFlow::TwoStage => self.extract_images(session, images).await,
                ImageFlow::SingleStage => self.analyze_images(session, images).await,
            },
            Action::SubmitCorrected { title } => self.submit_corrected(session, title).await,
        };

        if let Err(e) = &result {
            warn!("{} ⚠️ 输入校验失败: {}", session, e);
        }
        result
    }

    /// 流程 A：直接评改文本
    async fn submit_text(
        &self,
        session: &mut AnalysisSession,
        title: String,
        content: String,
    ) -> Result<FlowResponse, ValidationError> {
        let essay = Essay::new(title, content)?;
        self.log_essay(session, &essay);

        session.reset();
        let messages = self.prompt_builder.build(PromptMode::Text(&essay));
        let feedback = self.critique(session, &messages, FlowState::Idle).await;

        Ok(FlowResponse::new(FlowOutcome::Feedback(feedback)))
    }

    /// 流程 B 第一步：提取手写文本
    async fn extract_images(
        &self,
        session: &mut AnalysisSession,
        images: Vec<ImageAsset>,
    ) -> Result<FlowResponse, ValidationError> {
        let (staged, encoded) = prepare_images(images)?;

        session.stage_images(encoded.len());
        info!("{} 🖼️ 已暂存 {} 张图片，开始提取文本...", session, encoded.len());

        session.begin_extraction();
        let messages = self.prompt_builder.build(PromptMode::Extraction(&encoded));

        let outcome = match self.client.complete(&messages, &self.extraction_params).await {
            Ok(text) => {
                info!(
                    "{} ✓ 文本提取完成，共 {} 字符",
                    session,
                    text.chars().count()
                );
                session.extraction_succeeded(text.clone());
                FlowOutcome::Extracted(text)
            }
            Err(e) => {
                error!("{} ❌ 文本提取失败: {}", session, e);
                session.extraction_failed();
                FlowOutcome::ExtractionFailed(e)
            }
        };

        Ok(FlowResponse::new(outcome).with_staging(&staged, encoded.len()))
    }

    /// 单阶段：图片直接评改，不经过用户校对
    async fn analyze_images(
        &self,
        session: &mut AnalysisSession,
        images: Vec<ImageAsset>,
    ) -> Result<FlowResponse, ValidationError> {
        let (staged, encoded) = prepare_images(images)?;

        session.reset();
        info!("{} 🖼️ 单阶段评改，共 {} 张图片", session, encoded.len());

        let messages = self.prompt_builder.build(PromptMode::Image(&encoded));
        let feedback = self.critique(session, &messages, FlowState::Idle).await;

        Ok(FlowResponse::new(FlowOutcome::Feedback(feedback))
            .with_staging(&staged, encoded.len()))
    }

    /// 流程 B 第二步：提交校对后的文本
    async fn submit_corrected(
        &self,
        session: &mut AnalysisSession,
        title: String,
    ) -> Result<FlowResponse, ValidationError> {
        if session.state() != FlowState::ExtractedTextReady {
            return Err(ValidationError::NoExtractedText);
        }
        let extracted = session
            .extracted_text()
            .ok_or(ValidationError::NoExtractedText)?;
        if extracted.is_edited() {
            info!("{} ✏️ 用户修改了提取文本", session);
        }

        let essay = Essay::new(title, extracted.as_str())?;
        self.log_essay(session, &essay);

        let messages = self.prompt_builder.build(PromptMode::Text(&essay));
        let feedback = self
            .critique(session, &messages, FlowState::ExtractedTextReady)
            .await;

        Ok(FlowResponse::new(FlowOutcome::Feedback(feedback)))
    }

    /// 发起评改请求并更新会话
    ///
    /// 失败时会话回到 `previous`，错误作为评改结果返回给表单宿主。
    async fn critique(
        &self,
        session: &mut AnalysisSession,
        messages: &MessageSequence,
        previous: FlowState,
    ) -> FeedbackResult {
        session.submit();
        info!("{} 📤 正在请求评改...", session);

        match self.client.complete(messages, &self.critique_params).await {
            Ok(text) => {
                let feedback = FeedbackResult::completed(text);
                session.complete(feedback.clone());
                info!("{} ✅ 评改完成", session);
                feedback
            }
            Err(e) => {
                error!("{} ❌ 评改失败: {}", session, e);
                let feedback = FeedbackResult::failed(e);
                session.critique_failed(feedback.clone(), previous);
                feedback
            }
        }
    }

    fn log_essay(&self, session: &AnalysisSession, essay: &Essay) {
        info!(
            "{} 제목: {} | 내용: {}",
            session,
            truncate_text(essay.title(), 40),
            truncate_text(essay.content(), 80)
        );
    }
}

/// 截断并编码图片，没有可用图片时返回校验错误
fn prepare_images(
    images: Vec<ImageAsset>,
) -> Result<(StagedImages, Vec<EncodedImage>), ValidationError> {
    if images.is_empty() {
        return Err(ValidationError::NoImages);
    }

    let staged = stage_images(images);
    let encoded = image_encoder::encode_all(&staged.images);
    if encoded.is_empty() {
        return Err(ValidationError::EmptyImagePayload);
    }

    Ok((staged, encoded))
}
