//! 分析会话
//!
//! 封装"当前这位用户进行到哪一步"这一信息。会话由交互上下文持有，
//! 以可变引用传入流程，不存在进程级共享状态。

use std::fmt::Display;

use crate::error::ValidationError;
use crate::models::feedback::FeedbackResult;

/// 流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    ImagesStaged,
    Extracting,
    ExtractedTextReady,
    Submitted,
    Completed,
}

/// 提取阶段得到的文本，在提交评改前允许用户修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    original: String,
    current: String,
}

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            current: text.clone(),
            original: text,
        }
    }

    /// 当前（可能已被修改的）文本
    pub fn as_str(&self) -> &str {
        &self.current
    }

    /// 服务返回的原始文本
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_edited(&self) -> bool {
        self.current != self.original
    }

    fn edit(&mut self, text: String) {
        self.current = text;
    }
}

/// 分析会话
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    /// 会话标识（仅用于日志）
    pub session_id: String,
    state: FlowState,
    staged_images: usize,
    extracted_text: Option<ExtractedText>,
    last_feedback: Option<FeedbackResult>,
}

impl AnalysisSession {
    /// 创建新的会话
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: FlowState::Idle,
            staged_images: 0,
            extracted_text: None,
            last_feedback: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn extracted_text(&self) -> Option<&ExtractedText> {
        self.extracted_text.as_ref()
    }

    /// 最近一次评改结果
    pub fn last_feedback(&self) -> Option<&FeedbackResult> {
        self.last_feedback.as_ref()
    }

    /// 当前暂存的图片数量
    pub fn staged_images(&self) -> usize {
        self.staged_images
    }

    /// 用户修改提取文本，只允许在提取完成后、提交评改前进行
    pub fn edit_extracted_text(&mut self, text: impl Into<String>) -> Result<(), ValidationError> {
        if self.state != FlowState::ExtractedTextReady {
            return Err(ValidationError::NoExtractedText);
        }
        let extracted = self
            .extracted_text
            .as_mut()
            .ok_or(ValidationError::NoExtractedText)?;
        extracted.edit(text.into());
        Ok(())
    }

    /// 回到初始状态
    pub fn reset(&mut self) {
        self.state = FlowState::Idle;
        self.staged_images = 0;
        self.extracted_text = None;
        self.last_feedback = None;
    }

    // ========== 状态转换（仅供流程调用） ==========

    /// 暂存新的图片集合，丢弃之前的提取结果
    pub(crate) fn stage_images(&mut self, count: usize) {
        self.reset();
        self.staged_images = count;
        self.state = FlowState::ImagesStaged;
    }

    pub(crate) fn begin_extraction(&mut self) {
        self.state = FlowState::Extracting;
    }

    pub(crate) fn extraction_succeeded(&mut self, text: String) {
        self.extracted_text = Some(ExtractedText::new(text));
        self.staged_images = 0;
        self.state = FlowState::ExtractedTextReady;
    }

    /// 提取失败时停在 ImagesStaged，不产生任何提取文本
    pub(crate) fn extraction_failed(&mut self) {
        self.extracted_text = None;
        self.state = FlowState::ImagesStaged;
    }

    pub(crate) fn submit(&mut self) {
        self.state = FlowState::Submitted;
    }

    pub(crate) fn complete(&mut self, feedback: FeedbackResult) {
        self.last_feedback = Some(feedback);
        self.state = FlowState::Completed;
    }

    /// 评改失败时回到提交前的状态
    pub(crate) fn critique_failed(&mut self, feedback: FeedbackResult, previous: FlowState) {
        self.last_feedback = Some(feedback);
        self.state = previous;
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(chrono::Local::now().format("%Y%m%d%H%M%S%3f").to_string())
    }
}

impl Display for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[세션 #{} 상태#{:?}]", self.session_id, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = AnalysisSession::new("s1");
        assert_eq!(session.state(), FlowState::Idle);
        assert!(session.extracted_text().is_none());
        assert!(session.last_feedback().is_none());
        assert_eq!(session.to_string(), "[세션 #s1 상태#Idle]");
    }

    #[test]
    fn test_edit_only_when_text_ready() {
        let mut session = AnalysisSession::new("s1");
        assert_eq!(
            session.edit_extracted_text("수정"),
            Err(ValidationError::NoExtractedText)
        );

        session.stage_images(1);
        session.begin_extraction();
        session.extraction_succeeded("원문".to_string());
        session.edit_extracted_text("수정본").unwrap();

        let text = session.extracted_text().unwrap();
        assert_eq!(text.as_str(), "수정본");
        assert_eq!(text.original(), "원문");
        assert!(text.is_edited());
    }

    #[test]
    fn test_restaging_discards_extracted_text() {
        let mut session = AnalysisSession::new("s1");
        session.stage_images(2);
        session.begin_extraction();
        session.extraction_succeeded("첫 번째".to_string());

        session.stage_images(1);
        assert_eq!(session.state(), FlowState::ImagesStaged);
        assert_eq!(session.staged_images(), 1);
        assert!(session.extracted_text().is_none());
    }

    #[test]
    fn test_extraction_failure_stays_staged() {
        let mut session = AnalysisSession::new("s1");
        session.stage_images(1);
        session.begin_extraction();
        session.extraction_failed();
        assert_eq!(session.state(), FlowState::ImagesStaged);
        assert!(session.extracted_text().is_none());
    }
}
