
use crate::error::ValidationError;

/// 待评改的论说文
///
/// 只能通过 [`Essay::new`] 构造，构造后不可修改；标题和正文都保证非空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Essay {
    title: String,
    content: String,
}

impl Essay {
    /// 创建论说文，标题或正文为空（仅含空白也算空）时返回校验错误
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        let content = content.into();

        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        Ok(Self { title, content })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}
