//! 评分标准
//!
//! 评分标准以 TOML 形式存在，默认版本在编译期内嵌，也可以从外部文件替换。

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::RubricError;

const EMBEDDED_RUBRIC: &str = include_str!("../../rubric/persuasive_essay.toml");

/// 评改请求模板中的占位符
pub const TITLE_PLACEHOLDER: &str = "{title}";
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// 单条评分标准
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub description: String,
    /// 可供学生采用的写作策略
    #[serde(default)]
    pub strategies: Vec<String>,
    /// 判定为不足时的补救方式
    pub remediation: String,
}

/// 每条标准的状态标记
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusMarkers {
    pub pass: String,
    pub partial: String,
    pub fail: String,
}

impl Default for StatusMarkers {
    fn default() -> Self {
        Self {
            pass: "✅".to_string(),
            partial: "🔺".to_string(),
            fail: "❌".to_string(),
        }
    }
}

/// 请求模板
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptTemplates {
    /// 文本评改请求，包含 `{title}` 和 `{content}`
    pub critique_request: String,
    /// 图片直接评改（单阶段）的说明
    pub image_critique_request: String,
    /// 手写文本提取的说明
    pub extraction_request: String,
}

/// 评分标准
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RubricSpec {
    pub version: String,
    pub title: String,
    /// 系统消息开头的角色设定
    pub persona: String,
    /// 目标读者，用于约束语气
    pub audience: String,
    #[serde(default)]
    pub guidelines: Vec<String>,
    #[serde(default)]
    pub markers: StatusMarkers,
    pub prompts: PromptTemplates,
    pub criteria: Vec<Criterion>,
}

impl RubricSpec {
    /// 内置的论说文评分标准
    pub fn embedded() -> Result<Self, RubricError> {
        Self::from_toml_str(EMBEDDED_RUBRIC)
    }

    /// 解析并校验 TOML 文本
    pub fn from_toml_str(content: &str) -> Result<Self, RubricError> {
        let rubric: RubricSpec = toml::from_str(content)?;
        rubric.validate()?;
        Ok(rubric)
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version 不能为空"));
        }
        if self.criteria.is_empty() {
            return Err(invalid("至少需要一条评分标准"));
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if criterion.name.trim().is_empty() {
                return Err(invalid("评分标准名称不能为空"));
            }
            if !seen.insert(criterion.name.as_str()) {
                return Err(invalid(format!("评分标准名称重复: {}", criterion.name)));
            }
        }

        let critique = &self.prompts.critique_request;
        if !critique.contains(TITLE_PLACEHOLDER) || !critique.contains(CONTENT_PLACEHOLDER) {
            return Err(invalid(format!(
                "critique_request 必须包含 {} 和 {}",
                TITLE_PLACEHOLDER, CONTENT_PLACEHOLDER
            )));
        }
        if self.prompts.extraction_request.trim().is_empty() {
            return Err(invalid("extraction_request 不能为空"));
        }
        if self.prompts.image_critique_request.trim().is_empty() {
            return Err(invalid("image_critique_request 不能为空"));
        }

        Ok(())
    }

    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }
}

fn invalid(reason: impl Into<String>) -> RubricError {
    RubricError::Invalid {
        reason: reason.into(),
    }
}
