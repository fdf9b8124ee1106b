//! 提示词构建 - 业务能力层
//!
//! 把评分标准和用户输入组装成消息序列，纯数据转换，不做任何 I/O。
//!
//! 系统消息在构造时渲染一次并缓存，因此同一个 `PromptBuilder` 产生的评分标准文本
//! 逐字节一致，只有论说文或图片部分会变化。

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::essay::Essay;
use crate::models::image::{EncodedImage, MAX_IMAGES};
use crate::models::message::{ChatMessage, MessageSequence};
use crate::models::rubric::{RubricSpec, CONTENT_PLACEHOLDER, TITLE_PLACEHOLDER};

/// 构建模式
#[derive(Debug, Clone, Copy)]
pub enum PromptMode<'a> {
    /// 文本评改：系统消息（评分标准）+ 用户消息（标题和正文）
    Text(&'a Essay),
    /// 图片直接评改：系统消息 + 说明文字和图片
    Image(&'a [EncodedImage]),
    /// 手写文本提取：只有说明文字和图片，不含评分标准
    Extraction(&'a [EncodedImage]),
}

/// 提示词构建器
pub struct PromptBuilder {
    rubric: Arc<RubricSpec>,
    system_prompt: String,
}

impl PromptBuilder {
    pub fn new(rubric: Arc<RubricSpec>) -> Self {
        let system_prompt = render_system_prompt(&rubric);
        debug!(
            "系统提示词已生成: 评分标准 {} (版本 {}), {} 字符",
            rubric.title,
            rubric.version,
            system_prompt.chars().count()
        );
        Self {
            rubric,
            system_prompt,
        }
    }

    pub fn rubric(&self) -> &RubricSpec {
        &self.rubric
    }

    /// 内嵌评分标准的系统消息
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn build(&self, mode: PromptMode<'_>) -> MessageSequence {
        match mode {
            PromptMode::Text(essay) => self.build_text(essay),
            PromptMode::Image(images) => self.build_image_critique(images),
            PromptMode::Extraction(images) => self.build_extraction(images),
        }
    }

    /// 文本评改
    pub fn build_text(&self, essay: &Essay) -> MessageSequence {
        let user_content = render_template(
            &self.rubric.prompts.critique_request,
            &[
                (TITLE_PLACEHOLDER, essay.title()),
                (CONTENT_PLACEHOLDER, essay.content()),
            ],
        );

        MessageSequence::from(vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(user_content),
        ])
    }

    /// 单阶段图片评改：一次请求内完成提取和评改
    pub fn build_image_critique(&self, images: &[EncodedImage]) -> MessageSequence {
        let images = cap_images(images);
        MessageSequence::from(vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user_with_images(self.rubric.prompts.image_critique_request.clone(), images),
        ])
    }

    /// 两阶段流程的第一步：只做逐字转写，不做评价
    pub fn build_extraction(&self, images: &[EncodedImage]) -> MessageSequence {
        let images = cap_images(images);
        MessageSequence::from(vec![ChatMessage::user_with_images(
            self.rubric.prompts.extraction_request.clone(),
            images,
        )])
    }
}

fn cap_images(images: &[EncodedImage]) -> &[EncodedImage] {
    if images.len() > MAX_IMAGES {
        warn!(
            "⚠️ 构建提示词时收到 {} 张图片，只使用前 {} 张",
            images.len(),
            MAX_IMAGES
        );
        &images[..MAX_IMAGES]
    } else {
        images
    }
}

/// 渲染系统消息：角色设定、评分标准、反馈写作要求
fn render_system_prompt(rubric: &RubricSpec) -> String {
    let mut prompt = String::new();

    prompt.push_str(rubric.persona.trim());
    prompt.push_str("\n\n");

    let _ = writeln!(
        prompt,
        "[핵심 평가 기준 ({}, 버전 {})]",
        rubric.title, rubric.version
    );
    for (idx, criterion) in rubric.criteria.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. **{}:** {}",
            idx + 1,
            criterion.name,
            criterion.description
        );
        for strategy in &criterion.strategies {
            let _ = writeln!(prompt, "   - {}", strategy);
        }
        let _ = writeln!(prompt, "   ▶ 보완 방법: {}", criterion.remediation);
    }

    prompt.push_str("\n[피드백 작성 지침]\n");
    let _ = writeln!(prompt, "- 대상 독자: {}", rubric.audience);
    let _ = writeln!(
        prompt,
        "- 상태 표시: {} 충족, {} 부분 충족, {} 미흡",
        rubric.markers.pass, rubric.markers.partial, rubric.markers.fail
    );
    for (idx, guideline) in rubric.guidelines.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", idx + 1, guideline);
    }

    prompt.trim_end().to_string()
}

/// 单遍替换模板中的占位符
///
/// 替换进去的值不会被再次扫描，用户文本中出现 `{content}` 之类的字样也原样保留。
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'outer: while !rest.is_empty() {
        if rest.starts_with('{') {
            for (placeholder, value) in vars {
                if rest.starts_with(placeholder) {
                    out.push_str(value);
                    rest = &rest[placeholder.len()..];
                    continue 'outer;
                }
            }
        }
        let next = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '{')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push_str(&rest[..next]);
        rest = &rest[next..];
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::{ImageAsset, MediaType};
    use crate::models::message::{ContentPart, MessageContent, Role};
    use crate::services::image_encoder;
    use crate::test_utils::fixtures;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(Arc::new(fixtures::minimal_rubric()))
    }

    fn encoded(tag: u8) -> EncodedImage {
        image_encoder::encode(&ImageAsset::new(vec![tag; 4], MediaType::Jpeg)).unwrap()
    }

    #[test]
    fn test_text_mode_layout() {
        let essay = Essay::new("가족", "가족은 소중합니다.").unwrap();
        let messages = builder().build(PromptMode::Text(&essay));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages.messages()[0].role, Role::System);
        assert_eq!(messages.messages()[1].role, Role::User);

        let user = messages.messages()[1].text();
        assert!(user.contains("가족"));
        assert!(user.contains("가족은 소중합니다."));
        assert!(!user.contains("{title}"));
    }

    #[test]
    fn test_rubric_text_identical_across_essays() {
        let builder = builder();
        let a = Essay::new("가족", "가족은 소중합니다.").unwrap();
        let b = Essay::new("환경", "분리수거를 생활화해야 합니다.").unwrap();

        let first = builder.build_text(&a);
        let second = builder.build_text(&b);

        assert_eq!(first.system_message(), second.system_message());
        assert_ne!(first.messages()[1], second.messages()[1]);
    }

    #[test]
    fn test_system_prompt_embeds_rubric() {
        let builder = PromptBuilder::new(Arc::new(RubricSpec::embedded().unwrap()));
        let prompt = builder.system_prompt();

        for criterion in &builder.rubric().criteria {
            assert!(prompt.contains(&criterion.name), "缺少标准: {}", criterion.name);
            assert!(prompt.contains(&criterion.remediation));
        }
        assert!(prompt.contains("✅"));
        assert!(prompt.contains("🔺"));
        assert!(prompt.contains("❌"));
        assert!(prompt.contains("중학생"));
    }

    #[test]
    fn test_image_mode_preserves_order() {
        let images = vec![encoded(1), encoded(2)];
        let messages = builder().build(PromptMode::Image(&images));

        assert_eq!(messages.len(), 2);
        assert!(messages.system_message().is_some());
        let user = &messages.messages()[1];
        match &user.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(parts[0], ContentPart::Text(_)));
                assert_eq!(parts[1], ContentPart::ImageUrl(images[0].data_uri().to_string()));
                assert_eq!(parts[2], ContentPart::ImageUrl(images[1].data_uri().to_string()));
            }
            other => panic!("期望多段内容, 实际: {:?}", other),
        }
    }

    #[test]
    fn test_extraction_mode_has_no_rubric() {
        let builder = builder();
        let images = vec![encoded(1)];
        let messages = builder.build(PromptMode::Extraction(&images));

        assert_eq!(messages.len(), 1);
        assert!(messages.system_message().is_none());
        let user = &messages.messages()[0];
        assert_eq!(user.text(), builder.rubric().prompts.extraction_request);
        assert_eq!(user.image_urls(), vec![images[0].data_uri()]);
    }

    #[test]
    fn test_images_capped_at_two() {
        let images = vec![encoded(1), encoded(2), encoded(3)];
        let messages = builder().build_extraction(&images);
        assert_eq!(messages.image_count(), 2);
        assert!(!messages.messages()[0]
            .image_urls()
            .contains(&images[2].data_uri()));
    }

    #[test]
    fn test_render_template_single_pass() {
        let rendered = render_template(
            "제목: {title} / 내용: {content}",
            &[("{title}", "{content}"), ("{content}", "본문 {x}")],
        );
        assert_eq!(rendered, "제목: {content} / 내용: 본문 {x}");
    }

    #[test]
    fn test_render_template_leaves_unknown_braces() {
        let rendered = render_template("{a} {title}{", &[("{title}", "T")]);
        assert_eq!(rendered, "{a} T{");
    }
}
