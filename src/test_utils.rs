use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::{CompletionClient, CompletionParams};
use crate::error::CompletionError;
use crate::models::message::MessageSequence;

/// 记录每次调用的假补全服务
///
/// 按顺序返回预先放入的结果，队列为空时返回一段固定反馈。
#[derive(Default)]
pub struct FakeCompletionClient {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: Mutex<Vec<(MessageSequence, CompletionParams)>>,
}

impl FakeCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, error: CompletionError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<(MessageSequence, CompletionParams)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletionClient {
    async fn complete(
        &self,
        messages: &MessageSequence,
        params: &CompletionParams,
    ) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.clone(), params.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("✅ 모의 피드백".to_string()))
    }
}

pub mod fixtures {
    use crate::models::image::{ImageAsset, MediaType};
    use crate::models::rubric::RubricSpec;

    /// 只有一条标准的最小评分标准
    pub const MINIMAL_RUBRIC: &str = r#"
version = "test-1"
title = "테스트 기준"
persona = "테스트용 첨삭 도우미입니다."
audience = "중학생"

[prompts]
critique_request = "제목: {title}\n내용: {content}"
image_critique_request = "이미지를 읽고 첨삭해 주세요."
extraction_request = "이미지의 글을 그대로 옮겨 적으세요. 평가는 하지 마세요."

[[criteria]]
name = "주장"
description = "주장이 분명한가?"
remediation = "주장 문장을 다시 써 보세요."
"#;

    pub fn minimal_rubric() -> RubricSpec {
        RubricSpec::from_toml_str(MINIMAL_RUBRIC).unwrap()
    }

    /// 내용이 서로 다른 JPEG 이미지
    pub fn jpeg(tag: u8) -> ImageAsset {
        ImageAsset::new(vec![0xFF, 0xD8, 0xFF, tag], MediaType::Jpeg)
            .with_name(format!("page{}.jpg", tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::ChatMessage;

    #[tokio::test]
    async fn test_fake_client_replays_in_order() {
        let client = FakeCompletionClient::new();
        client.push_ok("first");
        client.push_err(CompletionError::InvalidRequest {
            message: "bad".to_string(),
        });

        let messages = MessageSequence::from(vec![ChatMessage::user("hi")]);
        let params = CompletionParams {
            model: "m".to_string(),
            temperature: 0.0,
            max_output_tokens: 10,
        };

        tokio_test::assert_ok!(client.complete(&messages, &params).await);
        tokio_test::assert_err!(client.complete(&messages, &params).await);
        assert_eq!(
            client.complete(&messages, &params).await.unwrap(),
            "✅ 모의 피드백"
        );
        assert_eq!(client.call_count(), 3);
    }
}
