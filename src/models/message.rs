//! 发送给补全服务的消息序列
//!
//! 与具体 SDK 无关的中间表示，客户端负责转换为线上格式。

use crate::models::image::EncodedImage;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// 多段消息中的一段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// 图片，内容为 data URI
    ImageUrl(String),
}

/// 消息内容：纯文本或文本与图片混合
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// 一段说明文字后接若干图片
    pub fn user_with_images(text: impl Into<String>, images: &[EncodedImage]) -> Self {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(ContentPart::Text(text.into()));
        parts.extend(
            images
                .iter()
                .map(|img| ContentPart::ImageUrl(img.data_uri().to_string())),
        );
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    /// 消息中的全部文本，图片部分忽略
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text(text) => Some(text.as_str()),
                    ContentPart::ImageUrl(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// 消息中的图片 data URI
    pub fn image_urls(&self) -> Vec<&str> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ImageUrl(url) => Some(url.as_str()),
                    ContentPart::Text(_) => None,
                })
                .collect(),
        }
    }
}

/// 有序的消息序列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSequence {
    messages: Vec<ChatMessage>,
}

impl MessageSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 第一条系统消息
    pub fn system_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.role == Role::System)
    }

    /// 所有用户消息
    pub fn user_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role == Role::User)
    }

    /// 序列中图片部分的总数
    pub fn image_count(&self) -> usize {
        self.messages.iter().map(|m| m.image_urls().len()).sum()
    }
}

impl From<Vec<ChatMessage>> for MessageSequence {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}
