//! 图片相关数据模型
//!
//! 上传的图片只在一次"编码 + 发送"过程中短暂持有，不做任何持久化。

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::warn;

use crate::error::ValidationError;

/// 单次分析请求最多处理的图片数量
pub const MAX_IMAGES: usize = 2;

/// 支持的图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl MediaType {
    /// MIME 类型字符串
    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
        }
    }

    /// 从 MIME 类型解析
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(MediaType::Jpeg),
            "image/png" => Some(MediaType::Png),
            "image/gif" => Some(MediaType::Gif),
            "image/webp" => Some(MediaType::Webp),
            _ => None,
        }
    }

    /// 从文件扩展名解析
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "gif" => Some(MediaType::Gif),
            "webp" => Some(MediaType::Webp),
            _ => None,
        }
    }

    /// 根据文件头魔数判断格式
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(MediaType::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(MediaType::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(MediaType::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(MediaType::Webp)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// 用户上传的图片
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    /// 原始文件名（仅用于日志）
    pub name: Option<String>,
}

impl ImageAsset {
    pub fn new(bytes: Vec<u8>, media_type: MediaType) -> Self {
        Self {
            bytes,
            media_type,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 从文件读取图片
    ///
    /// 先按扩展名判断格式，扩展名缺失或无法识别时再检查文件头。
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("无法读取图片文件: {}", path.display()))?;

        if bytes.is_empty() {
            return Err(ValidationError::EmptyImagePayload.into());
        }

        let media_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaType::from_extension)
            .or_else(|| MediaType::sniff(&bytes))
            .ok_or_else(|| ValidationError::UnsupportedMediaType(path.display().to_string()))?;

        let mut asset = Self::new(bytes, media_type);
        if let Some(name) = path.file_name() {
            asset.name = Some(name.to_string_lossy().to_string());
        }
        Ok(asset)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("media_type", &self.media_type)
            .field("name", &self.name)
            .finish()
    }
}

/// 编码后的图片，可直接内嵌到请求消息中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    media_type: MediaType,
    data_uri: String,
}

impl EncodedImage {
    pub(crate) fn new(media_type: MediaType, data_uri: String) -> Self {
        Self {
            media_type,
            data_uri,
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// `data:<media-type>;base64,<payload>`
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

/// 截断后的图片集合
#[derive(Debug, Clone, Default)]
pub struct StagedImages {
    pub images: Vec<ImageAsset>,
    /// 被丢弃的图片数量
    pub dropped: usize,
}

impl StagedImages {
    pub fn supplied(&self) -> usize {
        self.images.len() + self.dropped
    }
}

/// 将图片集合截断到 [`MAX_IMAGES`] 张，保持原有顺序
///
/// 超出部分在编码之前丢弃，不算错误。
pub fn stage_images(mut images: Vec<ImageAsset>) -> StagedImages {
    let dropped = images.len().saturating_sub(MAX_IMAGES);
    if dropped > 0 {
        warn!(
            "⚠️ 提供了 {} 张图片，只保留前 {} 张",
            images.len(),
            MAX_IMAGES
        );
        images.truncate(MAX_IMAGES);
    }
    StagedImages { images, dropped }
}
