//! 图片编码 - 业务能力层
//!
//! 只负责把图片字节转换成可内嵌到请求中的 data URI，无副作用。

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::models::image::{EncodedImage, ImageAsset};

/// 将图片编码为 `data:<media-type>;base64,<payload>`
///
/// 图片内容为空时返回 `None` 而不是报错。相同字节总是得到相同结果。
pub fn encode(asset: &ImageAsset) -> Option<EncodedImage> {
    if asset.is_empty() {
        debug!("图片内容为空，跳过编码: {:?}", asset.name);
        return None;
    }

    let payload = STANDARD.encode(&asset.bytes);
    let data_uri = format!("data:{};base64,{}", asset.media_type.as_mime(), payload);

    debug!(
        "图片编码完成: {} 字节 -> {} 字符 ({})",
        asset.bytes.len(),
        data_uri.len(),
        asset.media_type
    );

    Some(EncodedImage::new(asset.media_type, data_uri))
}

/// 依次编码多张图片，跳过内容为空的图片，保持顺序
pub fn encode_all(assets: &[ImageAsset]) -> Vec<EncodedImage> {
    assets.iter().filter_map(encode).collect()
}
