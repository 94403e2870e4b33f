//! 拍照解题的图片负载
//!
//! 支持两种来源：前端传来的 data URL，以及本地读取的原始字节。
//! 超过尺寸/体积上限的图片会等比缩小并重新压缩为 JPEG。

use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat, ImageOutputFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

use crate::models::{AppError, Result};
use crate::providers::InlineImage;

const DEFAULT_MIME: &str = "image/jpeg";
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveImage {
    pub mime_type: String,
    /// 不含前缀的 base64
    pub data: String,
    pub byte_len: usize,
}

impl SolveImage {
    /// 解析 `data:<mime>;base64,<payload>`；缺少 mime 时按 JPEG 处理
    ///
    /// 只做格式解析，不检查尺寸；宿主传入的图片应走 [`SolveImage::from_data_url_with_limits`]。
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| AppError::validation("不是有效的 data URL"))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::validation("data URL 缺少数据段"))?;
        if !meta.ends_with(";base64") {
            return Err(AppError::validation("仅支持 base64 编码的图片"));
        }
        let mime = meta.trim_end_matches(";base64");
        let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
        if !mime.starts_with("image/") {
            return Err(AppError::validation(format!("不支持的文件类型: {}", mime)));
        }

        let payload = payload.trim();
        let decoded = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| AppError::validation(format!("图片 base64 解码失败: {}", e)))?;
        if decoded.is_empty() {
            return Err(AppError::validation("图片内容为空"));
        }

        Ok(Self {
            mime_type: mime.to_string(),
            data: payload.to_string(),
            byte_len: decoded.len(),
        })
    }

    /// 解析 data URL 并套用尺寸/体积上限，超限时缩小并压缩
    pub fn from_data_url_with_limits(
        data_url: &str,
        max_dimension: u32,
        max_bytes: usize,
    ) -> Result<Self> {
        let parsed = Self::from_data_url(data_url)?;
        let bytes = general_purpose::STANDARD
            .decode(&parsed.data)
            .map_err(|e| AppError::validation(format!("图片 base64 解码失败: {}", e)))?;
        Self::from_bytes(&bytes, max_dimension, max_bytes)
    }

    /// 从原始字节构建；超过上限时缩小并压缩
    pub fn from_bytes(bytes: &[u8], max_dimension: u32, max_bytes: usize) -> Result<Self> {
        if bytes.is_empty() {
            return Err(AppError::validation("图片内容为空"));
        }
        let format = image::guess_format(bytes)
            .map_err(|e| AppError::validation(format!("无法识别的图片格式: {}", e)))?;

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| AppError::validation(format!("加载图片失败: {}", e)))?;
        let (width, height) = decoded.dimensions();

        if bytes.len() <= max_bytes && width <= max_dimension && height <= max_dimension {
            return Ok(Self {
                mime_type: mime_for(format).to_string(),
                data: general_purpose::STANDARD.encode(bytes),
                byte_len: bytes.len(),
            });
        }

        let resized = if width <= max_dimension && height <= max_dimension {
            decoded
        } else {
            decoded.resize(max_dimension, max_dimension, FilterType::Triangle)
        };
        // JPEG 不支持透明通道
        let rgb = image::DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut cursor = Cursor::new(Vec::new());
        rgb.write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY))
            .map_err(|e| AppError::file_system(format!("压缩图片失败: {}", e)))?;
        let buffer = cursor.into_inner();
        tracing::debug!(
            "[SolveImage] 图片已压缩: {}x{} {}B -> {}B",
            width,
            height,
            bytes.len(),
            buffer.len()
        );

        Ok(Self {
            mime_type: DEFAULT_MIME.to_string(),
            data: general_purpose::STANDARD.encode(&buffer),
            byte_len: buffer.len(),
        })
    }

    pub fn from_path(path: &Path, max_dimension: u32, max_bytes: usize) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::file_system(format!("读取图片失败: {}", e)))?;
        Self::from_bytes(&bytes, max_dimension, max_bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn to_inline(&self) -> InlineImage {
        InlineImage {
            mime_type: self.mime_type.clone(),
            data: self.data.clone(),
        }
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        _ => DEFAULT_MIME,
    }
}
