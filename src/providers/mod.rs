//! 生成能力适配层
//!
//! 会话控制器只依赖 `GenerationProvider` trait：
//! - `generate`：单次返回完整文本（测验的结构化输出、解题的多模态请求）
//! - `generate_stream`：按顺序产出文本增量（讲解模式）
//!
//! `GeminiProvider` 是基于 HTTP 的默认实现。

pub mod gemini;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Result;

pub use gemini::GeminiProvider;

/// 文本增量流（有限、惰性、不可重启）
pub type TextStream = BoxStream<'static, Result<String>>;

/// 随请求内联发送的图片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    /// 不含 `data:` 前缀的 base64
    pub data: String,
}

/// 单次生成请求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
    /// 要求模型按此 schema 输出 JSON
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn structured(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            response_schema: Some(schema),
        }
    }

    pub fn multimodal(prompt: impl Into<String>, image: InlineImage) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
            response_schema: None,
        }
    }

    pub fn wants_json(&self) -> bool {
        self.response_schema.is_some()
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// 单次生成，返回完整文本
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// 流式生成，返回按到达顺序排列的文本增量
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream>;

    fn name(&self) -> &str {
        "unknown"
    }
}
