//! 流式讲解文档解析
//!
//! 把流式生成的累计文本拆成「图表源码」与「讲解正文」两段：
//! - 找到第一个 ```mermaid ... ``` 围栏，内部内容（trim 后）作为图表源码
//! - 正文 = 去掉整个围栏（含标记）后的剩余文本，再 trim
//! - 围栏尚未闭合时，正文即完整累计文本，图表源码为空
//!
//! 解析是累计缓冲区的纯函数，每收到一个增量都可以从头重算。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// 图表围栏的语言标记
pub const DIAGRAM_FENCE_TAG: &str = "mermaid";

static DIAGRAM_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```mermaid(.*?)```").unwrap());

/// 讲解模式产出的结构化文档
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub diagram_source: Option<String>,
    pub narrative: String,
}

impl GeneratedDocument {
    pub fn is_empty(&self) -> bool {
        self.diagram_source.is_none() && self.narrative.is_empty()
    }
}

/// 从累计文本推导文档（纯函数）
pub fn parse(cumulative: &str) -> GeneratedDocument {
    match DIAGRAM_FENCE.captures(cumulative) {
        Some(caps) => {
            let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let narrative = DIAGRAM_FENCE.replacen(cumulative, 1, "");
            GeneratedDocument {
                // 空围栏没有可渲染的内容
                diagram_source: (!inner.is_empty()).then(|| inner.to_string()),
                narrative: narrative.trim().to_string(),
            }
        }
        None => GeneratedDocument {
            diagram_source: None,
            narrative: cumulative.to_string(),
        },
    }
}

/// 持有累计缓冲区的解析器，按到达顺序追加增量
#[derive(Debug, Clone, Default)]
pub struct StreamDocumentParser {
    buffer: String,
    document: GeneratedDocument,
    increments: usize,
}

impl StreamDocumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个增量并重新推导文档
    pub fn push(&mut self, increment: &str) -> &GeneratedDocument {
        self.buffer.push_str(increment);
        self.increments += 1;
        self.document = parse(&self.buffer);
        &self.document
    }

    pub fn document(&self) -> &GeneratedDocument {
        &self.document
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn increments(&self) -> usize {
        self.increments
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.document = GeneratedDocument::default();
        self.increments = 0;
    }
}
