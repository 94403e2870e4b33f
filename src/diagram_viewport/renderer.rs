//! 图表渲染协作方
//!
//! 给定 mermaid 源码，异步返回 SVG 标记；渲染失败只记录日志，不影响讲解正文。

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;

use crate::models::{AppError, Result};
use crate::tutor_config::RendererConfig;

#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// 渲染图表源码，返回 SVG 文本
    async fn render(&self, source: &str) -> Result<String>;
}

/// 通过 mermaid.ink 服务渲染
pub struct MermaidInkRenderer {
    client: Client,
    base_url: String,
}

impl MermaidInkRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::configuration(format!("HTTP 客户端初始化失败: {}", e)))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn svg_url(&self, source: &str) -> String {
        let encoded = general_purpose::URL_SAFE.encode(source.as_bytes());
        format!("{}/svg/{}", self.base_url, encoded)
    }
}

#[async_trait]
impl DiagramRenderer for MermaidInkRenderer {
    async fn render(&self, source: &str) -> Result<String> {
        let response = self
            .client
            .get(self.svg_url(source))
            .send()
            .await
            .map_err(|e| AppError::network(format!("图表渲染请求失败: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::render(format!(
                "图表渲染失败: {} - {}",
                status, error_text
            )));
        }

        let svg = response.text().await?;
        if !svg.trim_start().starts_with("<svg") && !svg.trim_start().starts_with("<?xml") {
            return Err(AppError::render("渲染服务返回的不是 SVG"));
        }
        Ok(svg)
    }
}
