//! 家教面板配置
//!
//! 加载顺序：`.env`（dotenvy）→ 环境变量 `TUTOR__*` → 可选的 `config/tutor.toml`，
//! 最后对 API Key 做直接环境变量回退（`GEMINI_API_KEY` / `API_KEY`）。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "config/tutor";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: String::new(),
            timeout_secs: 300,
            temperature: None,
        }
    }
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mermaid.ink".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub gemini: GeminiConfig,
    pub renderer: RendererConfig,
    /// 图表 PNG 的导出目录
    pub export_dir: PathBuf,
    pub log_level: String,
    /// 讲解与解题的回答语言
    pub language: String,
    /// 解题图片超过该边长会被等比缩小
    pub max_image_dimension: u32,
    /// 解题图片超过该字节数会被重新压缩
    pub max_image_bytes: usize,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            renderer: RendererConfig::default(),
            export_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            language: "繁體中文".to_string(),
            max_image_dimension: 2048,
            max_image_bytes: 4 * 1024 * 1024,
        }
    }
}

impl TutorConfig {
    pub fn from_env_and_file() -> Result<Self> {
        dotenvy::dotenv().ok();
        let file = Path::new(DEFAULT_CONFIG_FILE).with_extension("toml");
        Self::load(file.exists().then_some(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// 从环境变量和（可选）配置文件加载；文件路径不带扩展名时按 config 的规则查找
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Environment::with_prefix("TUTOR")
                .separator("__")
                .try_parsing(true),
        );
        if let Some(path) = file {
            let name = path
                .to_str()
                .ok_or_else(|| AppError::configuration("配置文件路径不是有效的 UTF-8"))?;
            builder = builder.add_source(config::File::with_name(name).required(false));
        }
        let mut tutor: TutorConfig = builder.build()?.try_deserialize()?;

        // direct env fallbacks
        if tutor.gemini.api_key.trim().is_empty() {
            tutor.gemini.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .unwrap_or_default();
        }
        Ok(tutor)
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini.api_key.trim().is_empty()
    }
}
