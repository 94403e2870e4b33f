// src/providers/gemini.rs

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::{GenerationProvider, GenerationRequest, TextStream};
use crate::models::{AppError, Result};
use crate::tutor_config::GeminiConfig;
use crate::utils::sse_buffer::SseLineBuffer;

/// Google Gemini `generateContent` / `streamGenerateContent` 适配
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::configuration(format!("HTTP 客户端初始化失败: {}", e)))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// 构建 Gemini API URL
    fn build_url(&self, stream: bool) -> String {
        let endpoint = if stream {
            "streamGenerateContent?alt=sse&"
        } else {
            "generateContent?"
        };
        format!(
            "{}/v1beta/models/{}:{}key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            endpoint,
            self.config.api_key.trim()
        )
    }

    fn ensure_api_key(&self) -> Result<()> {
        if self.config.api_key.trim().is_empty() {
            return Err(AppError::configuration("未配置 Gemini API Key"));
        }
        Ok(())
    }

    async fn post(&self, stream: bool, body: &Value) -> Result<reqwest::Response> {
        self.ensure_api_key()?;
        let response = self
            .client
            .post(self.build_url(stream))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::network(format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::llm(format!(
                "Gemini API error: {} - {}",
                status, error_text
            )));
        }
        Ok(response)
    }
}

/// 构建 Gemini 请求体
pub(crate) fn build_request_body(request: &GenerationRequest, temperature: Option<f32>) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = &request.image {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.mime_type,
                "data": image.data,
            }
        }));
    }
    parts.push(json!({ "text": request.prompt }));

    let mut generation_config = Map::new();
    if let Some(t) = temperature {
        generation_config.insert("temperature".into(), json!(t));
    }
    if let Some(schema) = &request.response_schema {
        generation_config.insert("responseMimeType".into(), json!("application/json"));
        generation_config.insert("responseSchema".into(), schema.clone());
    }

    let mut body = json!({
        "contents": [{ "role": "user", "parts": parts }],
    });
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }
    body
}

/// 提取首个候选的文本（跳过思考片段）
pub(crate) fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)?;
    let text: String = parts
        .iter()
        .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    Some(text)
}

fn blocked_reason(response: &Value) -> Option<String> {
    response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
        .map(str::to_string)
}

struct SseState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    lines: SseLineBuffer,
    pending: VecDeque<String>,
    finished: bool,
}

impl SseState {
    fn push_line(&mut self, line: &str) {
        let Some(data) = SseLineBuffer::data_payload(line) else {
            return;
        };
        if SseLineBuffer::is_done_payload(data) {
            return;
        }
        match serde_json::from_str::<Value>(data) {
            Ok(json_data) => {
                if let Some(text) = extract_text(&json_data) {
                    if !text.is_empty() {
                        self.pending.push_back(text);
                    }
                }
            }
            Err(e) => tracing::warn!("[Gemini] 跳过无法解析的 SSE 数据: {}", e),
        }
    }
}

/// 把 SSE 字节流转换为文本增量流
fn sse_text_stream(response: reqwest::Response) -> TextStream {
    let state = SseState {
        bytes: response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed(),
        lines: SseLineBuffer::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(text) = st.pending.pop_front() {
                return Some((Ok(text), st));
            }
            if st.finished {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    for line in st.lines.push_bytes(&chunk) {
                        st.push_line(&line);
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((
                        Err(AppError::network(format!("Stream read error: {}", e))),
                        st,
                    ));
                }
                None => {
                    st.finished = true;
                    if let Some(rest) = st.lines.take_remaining() {
                        st.push_line(&rest);
                    }
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let body = build_request_body(&request, self.config.temperature);
        let response = self.post(false, &body).await?;
        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AppError::network(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(reason) = blocked_reason(&response_json) {
            return Err(AppError::llm(format!("Gemini 拒绝了请求: {}", reason)));
        }
        extract_text(&response_json)
            .ok_or_else(|| AppError::llm("Gemini 响应中没有候选内容"))
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let body = build_request_body(&GenerationRequest::text(prompt), self.config.temperature);
        let response = self.post(true, &body).await?;
        tracing::debug!("[Gemini] 流式响应已建立: model={}", self.config.model);
        Ok(sse_text_stream(response))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
