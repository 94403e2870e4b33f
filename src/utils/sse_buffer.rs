//! SSE 行缓冲
//!
//! Gemini 的 `streamGenerateContent?alt=sse` 按 `data: {json}` 行推送；网络 chunk 的边界
//! 可能落在一行中间，甚至落在一个 UTF-8 多字节字符中间。这里负责把字节流还原成完整的行。

#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// 已解码、尚未凑成整行的文本
    partial_line: String,
    /// 上一个 chunk 末尾未凑齐的 UTF-8 字节
    pending_bytes: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加原始字节，返回本次凑齐的非空行
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending_bytes.extend_from_slice(chunk);
        let decodable = match std::str::from_utf8(&self.pending_bytes) {
            Ok(_) => self.pending_bytes.len(),
            // 末尾字符被截断，留到下一个 chunk
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending_bytes).into_owned();
                self.pending_bytes.clear();
                return self.push_str(&text);
            }
        };
        let tail = self.pending_bytes.split_off(decodable);
        let head = std::mem::replace(&mut self.pending_bytes, tail);
        let text = String::from_utf8_lossy(&head).into_owned();
        self.push_str(&text)
    }

    /// 追加已解码文本，返回本次凑齐的非空行（去掉行尾 `\r`）
    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        self.partial_line.push_str(text);
        let mut lines = Vec::new();
        while let Some(newline) = self.partial_line.find('\n') {
            let line: String = self.partial_line.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    pub fn has_remaining(&self) -> bool {
        !self.partial_line.is_empty() || !self.pending_bytes.is_empty()
    }

    /// 流结束时取出最后一行（服务端可能不以换行收尾）
    pub fn take_remaining(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.partial_line.push_str(&tail);
            self.pending_bytes.clear();
        }
        let rest = std::mem::take(&mut self.partial_line);
        let rest = rest.trim_end_matches(['\n', '\r']);
        (!rest.trim().is_empty()).then(|| rest.to_string())
    }

    /// `data:` 行的负载；其它字段（event / id / retry / 注释）返回 None
    pub fn data_payload(line: &str) -> Option<&str> {
        line.strip_prefix("data:").map(str::trim_start)
    }

    /// OpenAI 兼容网关会在末尾追加 `[DONE]`
    pub fn is_done_payload(payload: &str) -> bool {
        payload.trim() == "[DONE]"
    }
}
