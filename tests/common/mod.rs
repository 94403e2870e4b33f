//! 集成测试共用的脚本化协作方
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use study_tutor_lib::providers::{GenerationProvider, GenerationRequest, TextStream};
use study_tutor_lib::{AppError, Result, TutorContext, TutorHost, TutorSession};

/// 按脚本返回结果的生成服务
#[derive(Default)]
pub struct ScriptedProvider {
    streams: Mutex<VecDeque<StreamScript>>,
    responses: Mutex<VecDeque<Result<String>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
    /// 设置后 `generate` 会一直等到被放行
    gate: Option<Arc<Notify>>,
}

pub enum StreamScript {
    /// 依次产出这些增量后结束
    Finite(Vec<Result<String>>),
    /// 产出这些增量后挂起，永不结束
    Stalled(Vec<String>),
    /// 打开流即失败
    OpenError(AppError),
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub fn push_response(self, response: Result<String>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::llm("脚本已耗尽")))
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        self.requests
            .lock()
            .unwrap()
            .push(GenerationRequest::text(prompt));
        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StreamScript::Finite(Vec::new()));
        match script {
            StreamScript::Finite(items) => Ok(stream::iter(items).boxed()),
            StreamScript::Stalled(items) => Ok(stream::iter(items.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            StreamScript::OpenError(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// 记录所有提示与保存内容的宿主
#[derive(Default)]
pub struct RecordingHost {
    pub alerts: Mutex<Vec<String>>,
    pub saved: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }
}

impl TutorHost for RecordingHost {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn save_to_note(&self, content: &str) -> bool {
        self.saved.lock().unwrap().push(content.to_string());
        true
    }
}

pub fn context() -> TutorContext {
    TutorContext::new("一元一次方程式", "國中一年級", "數學")
}

pub fn session_with(
    provider: ScriptedProvider,
) -> (Arc<TutorSession>, Arc<ScriptedProvider>, Arc<RecordingHost>) {
    let provider = Arc::new(provider);
    let host = Arc::new(RecordingHost::default());
    let session = Arc::new(TutorSession::new(
        context(),
        provider.clone(),
        host.clone(),
    ));
    (session, provider, host)
}

/// 轮询直到条件成立（最多 2 秒）
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub fn quiz_json(correct: [usize; 3]) -> String {
    serde_json::json!([
        {
            "question": "2x + 3 = 7，x = ?",
            "options": ["1", "2", "3", "4"],
            "correctIndex": correct[0],
            "explanation": "兩邊同減 3 再除以 2"
        },
        {
            "question": "x - 5 = 0，x = ?",
            "options": ["0", "5", "-5", "10"],
            "correctIndex": correct[1],
            "explanation": "移項"
        },
        {
            "question": "3x = 9，x = ?",
            "options": ["1", "2", "3", "9"],
            "correctIndex": correct[2],
            "explanation": "兩邊同除以 3"
        }
    ])
    .to_string()
}
