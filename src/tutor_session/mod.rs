//! 家教面板会话控制器
//!
//! 三种模式（讲解 / 测验 / 拍照解题）的状态机：
//! - 所有操作都是 `&self`，状态放在互斥锁里，锁不跨 await 持有；
//!   另一个任务上的导航操作（返回菜单、关闭、切换单元）可以随时取代在途请求
//! - 每次外部调用都带 `RequestTicket`，被取代的响应直接丢弃，不改状态也不弹提示
//! - 宿主回调（提示框 / 存入笔记）一律在释放锁之后调用

pub mod host;
pub mod prompts;
pub mod state;

use futures_util::StreamExt;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::json_validator::{self, Stage};
use crate::models::{AppError, AppErrorType, Result, TutorContext};
use crate::providers::{GenerationProvider, GenerationRequest};
use crate::quiz_engine::{QuizEngine, QuizItem};
use crate::solve_image::SolveImage;
use crate::tutor_config::TutorConfig;

pub use host::{NoteSink, TutorHost};
pub use state::{
    ExplainStatus, Mode, ModeKind, ModeView, RequestOutcome, RequestTicket, SessionSnapshot,
    SolveRequest, COPY_ALERT, EXPLAIN_FAILURE_ALERT, EXPLAIN_FAILURE_MESSAGE, QUIZ_FAILURE_ALERT,
    SOLVE_FAILURE_ALERT, SOLVE_IMAGE_REQUIRED_ALERT,
};
use state::{ExplainState, SessionState};

pub struct TutorSession {
    /// 仅用于日志关联
    id: Uuid,
    provider: Arc<dyn GenerationProvider>,
    host: Arc<dyn TutorHost>,
    /// 提示词中要求的回答语言
    language: String,
    /// 宿主以 data URL 传入的图片按这两个上限缩小
    max_image_dimension: u32,
    max_image_bytes: usize,
    state: Mutex<SessionState>,
}

impl TutorSession {
    pub fn new(
        context: TutorContext,
        provider: Arc<dyn GenerationProvider>,
        host: Arc<dyn TutorHost>,
    ) -> Self {
        Self::with_config(context, provider, host, &TutorConfig::default())
    }

    pub fn with_config(
        context: TutorContext,
        provider: Arc<dyn GenerationProvider>,
        host: Arc<dyn TutorHost>,
        config: &TutorConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(
            "[TutorSession] 打开面板: session={}, topic={}, provider={}",
            id,
            context.topic,
            provider.name()
        );
        Self {
            id,
            provider,
            host,
            language: config.language.clone(),
            max_image_dimension: config.max_image_dimension,
            max_image_bytes: config.max_image_bytes,
            state: Mutex::new(SessionState::new(context)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn context(&self) -> TutorContext {
        self.lock().context.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    // ========================================================================
    // 导航
    // ========================================================================

    pub fn back_to_menu(&self) {
        self.lock().reset_to_menu();
    }

    /// 关闭面板：回到菜单、清空各模式状态、作废在途请求
    pub fn close(&self) {
        let mut state = self.lock();
        state.reset_to_menu();
        debug!(
            "[TutorSession] 面板已关闭: session={}, topic={}",
            self.id, state.context.topic
        );
    }

    /// 切换单元；与当前上下文相同时不做任何事，返回是否发生了切换
    pub fn change_context(&self, context: TutorContext) -> bool {
        let mut state = self.lock();
        if state.context == context {
            return false;
        }
        state.reset_to_menu();
        info!(
            "[TutorSession] 切换单元: {} -> {}",
            state.context.topic, context.topic
        );
        state.context = context;
        true
    }

    // ========================================================================
    // 讲解
    // ========================================================================

    /// 流式生成讲解（心智图 + 重点整理）
    pub async fn explain(&self) -> Result<RequestOutcome> {
        let (ticket, prompt) = {
            let mut state = self.lock();
            let ticket = state.issue_ticket();
            state.mode = Mode::Explain(ExplainState::new());
            state.loading = true;
            (ticket, prompts::explain_prompt(&state.context, &self.language))
        };
        debug!(
            "[TutorSession] 开始讲解: session={}, generation={}",
            self.id, ticket.generation
        );

        let opened = tokio::select! {
            _ = ticket.cancel.cancelled() => return Ok(RequestOutcome::Superseded),
            opened = self.provider.generate_stream(&prompt) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Ok(self.fail_explain(&ticket, e)),
        };

        loop {
            let next = tokio::select! {
                _ = ticket.cancel.cancelled() => {
                    debug!("[TutorSession] 讲解流已被取代，停止读取");
                    return Ok(RequestOutcome::Superseded);
                }
                next = stream.next() => next,
            };
            match next {
                Some(Ok(increment)) => {
                    let mut state = self.lock();
                    if !state.is_current(&ticket) {
                        return Ok(RequestOutcome::Superseded);
                    }
                    state.loading = false;
                    if let Mode::Explain(explain) = &mut state.mode {
                        explain.parser.push(&increment);
                    }
                }
                Some(Err(e)) => return Ok(self.fail_explain(&ticket, e)),
                None => break,
            }
        }

        let mut state = self.lock();
        if !state.is_current(&ticket) {
            return Ok(RequestOutcome::Superseded);
        }
        state.loading = false;
        if let Mode::Explain(explain) = &mut state.mode {
            explain.status = ExplainStatus::Complete;
            info!(
                "[TutorSession] 讲解完成: {} 个增量, 图表={}",
                explain.parser.increments(),
                explain.parser.document().diagram_source.is_some()
            );
        }
        Ok(RequestOutcome::Applied)
    }

    /// 讲解失败：正文换成固定文案并提示宿主；请求已被取代时不做任何事
    fn fail_explain(&self, ticket: &RequestTicket, error: AppError) -> RequestOutcome {
        let current = {
            let mut state = self.lock();
            let current = state.is_current(ticket);
            if current {
                warn!("[TutorSession] 讲解生成失败: {}", error);
                state.loading = false;
                if let Mode::Explain(explain) = &mut state.mode {
                    explain.status = ExplainStatus::Failed;
                }
            }
            current
        };
        if !current {
            return RequestOutcome::Superseded;
        }
        self.host.alert(EXPLAIN_FAILURE_ALERT);
        RequestOutcome::Applied
    }

    /// 把已完成的讲解（或解题结果）交给宿主保存；未完成时不保存任何内容
    pub fn save_explanation(&self) -> bool {
        let Some(content) = self.finished_text() else {
            return false;
        };
        self.host.save_to_note(&content)
    }

    /// 返回可复制的讲解正文（或解题结果），并提示复制成功
    pub fn copy_explanation(&self) -> Option<String> {
        let content = self.finished_text()?;
        self.host.alert(COPY_ALERT);
        Some(content)
    }

    fn finished_text(&self) -> Option<String> {
        let state = self.lock();
        if state.loading {
            return None;
        }
        let text = match &state.mode {
            Mode::Explain(explain) if explain.is_complete() => {
                explain.parser.document().narrative.clone()
            }
            Mode::Solve(request) => request.result.clone()?,
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    // ========================================================================
    // 测验
    // ========================================================================

    /// 生成一组新的测验题；失败时提示并回到菜单
    pub async fn start_quiz(&self) -> Result<RequestOutcome> {
        let (ticket, prompt) = {
            let mut state = self.lock();
            let ticket = state.issue_ticket();
            state.mode = Mode::Quiz(QuizEngine::new());
            state.loading = true;
            (ticket, prompts::quiz_prompt(&state.context, &self.language))
        };
        let request =
            GenerationRequest::structured(prompt, json_validator::response_schema(Stage::Quiz));

        let response = tokio::select! {
            _ = ticket.cancel.cancelled() => return Ok(RequestOutcome::Superseded),
            response = self.provider.generate(request) => response,
        };
        let items = response.and_then(|text| parse_quiz_items(&text));

        let failure = {
            let mut state = self.lock();
            if !state.is_current(&ticket) {
                return Ok(RequestOutcome::Superseded);
            }
            state.loading = false;
            let applied = match (items, &mut state.mode) {
                (Ok(items), Mode::Quiz(engine)) => {
                    engine.set_items(items).map_err(AppError::from)
                }
                (Ok(_), _) => Ok(()),
                (Err(e), _) => Err(e),
            };
            match applied {
                Ok(()) => None,
                Err(e) => {
                    state.mode = Mode::Menu;
                    Some(e)
                }
            }
        };

        if let Some(e) = failure {
            warn!("[TutorSession] 生成测验失败: {}", e);
            self.host.alert(QUIZ_FAILURE_ALERT);
        } else {
            info!("[TutorSession] 测验已生成");
        }
        Ok(RequestOutcome::Applied)
    }

    /// 重新出题
    pub async fn retake_quiz(&self) -> Result<RequestOutcome> {
        self.start_quiz().await
    }

    /// 选择答案；交卷后、下标越界或不在测验模式时返回 false
    pub fn select_answer(&self, question_index: usize, option_index: usize) -> bool {
        match &mut self.lock().mode {
            Mode::Quiz(engine) => engine.select_answer(question_index, option_index),
            _ => false,
        }
    }

    /// 交卷；有题目未作答时返回 false
    pub fn submit_quiz(&self) -> bool {
        match &mut self.lock().mode {
            Mode::Quiz(engine) => engine.submit(),
            _ => false,
        }
    }

    /// 交卷后的分数
    pub fn quiz_score(&self) -> Option<u32> {
        match &self.lock().mode {
            Mode::Quiz(engine) if engine.is_submitted() => Some(engine.score()),
            _ => None,
        }
    }

    /// 把检讨文档交给宿主保存；仅交卷后可用
    pub fn save_quiz_review(&self) -> bool {
        let review = {
            let state = self.lock();
            match &state.mode {
                Mode::Quiz(engine) if engine.is_submitted() => {
                    engine.review_document(&state.context.topic)
                }
                _ => return false,
            }
        };
        self.host.save_to_note(&review)
    }

    // ========================================================================
    // 拍照解题
    // ========================================================================

    pub fn enter_solve(&self) {
        let mut state = self.lock();
        state.invalidate();
        state.mode = Mode::Solve(SolveRequest::default());
        state.loading = false;
    }

    /// 设置待解析的图片；不在解题模式时返回 false
    pub fn set_solve_image(&self, image: SolveImage) -> bool {
        match &mut self.lock().mode {
            Mode::Solve(request) => {
                request.image = Some(image);
                true
            }
            _ => false,
        }
    }

    /// 以宿主上传的 data URL 设置图片，超出配置上限时先缩小再压缩
    pub fn set_solve_image_data_url(&self, data_url: &str) -> Result<bool> {
        let image = SolveImage::from_data_url_with_limits(
            data_url,
            self.max_image_dimension,
            self.max_image_bytes,
        )?;
        debug!(
            "[TutorSession] 解题图片: session={}, {} {}B",
            self.id, image.mime_type, image.byte_len
        );
        Ok(self.set_solve_image(image))
    }

    pub fn set_solve_question(&self, question: impl Into<String>) -> bool {
        match &mut self.lock().mode {
            Mode::Solve(request) => {
                request.user_question = question.into();
                true
            }
            _ => false,
        }
    }

    /// 发送图片与提问；没有图片时只提示，不发请求
    pub async fn solve(&self) -> Result<RequestOutcome> {
        let prepared = {
            let mut state = self.lock();
            let prompt = match &state.mode {
                Mode::Solve(request) => request.image.as_ref().map(|image| {
                    let prompt = prompts::solve_prompt(
                        &state.context,
                        &request.user_question,
                        &self.language,
                    );
                    (image.to_inline(), prompt)
                }),
                _ => return Err(AppError::validation("当前不在解题模式")),
            };
            prompt.map(|(image, prompt)| {
                let ticket = state.issue_ticket();
                state.loading = true;
                if let Mode::Solve(request) = &mut state.mode {
                    request.result = None;
                }
                (ticket, GenerationRequest::multimodal(prompt, image))
            })
        };
        let Some((ticket, request)) = prepared else {
            self.host.alert(SOLVE_IMAGE_REQUIRED_ALERT);
            return Ok(RequestOutcome::Rejected);
        };

        let response = tokio::select! {
            _ = ticket.cancel.cancelled() => return Ok(RequestOutcome::Superseded),
            response = self.provider.generate(request) => response,
        };

        let failure = {
            let mut state = self.lock();
            if !state.is_current(&ticket) {
                return Ok(RequestOutcome::Superseded);
            }
            state.loading = false;
            let answer = response.and_then(|text| {
                if text.trim().is_empty() {
                    Err(AppError::llm("解题结果为空"))
                } else {
                    Ok(text)
                }
            });
            match (answer, &mut state.mode) {
                (Ok(text), Mode::Solve(request)) => {
                    request.result = Some(text);
                    None
                }
                (Ok(_), _) => None,
                (Err(e), _) => Some(e),
            }
        };

        if let Some(e) = failure {
            warn!("[TutorSession] 解题失败: {}", e);
            self.host.alert(SOLVE_FAILURE_ALERT);
        }
        Ok(RequestOutcome::Applied)
    }

    /// 换一题：清空图片、提问与结果，留在解题模式
    pub fn ask_another(&self) {
        let mut state = self.lock();
        if let Mode::Solve(_) = state.mode {
            state.invalidate();
            state.loading = false;
            state.mode = Mode::Solve(SolveRequest::default());
        }
    }
}

/// 解析并校验模型返回的测验 JSON
fn parse_quiz_items(text: &str) -> Result<Vec<QuizItem>> {
    let value: Value = serde_json::from_str(text.trim())?;
    json_validator::validate(Stage::Quiz, &value).map_err(|errors| {
        AppError::with_details(
            AppErrorType::Validation,
            "测验数据不符合 schema",
            json!({ "errors": errors }),
        )
    })?;
    let items: Vec<QuizItem> = serde_json::from_value(value)?;
    QuizEngine::validate_items(&items)?;
    Ok(items)
}
