//! 会话状态：模式联合体、请求票据与对外快照

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::models::TutorContext;
use crate::quiz_engine::{AnswerSlot, QuizEngine, QuizItem};
use crate::solve_image::SolveImage;
use crate::stream_document::{GeneratedDocument, StreamDocumentParser};

// ============================================================================
// 固定的提示文案
// ============================================================================

pub const EXPLAIN_FAILURE_MESSAGE: &str =
    "❌ 連線發生錯誤，請稍後再試。\n\n(請確認您已選取有效的 API Key)";
pub const EXPLAIN_FAILURE_ALERT: &str = "生成解析失敗，請稍後再試。";
pub const QUIZ_FAILURE_ALERT: &str = "生成測驗失敗，請稍後再試。";
pub const SOLVE_FAILURE_ALERT: &str = "解題失敗，請稍後再試。";
pub const SOLVE_IMAGE_REQUIRED_ALERT: &str = "請先上傳圖片";
pub const COPY_ALERT: &str = "✅ 解析已複製！\n\n您可以將其貼到：\n1. Google Gemini (進行引導式學習)\n2. NotebookLM (建立學習筆記)";

// ============================================================================
// 模式
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainStatus {
    Streaming,
    Complete,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ExplainState {
    pub(crate) parser: StreamDocumentParser,
    pub(crate) status: ExplainStatus,
}

impl ExplainState {
    pub(crate) fn new() -> Self {
        Self {
            parser: StreamDocumentParser::new(),
            status: ExplainStatus::Streaming,
        }
    }

    /// 失败时正文替换为固定文案，已解析出的图表保留
    pub fn document(&self) -> GeneratedDocument {
        let mut document = self.parser.document().clone();
        if self.status == ExplainStatus::Failed {
            document.narrative = EXPLAIN_FAILURE_MESSAGE.to_string();
        }
        document
    }

    pub fn is_complete(&self) -> bool {
        self.status == ExplainStatus::Complete
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub image: Option<SolveImage>,
    pub user_question: String,
    pub result: Option<String>,
}

/// 面板当前所处的模式，各模式的局部状态随模式一起存亡
#[derive(Debug, Clone)]
pub enum Mode {
    Menu,
    Explain(ExplainState),
    Quiz(QuizEngine),
    Solve(SolveRequest),
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Menu => ModeKind::Menu,
            Mode::Explain(_) => ModeKind::Explain,
            Mode::Quiz(_) => ModeKind::Quiz,
            Mode::Solve(_) => ModeKind::Solve,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Menu,
    Explain,
    Quiz,
    Solve,
}

// ============================================================================
// 请求票据
// ============================================================================

/// 一次外部调用的身份：代数 + 取消令牌
///
/// 进入模式、返回菜单、关闭、切换上下文都会让代数递增并取消旧令牌；
/// 代数不再是最新的响应一律丢弃。
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub generation: u64,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// 响应已写入会话
    Applied,
    /// 请求已被后续操作取代，响应被丢弃
    Superseded,
    /// 前置条件不满足，没有发出请求
    Rejected,
}

// ============================================================================
// 快照
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeView {
    Menu,
    Explain {
        document: GeneratedDocument,
        status: ExplainStatus,
    },
    Quiz {
        items: Vec<QuizItem>,
        answers: Vec<AnswerSlot>,
        submitted: bool,
        /// 交卷后才有分数
        score: Option<u32>,
    },
    Solve {
        image: Option<SolveImage>,
        user_question: String,
        result: Option<String>,
    },
}

impl From<&Mode> for ModeView {
    fn from(mode: &Mode) -> Self {
        match mode {
            Mode::Menu => ModeView::Menu,
            Mode::Explain(explain) => ModeView::Explain {
                document: explain.document(),
                status: explain.status,
            },
            Mode::Quiz(engine) => ModeView::Quiz {
                items: engine.items().to_vec(),
                answers: engine.answers().to_vec(),
                submitted: engine.is_submitted(),
                score: engine.is_submitted().then(|| engine.score()),
            },
            Mode::Solve(request) => ModeView::Solve {
                image: request.image.clone(),
                user_question: request.user_question.clone(),
                result: request.result.clone(),
            },
        }
    }
}

/// 会话的只读视图，供宿主渲染
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub context: TutorContext,
    pub loading: bool,
    pub view: ModeView,
}

impl SessionSnapshot {
    pub fn kind(&self) -> ModeKind {
        match self.view {
            ModeView::Menu => ModeKind::Menu,
            ModeView::Explain { .. } => ModeKind::Explain,
            ModeView::Quiz { .. } => ModeKind::Quiz,
            ModeView::Solve { .. } => ModeKind::Solve,
        }
    }

    /// 讲解模式下的文档
    pub fn document(&self) -> Option<&GeneratedDocument> {
        match &self.view {
            ModeView::Explain { document, .. } => Some(document),
            _ => None,
        }
    }
}

// ============================================================================
// 内部状态
// ============================================================================

#[derive(Debug)]
pub(crate) struct SessionState {
    pub context: TutorContext,
    pub mode: Mode,
    pub loading: bool,
    generation: u64,
    cancel: CancellationToken,
}

impl SessionState {
    pub fn new(context: TutorContext) -> Self {
        Self {
            context,
            mode: Mode::Menu,
            loading: false,
            generation: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// 作废在途请求
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    /// 作废在途请求并签发新票据
    pub fn issue_ticket(&mut self) -> RequestTicket {
        self.invalidate();
        RequestTicket {
            generation: self.generation,
            cancel: self.cancel.clone(),
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.generation == ticket.generation
    }

    /// 回到菜单并丢弃所有模式局部状态
    pub fn reset_to_menu(&mut self) {
        self.invalidate();
        self.mode = Mode::Menu;
        self.loading = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            context: self.context.clone(),
            loading: self.loading,
            view: ModeView::from(&self.mode),
        }
    }
}
