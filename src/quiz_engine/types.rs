/// 随堂测验 - 类型定义
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AppError;

// ============================================================================
// 题目与作答
// ============================================================================

/// 单道选择题（字段名与结构化输出契约一致，使用 camelCase）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

impl QuizItem {
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}

/// 作答槽位：未作答（哨兵）或已选择的选项下标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum AnswerSlot {
    #[default]
    Unanswered,
    Selected(usize),
}

impl AnswerSlot {
    pub fn is_answered(&self) -> bool {
        matches!(self, AnswerSlot::Selected(_))
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            AnswerSlot::Selected(idx) => Some(*idx),
            AnswerSlot::Unanswered => None,
        }
    }
}

/// 单次测验的作答状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub answers: Vec<AnswerSlot>,
    pub submitted: bool,
}

impl QuizAttempt {
    pub fn fresh(len: usize) -> Self {
        Self {
            answers: vec![AnswerSlot::Unanswered; len],
            submitted: false,
        }
    }
}

/// 选项的展示状态（交卷前后着色不同）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionState {
    /// 交卷前：未选中
    Idle,
    /// 交卷前：当前选中
    Selected,
    /// 交卷后：正确答案
    Correct,
    /// 交卷后：学生选错的选项
    WrongSelection,
    /// 交卷后：其它选项
    Dimmed,
}

// ============================================================================
// 错误
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("题目列表为空")]
    Empty,

    #[error("题目 #{index} 选项不足：{count} 个")]
    TooFewOptions { index: usize, count: usize },

    #[error("题目 #{index} 正确答案下标越界：{correct_index}（共 {count} 个选项）")]
    CorrectIndexOutOfRange {
        index: usize,
        correct_index: usize,
        count: usize,
    },
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        AppError::validation(format!("测验题目无效: {}", err))
    }
}

// ============================================================================
// 检讨文档文案
// ============================================================================

pub const REVIEW_HEADER: &str = "【AI 隨堂測驗檢討】";
pub const REVIEW_UNANSWERED: &str = "未作答";
pub const REVIEW_PASS_MARK: &str = "✅";
pub const REVIEW_FAIL_MARK: &str = "❌";
pub const REVIEW_SEPARATOR: &str = "-----------------------------------";
