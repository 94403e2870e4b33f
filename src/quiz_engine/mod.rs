/// 随堂测验引擎
///
/// 职责：
/// - 持有一次测验的题目集合（重新出题时整体替换）
/// - 记录每题作答（未作答哨兵 / 选项下标），交卷后作答不可再改
/// - 计分：round(100 × 答对题数 / 总题数)，空题集为 0
/// - 生成检讨文档（交给宿主「存入笔记」的最终文本）
pub mod types;

use std::fmt::Write as _;

pub use types::{AnswerSlot, OptionState, QuizAttempt, QuizError, QuizItem};
use types::{
    REVIEW_FAIL_MARK, REVIEW_HEADER, REVIEW_PASS_MARK, REVIEW_SEPARATOR, REVIEW_UNANSWERED,
};

/// 每题至少需要的选项数
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct QuizEngine {
    items: Vec<QuizItem>,
    attempt: QuizAttempt,
}

impl QuizEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 校验题目集合（不修改状态）
    pub fn validate_items(items: &[QuizItem]) -> Result<(), QuizError> {
        if items.is_empty() {
            return Err(QuizError::Empty);
        }
        for (index, item) in items.iter().enumerate() {
            let count = item.options.len();
            if count < MIN_OPTIONS {
                return Err(QuizError::TooFewOptions { index, count });
            }
            if item.correct_index >= count {
                return Err(QuizError::CorrectIndexOutOfRange {
                    index,
                    correct_index: item.correct_index,
                    count,
                });
            }
        }
        Ok(())
    }

    /// 替换题目集合，作答全部重置为未作答
    ///
    /// 校验失败时保持原状态不变。
    pub fn set_items(&mut self, items: Vec<QuizItem>) -> Result<(), QuizError> {
        Self::validate_items(&items)?;
        self.attempt = QuizAttempt::fresh(items.len());
        self.items = items;
        Ok(())
    }

    /// 清空题目与作答
    pub fn clear(&mut self) {
        self.items.clear();
        self.attempt = QuizAttempt::default();
    }

    pub fn items(&self) -> &[QuizItem] {
        &self.items
    }

    pub fn attempt(&self) -> &QuizAttempt {
        &self.attempt
    }

    pub fn answers(&self) -> &[AnswerSlot] {
        &self.attempt.answers
    }

    pub fn is_submitted(&self) -> bool {
        self.attempt.submitted
    }

    /// 选择答案；交卷后或下标越界时不生效，返回是否写入
    pub fn select_answer(&mut self, question_index: usize, option_index: usize) -> bool {
        if self.attempt.submitted {
            return false;
        }
        let Some(item) = self.items.get(question_index) else {
            return false;
        };
        if option_index >= item.options.len() {
            return false;
        }
        self.attempt.answers[question_index] = AnswerSlot::Selected(option_index);
        true
    }

    /// 所有题目都已作答才允许交卷
    pub fn can_submit(&self) -> bool {
        !self.attempt.submitted
            && !self.items.is_empty()
            && self.attempt.answers.iter().all(AnswerSlot::is_answered)
    }

    /// 交卷（单向）；返回本次调用是否完成了交卷
    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }
        self.attempt.submitted = true;
        true
    }

    pub fn correct_count(&self) -> usize {
        self.items
            .iter()
            .zip(&self.attempt.answers)
            .filter(|(item, slot)| slot.index() == Some(item.correct_index))
            .count()
    }

    /// 百分制得分
    pub fn score(&self) -> u32 {
        if self.items.is_empty() {
            return 0;
        }
        let ratio = self.correct_count() as f64 / self.items.len() as f64;
        (ratio * 100.0).round() as u32
    }

    /// 单题某个选项的展示状态
    pub fn option_state(&self, question_index: usize, option_index: usize) -> Option<OptionState> {
        let item = self.items.get(question_index)?;
        if option_index >= item.options.len() {
            return None;
        }
        let selected = self.attempt.answers[question_index].index();

        let state = if self.attempt.submitted {
            if option_index == item.correct_index {
                OptionState::Correct
            } else if selected == Some(option_index) {
                OptionState::WrongSelection
            } else {
                OptionState::Dimmed
            }
        } else if selected == Some(option_index) {
            OptionState::Selected
        } else {
            OptionState::Idle
        };
        Some(state)
    }

    /// 单题全部选项的展示状态
    pub fn item_feedback(&self, question_index: usize) -> Vec<OptionState> {
        let count = self
            .items
            .get(question_index)
            .map(|item| item.options.len())
            .unwrap_or(0);
        (0..count)
            .filter_map(|opt| self.option_state(question_index, opt))
            .collect()
    }

    /// 测验检讨文档
    pub fn review_document(&self, topic: &str) -> String {
        if self.items.is_empty() {
            return String::new();
        }

        let mut content = String::new();
        let _ = write!(
            content,
            "{}\n單元：{}\n得分：{} / 100\n\n",
            REVIEW_HEADER,
            topic,
            self.score()
        );

        for (idx, (item, slot)) in self.items.iter().zip(&self.attempt.answers).enumerate() {
            let chosen = slot.index().and_then(|i| item.options.get(i));
            let is_correct = slot.index() == Some(item.correct_index);

            let _ = writeln!(content, "Q{}: {}", idx + 1, item.question);
            let _ = writeln!(
                content,
                "您的回答：{} {}",
                chosen.map(String::as_str).unwrap_or(REVIEW_UNANSWERED),
                if is_correct {
                    REVIEW_PASS_MARK
                } else {
                    REVIEW_FAIL_MARK
                }
            );
            if !is_correct {
                let _ = writeln!(
                    content,
                    "正確答案：{}",
                    item.correct_option().unwrap_or_default()
                );
            }
            let _ = writeln!(content, "解析：{}", item.explanation);
            let _ = writeln!(content, "{}", REVIEW_SEPARATOR);
        }

        content
    }
}
