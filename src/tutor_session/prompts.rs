//! 三种模式的提示词模板
//!
//! 措辞属于呈现细节，这里只保证参数（年级 / 科目 / 单元 / 语言）被正确代入。

use crate::models::TutorContext;
use crate::stream_document::DIAGRAM_FENCE_TAG;

/// 解题时使用者未填写提问时的默认问题
pub const DEFAULT_SOLVE_QUESTION: &str = "請幫我解析這張圖片的內容，如果是題目請教我怎麼解。";

/// 讲解：心智图 + 极度精简的重点整理
pub fn explain_prompt(context: &TutorContext, language: &str) -> String {
    format!(
        r#"你是 {grade} {subject} 的專業家教。針對「{topic}」這個單元：

任務一：請產生一個 Mermaid.js 的 `mindmap` (心智圖)。
要求：
1. 結構要清晰，層次分明。
2. 請勿在 Mermaid 語法中使用特殊符號，以免渲染失敗。
3. 不要指定顏色樣式類別 (classDef)，讓系統使用預設的彩色主題。

任務二：請提供「極度精簡」的重點整理。
要求：
1. 使用條列式 (Bullet Points)。
2. 只要核心觀念，不要廢話，不要前言後語。
3. 每個重點不超過兩句話。

請使用{language}撰寫所有內容。

輸出格式範例：
```{fence}
mindmap
  root((主題))
    分支1
      重點A
    分支2
      重點B
```

(接著是條列式重點)
- 重點一...
- 重點二...
"#,
        grade = context.grade,
        subject = context.subject,
        topic = context.topic,
        language = language,
        fence = DIAGRAM_FENCE_TAG,
    )
}

/// 测验：三道选择题，输出格式由 response schema 约束
pub fn quiz_prompt(context: &TutorContext, language: &str) -> String {
    format!(
        "Generate 3 multiple-choice questions for a {} student studying {}, specifically about the topic: \"{}\".\nLanguage: {}.",
        context.grade, context.subject, context.topic, language
    )
}

/// 拍照解题：图片随请求内联发送，这里只拼文字部分
pub fn solve_prompt(context: &TutorContext, question: &str, language: &str) -> String {
    let question = question.trim();
    let question = if question.is_empty() {
        DEFAULT_SOLVE_QUESTION
    } else {
        question
    };
    format!(
        r#"這是一道 {grade} {subject} 的相關圖片（可能是題目、筆記或圖表）。
使用者提問：{question}

請扮演專業家教：
1. 清楚辨識圖片中的關鍵資訊。
2. 如果是題目，提供步驟詳解 (Step-by-step solution)。
3. 如果是觀念圖，解釋核心概念。
4. 使用{language}回答，語氣鼓勵且清晰。"#,
        grade = context.grade,
        subject = context.subject,
        question = question,
        language = language,
    )
}
