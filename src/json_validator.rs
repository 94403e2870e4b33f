// 按阶段校验模型结构化输出的 JSON
use serde_json::Value;
use std::ops::Deref;
use std::sync::LazyLock;

/// 每份测验固定的题数
pub const QUIZ_ITEM_COUNT: usize = 3;
/// 每题固定的选项数
pub const QUIZ_OPTION_COUNT: usize = 4;

/// 需要校验的结构化输出
pub enum Stage {
    /// 随堂测验出题
    Quiz,
}

// 发送给模型的 responseSchema（Gemini OpenAPI 子集，不含 min/max 约束）
static QUIZ_RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                "correctIndex": { "type": "INTEGER", "description": "Index of the correct option (0-3)" },
                "explanation": { "type": "STRING", "description": "Why is this correct?" }
            },
            "required": ["question", "options", "correctIndex", "explanation"]
        }
    })
});

// 本地严格校验：恰好 3 题，每题恰好 4 个选项
static QUIZ_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "array",
        "minItems": QUIZ_ITEM_COUNT,
        "maxItems": QUIZ_ITEM_COUNT,
        "items": {
            "type": "object",
            "properties": {
                "question": { "type": "string", "minLength": 1 },
                "options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": QUIZ_OPTION_COUNT,
                    "maxItems": QUIZ_OPTION_COUNT
                },
                "correctIndex": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": QUIZ_OPTION_COUNT - 1
                },
                "explanation": { "type": "string" }
            },
            "required": ["question", "options", "correctIndex", "explanation"],
            "additionalProperties": true
        }
    })
});

/// 请求模型时附带的输出 schema
pub fn response_schema(stage: Stage) -> Value {
    match stage {
        Stage::Quiz => QUIZ_RESPONSE_SCHEMA.deref().clone(),
    }
}

/// 按阶段校验 JSON 数据
pub fn validate(stage: Stage, data: &Value) -> Result<(), Vec<String>> {
    let schema = match stage {
        Stage::Quiz => QUIZ_SCHEMA.deref(),
    };
    let compiled = jsonschema::validator_for(schema).map_err(|e| vec![e.to_string()])?;
    let msgs: Vec<String> = compiled.iter_errors(data).map(|e| e.to_string()).collect();
    if msgs.is_empty() {
        Ok(())
    } else {
        Err(msgs)
    }
}
