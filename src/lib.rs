//! Study Tutor 核心库
//!
//! 针对一个学习单元（年级 / 科目 / 单元名）提供三种 AI 家教互动：
//! - 讲解：流式生成心智图 + 精简重点，边生成边拆分（`stream_document`）
//! - 测验：结构化生成三道选择题，作答、计分、检讨（`quiz_engine`）
//! - 拍照解题：上传图片与提问，得到步骤详解（`solve_image`）
//!
//! 模式切换与请求取代由 `tutor_session::TutorSession` 统一管理；
//! 心智图的渲染、缩放平移与 PNG 导出在 `diagram_viewport`。

pub mod diagram_viewport;
pub mod json_validator;
pub mod logging;
pub mod models;
pub mod providers;
pub mod quiz_engine;
pub mod solve_image;
pub mod stream_document;
pub mod tutor_config;
pub mod tutor_session;
pub mod utils;

pub use models::{AppError, AppErrorType, Result, TutorContext};
pub use tutor_config::TutorConfig;
pub use tutor_session::{NoteSink, RequestOutcome, SessionSnapshot, TutorHost, TutorSession};
