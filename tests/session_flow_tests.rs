//! 会话控制器端到端流程：讲解 / 测验 / 解题，以及请求取代

mod common;

use assert_matches::assert_matches;
use std::sync::Arc;
use tokio::sync::Notify;

use common::{quiz_json, session_with, wait_until, ScriptedProvider, StreamScript};
use study_tutor_lib::solve_image::SolveImage;
use study_tutor_lib::tutor_session::{
    ExplainStatus, ModeKind, ModeView, COPY_ALERT, EXPLAIN_FAILURE_ALERT,
    EXPLAIN_FAILURE_MESSAGE, QUIZ_FAILURE_ALERT, SOLVE_FAILURE_ALERT, SOLVE_IMAGE_REQUIRED_ALERT,
};
use study_tutor_lib::{AppError, RequestOutcome, TutorContext};

fn tiny_image() -> SolveImage {
    SolveImage::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap()
}

// ============================================================================
// 讲解
// ============================================================================

#[tokio::test]
async fn explain_stream_splits_diagram_and_narrative() {
    let provider = ScriptedProvider::new().push_stream(StreamScript::Finite(vec![
        Ok("abc".to_string()),
        Ok("```mermaid\nmindmap\n".to_string()),
        Ok("``` leftover".to_string()),
    ]));
    let (session, _provider, host) = session_with(provider);

    let outcome = session.explain().await.unwrap();
    assert_eq!(outcome, RequestOutcome::Applied);

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert_matches!(
        &snapshot.view,
        ModeView::Explain { status: ExplainStatus::Complete, .. }
    );
    let document = snapshot.document().unwrap();
    assert_eq!(document.diagram_source.as_deref(), Some("mindmap"));
    assert_eq!(document.narrative, "abc leftover");

    assert!(session.save_explanation());
    assert_eq!(host.saved(), vec!["abc leftover".to_string()]);
}

#[tokio::test]
async fn explain_partial_state_is_visible_while_streaming() {
    let provider = ScriptedProvider::new().push_stream(StreamScript::Stalled(vec![
        "abc".to_string(),
        "```mermaid\nmindmap\n".to_string(),
    ]));
    let (session, _provider, host) = session_with(provider);

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.explain().await })
    };
    wait_until(|| {
        session
            .snapshot()
            .document()
            .is_some_and(|d| d.narrative.contains("mindmap"))
    })
    .await;

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    let document = snapshot.document().unwrap();
    // 围栏尚未闭合：正文即完整累计文本
    assert_eq!(document.narrative, "abc```mermaid\nmindmap\n");
    assert!(document.diagram_source.is_none());

    // 流未结束时不允许保存部分内容
    assert!(!session.save_explanation());
    assert!(session.copy_explanation().is_none());
    assert!(host.saved().is_empty());

    session.back_to_menu();
    assert_eq!(task.await.unwrap().unwrap(), RequestOutcome::Superseded);
    assert_eq!(session.snapshot().kind(), ModeKind::Menu);
    // 被取代的讲解不提示
    assert!(host.alerts().is_empty());
}

#[tokio::test]
async fn explain_failure_shows_fixed_message() {
    let provider = ScriptedProvider::new()
        .push_stream(StreamScript::OpenError(AppError::network("offline")));
    let (session, _provider, host) = session_with(provider);

    assert_eq!(session.explain().await.unwrap(), RequestOutcome::Applied);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.kind(), ModeKind::Explain);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.document().unwrap().narrative, EXPLAIN_FAILURE_MESSAGE);
    assert_eq!(host.alerts(), vec![EXPLAIN_FAILURE_ALERT.to_string()]);
    // 失败文案不会被存入笔记
    assert!(!session.save_explanation());
}

#[tokio::test]
async fn explain_mid_stream_error_replaces_narrative() {
    let provider = ScriptedProvider::new().push_stream(StreamScript::Finite(vec![
        Ok("部分內容".to_string()),
        Err(AppError::network("connection reset")),
    ]));
    let (session, _provider, host) = session_with(provider);

    session.explain().await.unwrap();
    let snapshot = session.snapshot();
    assert_matches!(
        &snapshot.view,
        ModeView::Explain { status: ExplainStatus::Failed, .. }
    );
    assert_eq!(snapshot.document().unwrap().narrative, EXPLAIN_FAILURE_MESSAGE);
    assert_eq!(host.alerts(), vec![EXPLAIN_FAILURE_ALERT.to_string()]);
}

#[tokio::test]
async fn copy_explanation_returns_text_and_alerts() {
    let provider = ScriptedProvider::new()
        .push_stream(StreamScript::Finite(vec![Ok("- 重點一".to_string())]));
    let (session, _provider, host) = session_with(provider);

    session.explain().await.unwrap();
    assert_eq!(session.copy_explanation().as_deref(), Some("- 重點一"));
    assert_eq!(host.alerts(), vec![COPY_ALERT.to_string()]);
}

// ============================================================================
// 测验
// ============================================================================

#[tokio::test]
async fn quiz_one_of_three_correct_scores_33() {
    let provider = ScriptedProvider::new().push_response(Ok(quiz_json([1, 1, 2])));
    let (session, provider, host) = session_with(provider);

    assert_eq!(session.start_quiz().await.unwrap(), RequestOutcome::Applied);
    let requests = provider.requests.lock().unwrap().clone();
    assert!(requests[0].wants_json());

    assert!(session.select_answer(0, 1));
    assert!(session.select_answer(1, 0));
    // 未答完不能交卷
    assert!(!session.submit_quiz());
    assert!(session.select_answer(2, 0));
    assert!(!session.save_quiz_review());

    assert!(session.submit_quiz());
    assert_eq!(session.quiz_score(), Some(33));
    // 交卷后作答不可修改
    assert!(!session.select_answer(1, 1));

    assert!(session.save_quiz_review());
    let review = host.saved().pop().unwrap();
    assert!(review.starts_with("【AI 隨堂測驗檢討】\n單元：一元一次方程式\n得分：33 / 100\n\n"));
    assert!(review.contains("Q2: x - 5 = 0，x = ?\n您的回答：0 ❌\n正確答案：5\n"));
    assert!(host.alerts().is_empty());
}

#[tokio::test]
async fn quiz_two_of_three_rounds_to_67() {
    let provider = ScriptedProvider::new().push_response(Ok(quiz_json([0, 1, 2])));
    let (session, _provider, _host) = session_with(provider);

    session.start_quiz().await.unwrap();
    session.select_answer(0, 0);
    session.select_answer(1, 1);
    session.select_answer(2, 0);
    assert!(session.submit_quiz());
    assert_eq!(session.quiz_score(), Some(67));
}

#[tokio::test]
async fn quiz_schema_violation_returns_to_menu() {
    let bad = serde_json::json!([{ "question": "q", "options": ["a", "b"], "correctIndex": 5 }]);
    let provider = ScriptedProvider::new().push_response(Ok(bad.to_string()));
    let (session, _provider, host) = session_with(provider);

    session.start_quiz().await.unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.kind(), ModeKind::Menu);
    assert!(!snapshot.loading);
    assert_eq!(host.alerts(), vec![QUIZ_FAILURE_ALERT.to_string()]);
}

#[tokio::test]
async fn quiz_transport_failure_returns_to_menu() {
    let provider = ScriptedProvider::new().push_response(Err(AppError::network("timeout")));
    let (session, _provider, host) = session_with(provider);

    session.start_quiz().await.unwrap();
    assert_eq!(session.snapshot().kind(), ModeKind::Menu);
    assert_eq!(host.alerts(), vec![QUIZ_FAILURE_ALERT.to_string()]);
}

#[tokio::test]
async fn retake_quiz_replaces_items_and_answers() {
    let provider = ScriptedProvider::new()
        .push_response(Ok(quiz_json([0, 0, 0])))
        .push_response(Ok(quiz_json([3, 3, 3])));
    let (session, _provider, _host) = session_with(provider);

    session.start_quiz().await.unwrap();
    for q in 0..3 {
        session.select_answer(q, 0);
    }
    session.submit_quiz();
    assert_eq!(session.quiz_score(), Some(100));

    session.retake_quiz().await.unwrap();
    assert_eq!(session.quiz_score(), None);
    assert_matches!(
        session.snapshot().view,
        ModeView::Quiz { ref items, ref answers, submitted: false, score: None }
            if items[0].correct_index == 3 && answers.iter().all(|a| !a.is_answered())
    );
}

// ============================================================================
// 拍照解题
// ============================================================================

#[tokio::test]
async fn solve_without_image_only_alerts() {
    let (session, provider, host) = session_with(ScriptedProvider::new());
    session.enter_solve();

    assert_eq!(session.solve().await.unwrap(), RequestOutcome::Rejected);
    assert_eq!(host.alerts(), vec![SOLVE_IMAGE_REQUIRED_ALERT.to_string()]);
    assert_eq!(provider.request_count(), 0);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn solve_sends_image_and_stores_result() {
    let provider = ScriptedProvider::new().push_response(Ok("步驟一：移項".to_string()));
    let (session, provider, host) = session_with(provider);
    session.enter_solve();
    assert!(session.set_solve_image(tiny_image()));
    assert!(session.set_solve_question("第 3 題"));

    assert_eq!(session.solve().await.unwrap(), RequestOutcome::Applied);
    let request = provider.requests.lock().unwrap()[0].clone();
    assert_eq!(request.image.unwrap().mime_type, "image/png");
    assert!(request.prompt.contains("第 3 題"));

    assert_matches!(
        session.snapshot().view,
        ModeView::Solve { result: Some(ref r), .. } if r == "步驟一：移項"
    );
    assert!(session.save_explanation());
    assert_eq!(host.saved(), vec!["步驟一：移項".to_string()]);

    session.ask_another();
    assert_matches!(
        session.snapshot().view,
        ModeView::Solve { image: None, result: None, ref user_question } if user_question.is_empty()
    );
}

#[tokio::test]
async fn solve_failure_alerts_and_stays() {
    let provider = ScriptedProvider::new().push_response(Err(AppError::llm("quota")));
    let (session, _provider, host) = session_with(provider);
    session.enter_solve();
    session.set_solve_image(tiny_image());

    session.solve().await.unwrap();
    assert_eq!(host.alerts(), vec![SOLVE_FAILURE_ALERT.to_string()]);
    assert_matches!(
        session.snapshot().view,
        ModeView::Solve { image: Some(_), result: None, .. }
    );
}

#[tokio::test]
async fn uploaded_data_url_is_downscaled_to_config_limits() {
    use base64::{engine::general_purpose, Engine as _};
    use image::GenericImageView;
    use study_tutor_lib::{TutorConfig, TutorSession};

    let mut png = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image::RgbImage::new(400, 200))
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .unwrap();
    let data_url = format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png.into_inner())
    );

    let config = TutorConfig {
        max_image_dimension: 100,
        ..TutorConfig::default()
    };
    let provider = Arc::new(ScriptedProvider::new().push_response(Ok("解答".to_string())));
    let host = Arc::new(common::RecordingHost::default());
    let session = TutorSession::with_config(common::context(), provider.clone(), host, &config);
    session.enter_solve();
    assert!(session.set_solve_image_data_url(&data_url).unwrap());

    session.solve().await.unwrap();
    let sent = provider.requests.lock().unwrap()[0].image.clone().unwrap();
    assert_eq!(sent.mime_type, "image/jpeg");
    let bytes = general_purpose::STANDARD.decode(&sent.data).unwrap();
    assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (100, 50));

    // 不是图片的 data URL 直接报错，不改动状态
    assert!(session.set_solve_image_data_url("data:text/plain;base64,QUJD").is_err());
}

#[tokio::test]
async fn solve_outside_solve_mode_is_error() {
    let (session, _provider, _host) = session_with(ScriptedProvider::new());
    assert!(session.solve().await.is_err());
    assert!(!session.set_solve_image(tiny_image()));
}

// ============================================================================
// 取代与关闭
// ============================================================================

#[tokio::test]
async fn close_mid_solve_discards_response() {
    let gate = Arc::new(Notify::new());
    let provider = ScriptedProvider::gated(gate.clone()).push_response(Ok("遲到的答案".to_string()));
    let (session, provider, host) = session_with(provider);
    session.enter_solve();
    session.set_solve_image(tiny_image());

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.solve().await })
    };
    wait_until(|| provider.request_count() == 1).await;
    assert!(session.is_loading());

    session.close();
    gate.notify_one();
    assert_eq!(task.await.unwrap().unwrap(), RequestOutcome::Superseded);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.kind(), ModeKind::Menu);
    assert!(!snapshot.loading);
    assert!(host.alerts().is_empty());

    // 重新进入解题模式时是空白状态
    session.enter_solve();
    assert_matches!(
        session.snapshot().view,
        ModeView::Solve { image: None, result: None, .. }
    );
}

#[tokio::test]
async fn stale_quiz_failure_does_not_alert() {
    let gate = Arc::new(Notify::new());
    let provider =
        ScriptedProvider::gated(gate.clone()).push_response(Err(AppError::network("late")));
    let (session, provider, host) = session_with(provider);

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.start_quiz().await })
    };
    wait_until(|| provider.request_count() == 1).await;
    session.enter_solve();
    gate.notify_one();

    assert_eq!(task.await.unwrap().unwrap(), RequestOutcome::Superseded);
    assert_eq!(session.snapshot().kind(), ModeKind::Solve);
    assert!(host.alerts().is_empty());
}

#[tokio::test]
async fn change_context_resets_only_when_different() {
    let provider = ScriptedProvider::new()
        .push_stream(StreamScript::Finite(vec![Ok("內容".to_string())]));
    let (session, _provider, _host) = session_with(provider);
    session.explain().await.unwrap();

    assert!(!session.change_context(common::context()));
    assert_eq!(session.snapshot().kind(), ModeKind::Explain);

    let next = TutorContext::new("二元一次方程式", "國中一年級", "數學");
    assert!(session.change_context(next.clone()));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.kind(), ModeKind::Menu);
    assert_eq!(snapshot.context, next);
}
