//! 终端宿主：在命令行里跑一次讲解 / 测验 / 拍照解题

use anyhow::{anyhow, bail, Context};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use study_tutor_lib::diagram_viewport::{DiagramViewport, MermaidInkRenderer, RenderOutcome};
use study_tutor_lib::logging::init_logging;
use study_tutor_lib::providers::GeminiProvider;
use study_tutor_lib::solve_image::SolveImage;
use study_tutor_lib::tutor_session::ModeView;
use study_tutor_lib::{TutorConfig, TutorContext, TutorHost, TutorSession};

const HELP: &str = "\
study-tutor

USAGE:
  study-tutor --topic <單元> [--grade <年級>] [--subject <科目>] [--mode explain|quiz|solve]
              [--image <path>] [--question <text>] [--export]

OPTIONS:
  --mode       explain (預設) / quiz / solve
  --image      解題模式的圖片路徑
  --question   解題模式的提問
  --export     講解完成後把心智圖導出為 PNG
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Explain,
    Quiz,
    Solve,
}

impl std::str::FromStr for CliMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explain" => Ok(CliMode::Explain),
            "quiz" => Ok(CliMode::Quiz),
            "solve" => Ok(CliMode::Solve),
            other => Err(format!("未知模式: {}", other)),
        }
    }
}

#[derive(Debug)]
struct Args {
    context: TutorContext,
    mode: CliMode,
    image: Option<PathBuf>,
    question: Option<String>,
    export: bool,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);
        return Ok(None);
    }
    let topic: String = pargs.value_from_str("--topic")?;
    let grade: String = pargs
        .opt_value_from_str("--grade")?
        .unwrap_or_else(|| "國中".to_string());
    let subject: String = pargs
        .opt_value_from_str("--subject")?
        .unwrap_or_else(|| "數學".to_string());
    let mode = pargs
        .opt_value_from_str("--mode")?
        .unwrap_or(CliMode::Explain);
    let args = Args {
        context: TutorContext::new(topic, grade, subject),
        mode,
        image: pargs.opt_value_from_str("--image")?,
        question: pargs.opt_value_from_str("--question")?,
        export: pargs.contains("--export"),
    };
    let rest = pargs.finish();
    if !rest.is_empty() {
        bail!("無法識別的參數: {:?}", rest);
    }
    Ok(Some(args))
}

/// 提示输出到 stderr，「存入笔记」直接打印到 stdout
struct TerminalHost;

impl TutorHost for TerminalHost {
    fn alert(&self, message: &str) {
        eprintln!("\n[提示] {}\n", message);
    }

    fn save_to_note(&self, content: &str) -> bool {
        println!("\n===== 存入筆記 =====\n{}\n====================", content);
        true
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };
    let config = TutorConfig::from_env_and_file()?;
    init_logging(&config.log_level);
    if !config.has_api_key() {
        bail!("未設定 API Key（GEMINI_API_KEY / API_KEY / TUTOR__GEMINI__API_KEY）");
    }

    let provider = Arc::new(GeminiProvider::new(config.gemini.clone())?);
    let session = Arc::new(TutorSession::with_config(
        args.context.clone(),
        provider,
        Arc::new(TerminalHost),
        &config,
    ));

    match args.mode {
        CliMode::Explain => run_explain(&session, &config, args.export).await?,
        CliMode::Quiz => run_quiz(&session).await?,
        CliMode::Solve => {
            let path = args
                .image
                .as_deref()
                .ok_or_else(|| anyhow!("解題模式需要 --image"))?;
            run_solve(&session, &config, path, args.question.as_deref()).await?
        }
    }

    session.close();
    Ok(())
}

async fn run_explain(
    session: &Arc<TutorSession>,
    config: &TutorConfig,
    export: bool,
) -> anyhow::Result<()> {
    let mut task = {
        let session = session.clone();
        tokio::spawn(async move { session.explain().await })
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(150));
    let mut printed = String::new();
    let outcome = loop {
        tokio::select! {
            joined = &mut task => break joined??,
            _ = ticker.tick() => print_narrative_delta(session, &mut printed)?,
        }
    };
    print_narrative_delta(session, &mut printed)?;
    println!();
    tracing::debug!("[CLI] 讲解结束: {:?}", outcome);

    let snapshot = session.snapshot();
    let Some(document) = snapshot.document() else {
        return Ok(());
    };
    if let Some(source) = &document.diagram_source {
        println!("\n--- 心智圖 ---\n{}\n", source);
    }
    session.save_explanation();

    if export {
        let mut viewport = DiagramViewport::new();
        if !viewport.set_source(document.diagram_source.clone()) {
            eprintln!("沒有可導出的心智圖");
            return Ok(());
        }
        let renderer = MermaidInkRenderer::new(&config.renderer)?;
        if viewport.render_with(&renderer).await != Some(RenderOutcome::Rendered) {
            bail!("心智圖渲染失敗");
        }
        let exported = viewport.export_png(chrono::Utc::now())?;
        let path = exported.save_to(&config.export_dir)?;
        println!("已導出: {}", path.display());
    }
    Ok(())
}

/// 正文只在追加时增量打印；围栏被剥离导致前缀变化时整段重印
fn print_narrative_delta(session: &TutorSession, printed: &mut String) -> anyhow::Result<()> {
    let snapshot = session.snapshot();
    let Some(document) = snapshot.document() else {
        return Ok(());
    };
    let narrative = &document.narrative;
    let mut out = std::io::stdout().lock();
    if let Some(delta) = narrative.strip_prefix(printed.as_str()) {
        write!(out, "{}", delta)?;
    } else {
        write!(out, "\n{}", narrative)?;
    }
    out.flush()?;
    printed.clone_from(narrative);
    Ok(())
}

async fn run_quiz(session: &TutorSession) -> anyhow::Result<()> {
    session.start_quiz().await?;
    let snapshot = session.snapshot();
    let ModeView::Quiz { items, .. } = &snapshot.view else {
        return Ok(());
    };

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    for (q, item) in items.iter().enumerate() {
        println!("\nQ{}: {}", q + 1, item.question);
        for (o, option) in item.options.iter().enumerate() {
            println!("  {}. {}", o + 1, option);
        }
        loop {
            print!("你的答案 (1-{}): ", item.options.len());
            std::io::stdout().flush()?;
            let line = lines
                .next()
                .context("輸入已結束")?
                .context("讀取輸入失敗")?;
            let choice = line.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1));
            if let Some(o) = choice {
                if session.select_answer(q, o) {
                    break;
                }
            }
            println!("請輸入有效的選項編號");
        }
    }

    if !session.submit_quiz() {
        bail!("還有題目未作答");
    }
    if let Some(score) = session.quiz_score() {
        println!("\n得分：{} / 100", score);
    }
    session.save_quiz_review();
    Ok(())
}

async fn run_solve(
    session: &TutorSession,
    config: &TutorConfig,
    path: &std::path::Path,
    question: Option<&str>,
) -> anyhow::Result<()> {
    let image = SolveImage::from_path(path, config.max_image_dimension, config.max_image_bytes)?;
    session.enter_solve();
    session.set_solve_image(image);
    if let Some(question) = question {
        session.set_solve_question(question);
    }
    session.solve().await?;

    if let ModeView::Solve {
        result: Some(result),
        ..
    } = &session.snapshot().view
    {
        println!("{}", result);
        session.save_explanation();
    }
    Ok(())
}
