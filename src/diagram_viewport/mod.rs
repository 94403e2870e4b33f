//! 心智圖视口
//!
//! 持有当前图表源码与渲染得到的 SVG，管理缩放/拖拽平移，并把 SVG 导出为 PNG。
//! 渲染是异步的：`begin_render` 取出待渲染源码的快照，`finish_render` 回填结果；
//! 回填时若源码已变更，结果被丢弃。

pub mod drag;
pub mod export;
pub mod renderer;
pub mod zoom;

use chrono::{DateTime, Utc};
use std::time::Duration;

pub use drag::{DragState, Point};
pub use export::DiagramExport;
pub use renderer::{DiagramRenderer, MermaidInkRenderer};
pub use zoom::ZoomScale;

use crate::models::{AppError, Result};

/// 非拖拽状态下变换的过渡时长
pub const EASE_DURATION: Duration = Duration::from_millis(100);

/// 视图变换的过渡方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTransition {
    /// 拖拽中，跟手不做过渡
    Immediate,
    /// ease-out 过渡
    Eased { duration: Duration },
}

/// 一次渲染任务：源码快照 + 发起时的版本号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub source: String,
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    /// 渲染失败，仅记录日志，保留之前的 SVG
    Failed,
    /// 结果对应的源码已被替换
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct DiagramViewport {
    source: Option<String>,
    /// 每次源码变更递增
    revision: u64,
    svg: Option<String>,
    /// 已渲染的版本
    rendered_revision: Option<u64>,
    scale: ZoomScale,
    offset: Point,
    drag: DragState,
}

impl DiagramViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录新的图表源码；返回是否发生了变化
    pub fn set_source(&mut self, source: Option<String>) -> bool {
        let source = source.filter(|s| !s.trim().is_empty());
        if source == self.source {
            return false;
        }
        self.source = source;
        self.revision += 1;
        if self.source.is_none() {
            self.svg = None;
            self.rendered_revision = None;
        }
        true
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn svg(&self) -> Option<&str> {
        self.svg.as_deref()
    }

    /// 当前源码是否还没有对应的渲染结果
    pub fn needs_render(&self) -> bool {
        self.source.is_some() && self.rendered_revision != Some(self.revision)
    }

    /// 取出待渲染的源码快照；无需渲染时返回 None
    pub fn begin_render(&self) -> Option<RenderJob> {
        if !self.needs_render() {
            return None;
        }
        self.source.as_ref().map(|source| RenderJob {
            source: source.clone(),
            revision: self.revision,
        })
    }

    /// 回填渲染结果
    pub fn finish_render(&mut self, job: RenderJob, result: Result<String>) -> RenderOutcome {
        if job.revision != self.revision {
            tracing::debug!(
                "[DiagramViewport] 丢弃过期的渲染结果 (rev {} != {})",
                job.revision,
                self.revision
            );
            return RenderOutcome::Discarded;
        }
        match result {
            Ok(svg) => {
                self.svg = Some(svg);
                self.rendered_revision = Some(job.revision);
                self.reset_view();
                RenderOutcome::Rendered
            }
            Err(e) => {
                tracing::warn!("[DiagramViewport] 图表渲染失败: {}", e);
                RenderOutcome::Failed
            }
        }
    }

    /// 用给定渲染器渲染当前源码；已渲染或无源码时直接返回 None
    pub async fn render_with(&mut self, renderer: &dyn DiagramRenderer) -> Option<RenderOutcome> {
        let job = self.begin_render()?;
        let result = renderer.render(&job.source).await;
        Some(self.finish_render(job, result))
    }

    pub fn scale(&self) -> ZoomScale {
        self.scale
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging
    }

    pub fn zoom_in(&mut self) {
        self.scale = self.scale.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.scale = self.scale.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.scale = ZoomScale::default();
        self.offset = Point::ORIGIN;
        self.drag.stop();
    }

    pub fn pointer_down(&mut self, pointer: Point) {
        self.drag.start(pointer, self.offset);
    }

    pub fn pointer_move(&mut self, pointer: Point) {
        if let Some(offset) = self.drag.calculate_offset(pointer) {
            self.offset = offset;
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag.stop();
    }

    /// 指针离开视口等同于松开
    pub fn pointer_leave(&mut self) {
        self.drag.stop();
    }

    pub fn transition(&self) -> ViewTransition {
        if self.drag.is_dragging {
            ViewTransition::Immediate
        } else {
            ViewTransition::Eased {
                duration: EASE_DURATION,
            }
        }
    }

    /// CSS 风格的变换描述，供宿主直接套用
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.offset.x,
            self.offset.y,
            self.scale.value()
        )
    }

    /// 以原始尺寸导出当前 SVG，与缩放/平移无关
    pub fn export_png(&self, now: DateTime<Utc>) -> Result<DiagramExport> {
        let svg = self
            .svg
            .as_deref()
            .ok_or_else(|| AppError::validation("尚无可导出的图表"))?;
        let (width, height, png) = export::rasterize_svg(svg)?;
        Ok(DiagramExport {
            file_name: export::export_file_name(now),
            width,
            height,
            png,
        })
    }
}
