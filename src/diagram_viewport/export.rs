//! 图表位图导出
//!
//! 以 SVG 的原始尺寸光栅化（与当前缩放/平移无关），四周留白 20px、整体放大 2 倍、
//! 白色背景，编码为 PNG。

use chrono::{DateTime, Utc};
use resvg::usvg;
use std::path::{Path, PathBuf};

use crate::models::{AppError, Result};

pub const EXPORT_PADDING: f32 = 20.0;
pub const EXPORT_SCALE: f32 = 2.0;
/// SVG 未声明尺寸时的兜底大小
pub const FALLBACK_SIZE: (f32, f32) = (800.0, 600.0);

/// 一次导出的产物
#[derive(Debug, Clone)]
pub struct DiagramExport {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl DiagramExport {
    /// 写入目录（不存在则创建），返回文件路径
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.png)?;
        tracing::info!(
            "[DiagramExport] 已导出 {} ({}x{}, {}B)",
            path.display(),
            self.width,
            self.height,
            self.png.len()
        );
        Ok(path)
    }
}

/// 按时间戳生成不冲突的文件名
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("mindmap-{}.png", now.timestamp_millis())
}

fn native_size(tree: &usvg::Tree) -> (f32, f32) {
    let size = tree.size();
    let (w, h) = (size.width(), size.height());
    if w.is_finite() && h.is_finite() && w >= 1.0 && h >= 1.0 {
        (w, h)
    } else {
        FALLBACK_SIZE
    }
}

/// 光栅化 SVG，返回 (宽, 高, PNG 字节)
pub fn rasterize_svg(svg: &str) -> Result<(u32, u32, Vec<u8>)> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| AppError::render(format!("SVG 解析失败: {}", e)))?;

    let (width, height) = native_size(&tree);
    let out_width = ((width + EXPORT_PADDING * 2.0) * EXPORT_SCALE).ceil() as u32;
    let out_height = ((height + EXPORT_PADDING * 2.0) * EXPORT_SCALE).ceil() as u32;

    let mut pixmap = tiny_skia::Pixmap::new(out_width, out_height)
        .ok_or_else(|| AppError::render("无法分配导出画布"))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let transform = tiny_skia::Transform::from_row(
        EXPORT_SCALE,
        0.0,
        0.0,
        EXPORT_SCALE,
        EXPORT_PADDING * EXPORT_SCALE,
        EXPORT_PADDING * EXPORT_SCALE,
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let png = pixmap
        .encode_png()
        .map_err(|e| AppError::render(format!("PNG 编码失败: {}", e)))?;
    Ok((out_width, out_height, png))
}
