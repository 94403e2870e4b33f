//! 拖拽平移状态

use serde::{Deserialize, Serialize};

/// 二维坐标（像素）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 拖拽状态：按下时记录锚点 = 指针位置 - 当前偏移
#[derive(Debug, Clone, Default)]
pub struct DragState {
    /// 是否正在拖拽
    pub is_dragging: bool,

    /// 指针相对内容的锚点
    pub anchor: Option<Point>,
}

impl DragState {
    pub fn start(&mut self, pointer: Point, offset: Point) {
        self.is_dragging = true;
        self.anchor = Some(Point::new(pointer.x - offset.x, pointer.y - offset.y));
    }

    pub fn stop(&mut self) {
        self.is_dragging = false;
        self.anchor = None;
    }

    /// 拖拽中根据指针位置计算新的偏移；未拖拽时返回 None
    #[must_use]
    pub fn calculate_offset(&self, pointer: Point) -> Option<Point> {
        if !self.is_dragging {
            return None;
        }
        let anchor = self.anchor?;
        Some(Point::new(pointer.x - anchor.x, pointer.y - anchor.y))
    }
}
