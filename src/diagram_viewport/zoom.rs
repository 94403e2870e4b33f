//! 缩放倍率
//!
//! 固定步长 0.2，范围 [0.5, 3.0]；构造时即完成钳制，使用处无需再判断。

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 3.0;
pub const DEFAULT_SCALE: f32 = 1.0;
pub const SCALE_STEP: f32 = 0.2;

/// 缩放倍率，保证落在 [`MIN_SCALE`, `MAX_SCALE`] 之内
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomScale(f32);

impl ZoomScale {
    /// 创建倍率并钳制到合法范围；NaN 视为默认倍率
    #[must_use]
    pub fn new(scale: f32) -> Self {
        if scale.is_nan() {
            return Self::default();
        }
        // 消除多次步进累积的浮点误差
        let rounded = (scale * 100.0).round() / 100.0;
        Self(rounded.clamp(MIN_SCALE, MAX_SCALE))
    }

    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    #[must_use]
    pub fn is_min(self) -> bool {
        self.0 <= MIN_SCALE
    }

    #[must_use]
    pub fn is_max(self) -> bool {
        self.0 >= MAX_SCALE
    }

    #[must_use]
    pub fn zoom_in(self) -> Self {
        Self::new(self.0 + SCALE_STEP)
    }

    #[must_use]
    pub fn zoom_out(self) -> Self {
        Self::new(self.0 - SCALE_STEP)
    }
}

impl Default for ZoomScale {
    fn default() -> Self {
        Self(DEFAULT_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_up_and_down() {
        let scale = ZoomScale::default().zoom_in();
        assert_eq!(scale.value(), 1.2);
        assert_eq!(scale.zoom_out().value(), 1.0);
    }

    #[test]
    fn clamps_to_range() {
        assert_eq!(ZoomScale::new(10.0).value(), MAX_SCALE);
        assert_eq!(ZoomScale::new(-1.0).value(), MIN_SCALE);
        assert_eq!(ZoomScale::new(f32::NAN).value(), DEFAULT_SCALE);
    }

    #[test]
    fn repeated_steps_stay_bounded() {
        let mut scale = ZoomScale::default();
        for _ in 0..50 {
            scale = scale.zoom_in();
        }
        assert!(scale.is_max());
        assert_eq!(scale.value(), 3.0);
        for _ in 0..50 {
            scale = scale.zoom_out();
        }
        assert!(scale.is_min());
        assert_eq!(scale.value(), 0.5);
    }
}
