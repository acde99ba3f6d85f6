//! 分段动画曲线
//!
//! 一条曲线由若干 [`CurveSegment`] 组成。进度落在
//! `[segment.start, next.start)`（最后一段为 `[start, 1.0)`）内时该段生效，
//! 段内进度重新归一化到 [0,1] 后交给缓动函数：
//!
//! ```text
//! value = start_value + span * easing(local_progress)
//! ```
//!
//! 没有任何段生效时返回 0（空曲线、进度恰为 1.0 等）。

use serde::{Deserialize, Serialize};

use super::easing::EasingKind;

/// 曲线段
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    /// 缓动类型
    pub easing: EasingKind,
    /// 段起始进度
    pub start: f32,
    /// 段起始值
    pub start_value: f32,
    /// 值跨度（可为负）
    pub span: f32,
    /// 多项式缓动的指数
    #[serde(default = "default_power")]
    pub power: i32,
}

fn default_power() -> i32 {
    1
}

impl CurveSegment {
    pub fn new(easing: EasingKind, start: f32, start_value: f32, span: f32) -> Self {
        Self {
            easing,
            start,
            start_value,
            span,
            power: default_power(),
        }
    }

    /// 设置多项式指数
    pub fn with_power(mut self, power: i32) -> Self {
        self.power = power;
        self
    }

    /// 段结束时的值
    pub fn end_value(&self) -> f32 {
        self.start_value + self.span
    }
}

/// 计算分段曲线在 `progress` 处的值
///
/// 进度先被钳制到 [0,1]。段按列表顺序检查，第一个包含进度的段生效。
pub fn piecewise_animation(progress: f32, segments: &[CurveSegment]) -> f32 {
    if progress.is_nan() {
        return 0.0;
    }
    let progress = progress.clamp(0.0, 1.0);

    for (i, segment) in segments.iter().enumerate() {
        let end = segments.get(i + 1).map_or(1.0, |next| next.start);
        if progress < segment.start || progress >= end {
            continue;
        }

        let length = end - segment.start;
        let local = (progress - segment.start) / length;
        return segment.start_value + segment.span * segment.easing.apply(local, segment.power);
    }

    0.0
}

/// 拥有所有权的分段曲线
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    segments: Vec<CurveSegment>,
}

impl Curve {
    pub fn new(segments: Vec<CurveSegment>) -> Self {
        Self { segments }
    }

    /// 追加一段
    pub fn then(mut self, segment: CurveSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// 采样曲线
    pub fn evaluate(&self, progress: f32) -> f32 {
        piecewise_animation(progress, &self.segments)
    }

    pub fn segments(&self) -> &[CurveSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<Vec<CurveSegment>> for Curve {
    fn from(segments: Vec<CurveSegment>) -> Self {
        Self::new(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_poly_out_single_segment() {
        let segments = [CurveSegment::new(EasingKind::PolyOut, 0.0, 0.0, 1.0).with_power(4)];
        let value = piecewise_animation(0.5, &segments);
        assert!((value - 0.9375).abs() < 1e-6);
    }

    #[test]
    fn test_empty_curve_returns_zero() {
        assert_eq!(piecewise_animation(0.3, &[]), 0.0);
        assert!(Curve::default().is_empty());
    }

    #[test]
    fn test_progress_one_falls_past_last_window() {
        let segments = [CurveSegment::new(EasingKind::Linear, 0.0, 2.0, 1.0)];
        assert_eq!(piecewise_animation(1.0, &segments), 0.0);
        assert!((piecewise_animation(0.999, &segments) - 2.999).abs() < 1e-4);
    }

    #[test]
    fn test_segment_selection_and_renormalization() {
        // 淡入 0..0.2，保持 0.2..0.7，淡出 0.7..1
        let curve = Curve::default()
            .then(CurveSegment::new(EasingKind::Linear, 0.0, 0.0, 1.0))
            .then(CurveSegment::new(EasingKind::Linear, 0.2, 1.0, 0.0))
            .then(CurveSegment::new(EasingKind::Linear, 0.7, 1.0, -1.0));

        assert!((curve.evaluate(0.1) - 0.5).abs() < 1e-5);
        assert!((curve.evaluate(0.2) - 1.0).abs() < 1e-5);
        assert!((curve.evaluate(0.5) - 1.0).abs() < 1e-5);
        assert!((curve.evaluate(0.85) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_progress_before_first_segment() {
        let segments = [CurveSegment::new(EasingKind::Linear, 0.5, 1.0, 1.0)];
        assert_eq!(piecewise_animation(0.25, &segments), 0.0);
        assert!((piecewise_animation(0.75, &segments) - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        let segments = [CurveSegment::new(EasingKind::Linear, 0.0, 3.0, 1.0)];
        assert_eq!(piecewise_animation(-4.0, &segments), 3.0);
        assert_eq!(piecewise_animation(f32::NAN, &segments), 0.0);
    }

    #[test]
    fn test_segment_deserializes_without_power() {
        let segment: CurveSegment = serde_json::from_str(
            r#"{ "easing": "SineBump", "start": 0.0, "start_value": 0.0, "span": 2.0 }"#,
        )
        .unwrap();
        assert_eq!(segment.power, 1);
        assert_eq!(segment.end_value(), 2.0);
    }

    proptest! {
        #[test]
        fn test_monotonic_easing_stays_within_segment_range(
            progress in 0.0f32..1.0,
            start_value in -10.0f32..10.0,
            span in -10.0f32..10.0,
            power in 1i32..6,
        ) {
            for easing in [
                EasingKind::Linear,
                EasingKind::PolyIn,
                EasingKind::PolyOut,
                EasingKind::SineInOut,
                EasingKind::CircOut,
            ] {
                let segment = CurveSegment::new(easing, 0.0, start_value, span).with_power(power);
                let segments = [segment];
                let value = piecewise_animation(progress, &segments);
                let lo = start_value.min(start_value + span) - 1e-3;
                let hi = start_value.max(start_value + span) + 1e-3;
                prop_assert!(value >= lo && value <= hi);
            }
        }
    }
}
