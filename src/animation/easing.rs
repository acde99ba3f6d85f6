//! 缓动函数
//!
//! 所有函数把 [0,1] 的局部进度映射到缓动后的进度，端点满足 f(0)=0、f(1)=1，
//! 只有 `SineBump` 例外（0 → 1 → 0）。

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// 缓动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EasingKind {
    /// 线性
    Linear,
    /// 正弦缓入
    SineIn,
    /// 正弦缓出
    SineOut,
    /// 正弦缓入缓出
    SineInOut,
    /// 正弦凸起：sin(πt)，两端为 0，中点为 1
    SineBump,
    /// 多项式缓入，指数由曲线段提供
    PolyIn,
    /// 多项式缓出
    PolyOut,
    /// 多项式缓入缓出
    PolyInOut,
    /// 指数缓入
    ExpIn,
    /// 指数缓出
    ExpOut,
    /// 指数缓入缓出
    ExpInOut,
    /// 圆形缓入
    CircIn,
    /// 圆形缓出
    CircOut,
    /// 圆形缓入缓出
    CircInOut,
}

impl EasingKind {
    /// 计算缓动值
    ///
    /// `power` 仅对多项式缓动生效。
    #[inline]
    pub fn apply(self, t: f32, power: i32) -> f32 {
        match self {
            Self::Linear => t,
            Self::SineIn => sine_in(t),
            Self::SineOut => sine_out(t),
            Self::SineInOut => sine_in_out(t),
            Self::SineBump => sine_bump(t),
            Self::PolyIn => poly_in(t, power),
            Self::PolyOut => poly_out(t, power),
            Self::PolyInOut => poly_in_out(t, power),
            Self::ExpIn => exp_in(t),
            Self::ExpOut => exp_out(t),
            Self::ExpInOut => exp_in_out(t),
            Self::CircIn => circ_in(t),
            Self::CircOut => circ_out(t),
            Self::CircInOut => circ_in_out(t),
        }
    }
}

#[inline]
pub fn sine_in(t: f32) -> f32 {
    1.0 - (t * PI * 0.5).cos()
}

#[inline]
pub fn sine_out(t: f32) -> f32 {
    (t * PI * 0.5).sin()
}

#[inline]
pub fn sine_in_out(t: f32) -> f32 {
    -((t * PI).cos() - 1.0) * 0.5
}

#[inline]
pub fn sine_bump(t: f32) -> f32 {
    (t * PI).sin()
}

#[inline]
pub fn poly_in(t: f32, power: i32) -> f32 {
    t.powi(power)
}

#[inline]
pub fn poly_out(t: f32, power: i32) -> f32 {
    1.0 - (1.0 - t).powi(power)
}

#[inline]
pub fn poly_in_out(t: f32, power: i32) -> f32 {
    if t < 0.5 {
        2f32.powi(power - 1) * t.powi(power)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(power) * 0.5
    }
}

#[inline]
pub fn exp_in(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else {
        2f32.powf(10.0 * t - 10.0)
    }
}

#[inline]
pub fn exp_out(t: f32) -> f32 {
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2f32.powf(-10.0 * t)
    }
}

#[inline]
pub fn exp_in_out(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else if t < 0.5 {
        2f32.powf(20.0 * t - 10.0) * 0.5
    } else {
        (2.0 - 2f32.powf(-20.0 * t + 10.0)) * 0.5
    }
}

#[inline]
pub fn circ_in(t: f32) -> f32 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

#[inline]
pub fn circ_out(t: f32) -> f32 {
    (1.0 - (t - 1.0) * (t - 1.0)).max(0.0).sqrt()
}

#[inline]
pub fn circ_in_out(t: f32) -> f32 {
    if t < 0.5 {
        (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) * 0.5
    } else {
        ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) * 0.5
    }
}
