//! 动画曲线模块
//!
//! 提供用于驱动粒子颜色、缩放、旋转等随生命周期变化的分段缓动曲线。
//!
//! ## 使用示例
//!
//! ```rust
//! use particle_engine::animation::{piecewise_animation, CurveSegment, EasingKind};
//!
//! let fade = [
//!     CurveSegment::new(EasingKind::SineOut, 0.0, 0.0, 1.0),
//!     CurveSegment::new(EasingKind::PolyIn, 0.3, 1.0, -1.0).with_power(2),
//! ];
//!
//! let opacity = piecewise_animation(0.15, &fade);
//! assert!(opacity > 0.0 && opacity < 1.0);
//! ```

pub mod curve;
pub mod easing;

pub use curve::{piecewise_animation, Curve, CurveSegment};
pub use easing::EasingKind;
