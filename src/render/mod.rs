//! 渲染模块
//!
//! 只包含 2D 粒子系统；实际的 GPU 提交由宿主完成，粒子系统输出按混合模式分组的绘制记录。

pub mod particles;

pub use particles::{
    BlendMode, DrawContext, ParticleBatchRecorder, ParticleHandler, ParticleStats, ScreenView,
};
