//! # Particle Engine
//!
//! 固定容量的 2D 粒子引擎。
//!
//! ## 特性
//!
//! - **粒子池**：固定容量，重要粒子可以驱逐普通粒子，世代 ID 防止悬挂引用
//! - **曲线**：分段缓动曲线，驱动粒子随寿命变化的颜色与缩放
//! - **分批绘制**：按混合模式分成三个通道，远离视口中心的非重要粒子被剔除
//! - **ECS 集成**：处理器是 bevy_ecs 资源，可直接加入调度
//!
//! ## 示例
//!
//! ```ignore
//! use particle_engine::prelude::*;
//!
//! let mut engine = ParticleEngine::start(ParticleEngineConfig::default(), textures)?;
//! engine.spawn(Spark::new(position, velocity, color, 1.0, 30));
//!
//! loop {
//!     let frame = engine.step(&view);
//!     renderer.submit(frame.passes());
//! }
//! ```
//!
//! ## 模块
//!
//! - [`core`]: 引擎入口与错误类型
//! - [`config`]: 配置系统
//! - [`animation`]: 缓动与分段曲线
//! - [`resources`]: 纹理解析
//! - [`render`]: 粒子系统

/// Core engine functionality including lifecycle and logging
pub mod core;
/// Configuration system
pub mod config;
/// Easing functions and piecewise curves
pub mod animation;
/// Texture resolution for particle drawing
pub mod resources;
/// Particle pool, batching and drawing
pub mod render;

/// 常用类型
pub mod prelude {
    pub use crate::animation::{piecewise_animation, Curve, CurveSegment, EasingKind};
    pub use crate::config::{ParticleConfig, ParticleEngineConfig};
    pub use crate::core::{EngineError, EngineResult, ParticleEngine, ParticleError, ParticleResult};
    pub use crate::render::particles::{
        spark_burst, BlendMode, BloomOrb, DrawContext, LightEmission, Particle,
        ParticleBatchRecorder, ParticleHandler, ParticleId, ParticleState, ParticleStats,
        ScreenView, Spark, SpriteDraw, UpdateContext,
    };
    pub use crate::resources::{TextureHandle, TextureRegistry, TextureResolver};
}
