//! 2D 粒子系统模块
//!
//! 固定容量的粒子池：游戏逻辑构造粒子并交给处理器，处理器每帧驱动更新，
//! 按混合模式分批绘制，超出距离的非重要粒子不绘制，容量满时重要粒子可以驱逐普通粒子。
//!
//! ## 架构设计
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   ParticleHandler                        │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. Spawn                                                │
//! │     - 分配类型 ID，缓存默认绘制纹理                        │
//! │     - 容量检查 / 驱逐非重要粒子                            │
//! │                                                          │
//! │  2. Update（每帧）                                        │
//! │     - Particle::update → 积分 → 年龄 → 寿命检查           │
//! │     - 批量移除，生成次级粒子                              │
//! │                                                          │
//! │  3. Draw（每帧）                                          │
//! │     - 距离剔除（重要粒子除外）                            │
//! │     - AlphaBlend → HalfTransparent → Additive 三个通道     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! let mut handler = ParticleHandler::new(ParticleConfig::default(), textures);
//! handler.spawn_particle(Spark::new(position, velocity, color, 1.0, 30));
//!
//! // 每帧
//! handler.update();
//! handler.draw(&mut recorder, &view);
//! ```

pub mod batch;
pub mod context;
pub mod handler;
pub mod particle;
pub mod presets;
pub mod system;

pub use batch::{
    DrawContext, ParticleBatchRecorder, ParticleInstance, PassState, RecordedPass, SamplerFilter,
    ScreenView, SourceRect, SpriteDraw,
};
pub use context::{LightEmission, UpdateContext};
pub use handler::{ParticleHandler, ParticleStats};
pub use particle::{BlendMode, Particle, ParticleId, ParticleState};
pub use presets::{spark_burst, BloomOrb, Spark, BLOOM_TEXTURE};
pub use system::{add_particle_systems, particle_draw_system, particle_update_system, ParticleView};
