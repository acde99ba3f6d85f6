//! 粒子引擎入口
//!
//! `ParticleEngine` 是粒子系统的生命周期所有者：引擎启动时创建，停止时销毁，
//! 由宿主显式持有并传给游戏代码，而不是进程级单例。

use std::sync::Arc;

use crate::config::{LoggingConfig, ParticleEngineConfig};
use crate::render::particles::{
    Particle, ParticleBatchRecorder, ParticleHandler, ParticleId, ParticleStats, ScreenView,
};
use crate::resources::TextureResolver;

use super::error::EngineResult;

/// 粒子引擎
///
/// # 示例
///
/// ```no_run
/// use std::sync::Arc;
/// use glam::{Vec2, Vec4};
/// use particle_engine::config::ParticleEngineConfig;
/// use particle_engine::core::ParticleEngine;
/// use particle_engine::render::particles::{ScreenView, Spark};
/// use particle_engine::resources::TextureRegistry;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut engine = ParticleEngine::start(
///         ParticleEngineConfig::default(),
///         Arc::new(TextureRegistry::new()),
///     )?;
///     engine.spawn(Spark::new(Vec2::ZERO, Vec2::X, Vec4::ONE, 1.0, 30));
///     let view = ScreenView::centered(Vec2::ZERO, Vec2::new(1280.0, 720.0));
///     let frame = engine.step(&view);
///     println!("{} sprites", frame.sprite_count());
///     engine.stop();
///     Ok(())
/// }
/// ```
///
/// # 生命周期
///
/// 1. **启动**：初始化日志、验证配置、创建处理器
/// 2. **运行**：每帧 `step`（更新所有粒子，再绘制到记录器）
/// 3. **停止**：清空粒子、忘记类型缓存，返回最终统计
pub struct ParticleEngine {
    config: ParticleEngineConfig,
    handler: ParticleHandler,
    recorder: ParticleBatchRecorder,
}

impl ParticleEngine {
    /// 启动引擎
    pub fn start(
        config: ParticleEngineConfig,
        textures: Arc<dyn TextureResolver>,
    ) -> EngineResult<Self> {
        Self::initialize_logging(&config.logging);
        config.validate()?;

        tracing::info!(
            target: "engine",
            "Particle engine starting (capacity {}, cull distance {}, headless {})",
            config.particles.max_particles,
            config.particles.cull_distance,
            config.particles.headless
        );

        Ok(Self {
            handler: ParticleHandler::new(config.particles.clone(), textures),
            recorder: ParticleBatchRecorder::new(),
            config,
        })
    }

    /// 初始化日志系统
    ///
    /// `RUST_LOG` 优先，未设置时使用配置中的级别。重复调用无副作用。
    pub fn initialize_logging(logging: &LoggingConfig) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.as_directive()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(logging.with_target)
            .try_init();
    }

    pub fn config(&self) -> &ParticleEngineConfig {
        &self.config
    }

    pub fn handler(&self) -> &ParticleHandler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut ParticleHandler {
        &mut self.handler
    }

    /// 上一帧的绘制记录
    pub fn recorder(&self) -> &ParticleBatchRecorder {
        &self.recorder
    }

    /// 生成粒子
    pub fn spawn<P: Particle>(&mut self, particle: P) -> Option<ParticleId> {
        self.handler.spawn(Box::new(particle))
    }

    /// 运行一帧：先更新，再绘制
    pub fn step(&mut self, view: &ScreenView) -> &ParticleBatchRecorder {
        self.handler.update();
        self.recorder.clear();
        self.handler.draw(&mut self.recorder, view);
        &self.recorder
    }

    /// 停止引擎，返回最终统计
    pub fn stop(mut self) -> ParticleStats {
        let stats = self.handler.stats();
        self.handler.unload();
        tracing::info!(
            target: "engine",
            "Particle engine stopped after {} frames ({} spawned, {} rejected, {} evicted)",
            self.handler.frame(),
            stats.spawned,
            stats.rejected,
            stats.evicted
        );
        stats
    }
}
