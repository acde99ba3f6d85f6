//! 无窗口粒子演示
//!
//! 用占位纹理运行几百帧，周期性地生成火花与辉光，输出统计。

use std::sync::Arc;

use glam::{Vec2, Vec4};
use particle_engine::config::ParticleEngineConfig;
use particle_engine::core::{EngineResult, ParticleEngine};
use particle_engine::render::particles::{spark_burst, BloomOrb, ScreenView, BLOOM_TEXTURE};
use particle_engine::resources::TextureRegistry;

const DEMO_FRAMES: u64 = 300;
const BURST_INTERVAL: u64 = 20;

fn run() -> EngineResult<()> {
    let mut config = ParticleEngineConfig::load_or_default();
    config.apply_env_overrides();

    let mut textures = TextureRegistry::new();
    textures.insert_placeholder("Spark", 8, 24);
    textures.insert_placeholder(BLOOM_TEXTURE, 64, 64);

    let mut engine = ParticleEngine::start(config, Arc::new(textures))?;
    let view = ScreenView::centered(Vec2::ZERO, Vec2::new(1920.0, 1080.0));
    let mut rng = rand::thread_rng();

    for frame in 0..DEMO_FRAMES {
        if frame % BURST_INTERVAL == 0 {
            let angle = frame as f32 * 0.1;
            let origin = Vec2::from_angle(angle) * 300.0;
            let ember = Vec4::new(1.0, 0.7, 0.2, 1.0);
            for spark in spark_burst(&mut rng, origin, 120, 2.0..8.0, ember, 40) {
                engine.spawn(spark);
            }
            engine.spawn(
                BloomOrb::new(origin, Vec2::ZERO, Vec4::new(0.4, 0.6, 1.0, 1.0), 1.0, 60)
                    .important(),
            );
        }

        let recorded = engine.step(&view);
        let sprites = recorded.sprite_count();
        let passes = recorded.passes().len();
        let lights = engine.handler_mut().drain_lights().len();

        if frame % 60 == 0 {
            let stats = engine.handler().stats();
            tracing::info!(
                target: "engine",
                "frame {}: {} live, {} sprites in {} passes, {} lights, {} culled",
                frame,
                stats.live,
                sprites,
                passes,
                lights,
                stats.culled_last_frame
            );
        }
    }

    let stats = engine.stop();
    tracing::info!(
        target: "engine",
        "Demo finished: {} spawned, {} expired, {} evicted, {} rejected",
        stats.spawned,
        stats.expired,
        stats.evicted,
        stats.rejected
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Particle demo failed: {}", e);
        std::process::exit(1);
    }
}
