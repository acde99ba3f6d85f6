//! 内置粒子类型
//!
//! - [`Spark`]：默认绘制，半透明，随寿命淡出收缩，带阻力
//! - [`BloomOrb`]：自定义绘制，四层加法叠加的辉光，发出点光源

use std::f32::consts::TAU;
use std::ops::Range;

use glam::{Vec2, Vec4};
use rand::Rng;

use super::batch::{DrawContext, ScreenView, SpriteDraw};
use super::context::UpdateContext;
use super::particle::{BlendMode, Particle, ParticleState};
use crate::animation::{piecewise_animation, CurveSegment, EasingKind};
use crate::core::error::ParticleResult;
use crate::resources::TextureResolver;

/// 辉光纹理名称
pub const BLOOM_TEXTURE: &str = "BloomCircle";

/// 辉光叠加层数
pub const BLOOM_LAYERS: u32 = 4;

/// 火花精灵条帧数
pub const SPARK_FRAMES: u32 = 3;

// ============================================================================
// 火花
// ============================================================================

/// 火花粒子
pub struct Spark {
    state: ParticleState,
    start_scale: Vec2,
    start_alpha: f32,
    drag: f32,
}

impl Spark {
    pub fn new(position: Vec2, velocity: Vec2, color: Vec4, scale: f32, lifetime: u32) -> Self {
        let state = ParticleState::new(position, velocity)
            .with_color(color)
            .with_uniform_scale(scale)
            .with_lifetime(lifetime)
            .with_frames(SPARK_FRAMES, 0)
            .with_blend_mode(BlendMode::HalfTransparent)
            .with_rotation(velocity.y.atan2(velocity.x));
        Self {
            start_scale: state.scale,
            start_alpha: color.w,
            drag: 0.04,
            state,
        }
    }

    /// 每帧速度衰减比例，钳制到 [0,1]
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag.clamp(0.0, 1.0);
        self
    }

    /// 选择精灵条中的帧
    pub fn with_variant(mut self, variant: u32) -> Self {
        self.state.frame_variant = variant.min(SPARK_FRAMES - 1);
        self
    }

    fn opacity(completion: f32) -> f32 {
        piecewise_animation(
            completion,
            &[
                CurveSegment::new(EasingKind::Linear, 0.0, 1.0, 0.0),
                CurveSegment::new(EasingKind::PolyIn, 0.6, 1.0, -1.0).with_power(2),
            ],
        )
    }

    fn shrink(completion: f32) -> f32 {
        piecewise_animation(
            completion,
            &[CurveSegment::new(EasingKind::SineIn, 0.0, 1.0, -0.8)],
        )
    }
}

impl Particle for Spark {
    fn state(&self) -> &ParticleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ParticleState {
        &mut self.state
    }

    fn update(&mut self, _ctx: &mut UpdateContext) {
        let completion = self.state.lifetime_completion();
        self.state.color.w = self.start_alpha * Self::opacity(completion);
        self.state.scale = self.start_scale * Self::shrink(completion);
        self.state.velocity *= 1.0 - self.drag;
        if self.state.velocity.length_squared() > f32::EPSILON {
            self.state.rotation = self.state.velocity.y.atan2(self.state.velocity.x);
        }
    }
}

/// 以 `origin` 为中心生成一圈随机方向的火花
///
/// 速度在 `speed` 内均匀取值，帧随机。
pub fn spark_burst<R: Rng + ?Sized>(
    rng: &mut R,
    origin: Vec2,
    count: usize,
    speed: Range<f32>,
    color: Vec4,
    lifetime: u32,
) -> Vec<Spark> {
    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let magnitude = if speed.start < speed.end {
                rng.gen_range(speed.clone())
            } else {
                speed.start
            };
            let velocity = Vec2::from_angle(angle) * magnitude;
            Spark::new(origin, velocity, color, 1.0, lifetime)
                .with_variant(rng.gen_range(0..SPARK_FRAMES))
        })
        .collect()
}

// ============================================================================
// 辉光球
// ============================================================================

/// 辉光球粒子
pub struct BloomOrb {
    state: ParticleState,
    base_color: Vec4,
    base_scale: f32,
    light_radius: f32,
}

impl BloomOrb {
    pub fn new(position: Vec2, velocity: Vec2, color: Vec4, scale: f32, lifetime: u32) -> Self {
        Self {
            state: ParticleState::new(position, velocity)
                .with_color(color)
                .with_uniform_scale(scale)
                .with_lifetime(lifetime)
                .with_blend_mode(BlendMode::Additive)
                .with_custom_draw(),
            base_color: color,
            base_scale: scale,
            light_radius: 64.0,
        }
    }

    /// 标记为重要粒子
    pub fn important(mut self) -> Self {
        self.state.important = true;
        self
    }

    pub fn with_light_radius(mut self, radius: f32) -> Self {
        self.light_radius = radius;
        self
    }

    /// 亮度：先升后降
    fn intensity(completion: f32) -> f32 {
        piecewise_animation(
            completion,
            &[
                CurveSegment::new(EasingKind::PolyOut, 0.0, 0.0, 1.0).with_power(3),
                CurveSegment::new(EasingKind::SineInOut, 0.25, 1.0, -1.0),
            ],
        )
    }

    /// 膨胀：逐渐长到 1.5 倍
    fn growth(completion: f32) -> f32 {
        piecewise_animation(
            completion,
            &[CurveSegment::new(EasingKind::CircOut, 0.0, 1.0, 0.5)],
        )
    }
}

impl Particle for BloomOrb {
    fn state(&self) -> &ParticleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ParticleState {
        &mut self.state
    }

    fn update(&mut self, ctx: &mut UpdateContext) {
        let completion = self.state.lifetime_completion();
        let intensity = Self::intensity(completion);
        self.state.color = self.base_color * intensity;
        self.state.scale = Vec2::splat(self.base_scale * Self::growth(completion));

        if intensity > 0.0 {
            ctx.emit_light(
                self.state.position,
                self.base_color.truncate() * intensity,
                self.light_radius * self.state.scale.x,
            );
        }
    }

    fn custom_draw(
        &self,
        ctx: &mut dyn DrawContext,
        view: &ScreenView,
        textures: &dyn TextureResolver,
    ) -> ParticleResult<()> {
        let Some(texture) = textures.resolve(BLOOM_TEXTURE) else {
            return Ok(());
        };
        let origin = Vec2::new(texture.width() as f32, texture.height() as f32) * 0.5;
        let position = view.to_screen(self.state.position);

        // 外层更大更暗
        for layer in 0..BLOOM_LAYERS {
            let spread = 1.0 + layer as f32 * 0.6;
            ctx.draw_sprite(SpriteDraw {
                texture: texture.clone(),
                source: None,
                position,
                rotation: self.state.rotation,
                scale: self.state.scale * spread,
                origin,
                color: self.state.color / spread,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::particles::batch::ParticleBatchRecorder;
    use crate::render::particles::batch::PassState;
    use crate::resources::{NullTextureResolver, TextureRegistry};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_spark_fades_and_slows() {
        let mut spark = Spark::new(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec4::ONE, 2.0, 10);
        let mut ctx = UpdateContext::new(1);

        spark.update(&mut ctx);
        assert_eq!(spark.state.color.w, 1.0);
        assert!(spark.state.velocity.x < 10.0);

        for _ in 0..8 {
            spark.state.integrate();
        }
        spark.update(&mut ctx);
        assert!(spark.state.color.w < 1.0);
        assert!(spark.state.scale.x < 2.0);
    }

    #[test]
    fn test_spark_burst_is_radial() {
        let mut rng = StdRng::seed_from_u64(7);
        let sparks = spark_burst(&mut rng, Vec2::new(5.0, 5.0), 16, 2.0..4.0, Vec4::ONE, 30);

        assert_eq!(sparks.len(), 16);
        for spark in &sparks {
            let speed = spark.state().velocity.length();
            assert!((1.9999..4.0001).contains(&speed));
            assert_eq!(spark.state().position, Vec2::new(5.0, 5.0));
            assert!(spark.state().frame_variant < SPARK_FRAMES);
            assert_eq!(spark.state().blend_mode, BlendMode::HalfTransparent);
        }
    }

    #[test]
    fn test_spark_burst_with_empty_speed_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let sparks = spark_burst(&mut rng, Vec2::ZERO, 3, 5.0..5.0, Vec4::ONE, 10);
        for spark in &sparks {
            assert!((spark.state().velocity.length() - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_bloom_orb_draws_layers() {
        let mut registry = TextureRegistry::new();
        registry.insert_placeholder(BLOOM_TEXTURE, 64, 64);
        let orb = BloomOrb::new(Vec2::ZERO, Vec2::ZERO, Vec4::ONE, 1.0, 20);

        let mut recorder = ParticleBatchRecorder::new();
        recorder.begin_pass(PassState::for_blend(BlendMode::Additive, true));
        orb.custom_draw(&mut recorder, &ScreenView::default(), &registry)
            .unwrap();
        recorder.end_pass();

        let sprites = &recorder.passes()[0].sprites;
        assert_eq!(sprites.len(), BLOOM_LAYERS as usize);
        assert!(sprites[3].scale.x > sprites[0].scale.x);
        assert!(sprites[3].color.w < sprites[0].color.w);
    }

    #[test]
    fn test_bloom_orb_without_texture_draws_nothing() {
        let orb = BloomOrb::new(Vec2::ZERO, Vec2::ZERO, Vec4::ONE, 1.0, 20);
        let mut recorder = ParticleBatchRecorder::new();
        recorder.begin_pass(PassState::default());
        assert!(orb
            .custom_draw(&mut recorder, &ScreenView::default(), &NullTextureResolver)
            .is_ok());
        recorder.end_pass();
        assert_eq!(recorder.sprite_count(), 0);
    }

    #[test]
    fn test_bloom_orb_emits_light() {
        let mut orb = BloomOrb::new(Vec2::new(3.0, 4.0), Vec2::ZERO, Vec4::ONE, 1.0, 20);
        let mut ctx = UpdateContext::new(1);
        orb.state.integrate();
        orb.update(&mut ctx);

        assert_eq!(ctx.lights().len(), 1);
        assert_eq!(ctx.lights()[0].position, Vec2::new(3.0, 4.0));
        assert!(orb.state.color.w > 0.0);
    }
}
