//! 粒子实体
//!
//! 每个具体粒子类型持有一个 [`ParticleState`]（公共字段）并实现 [`Particle`]
//! 的两个行为方法：`update`（每帧，积分之前）和可选的 `custom_draw`。

use std::any::TypeId;

use glam::{Vec2, Vec4};

use super::batch::{DrawContext, ScreenView};
use super::context::UpdateContext;
use crate::core::error::ParticleResult;
use crate::resources::TextureResolver;

// ============================================================================
// 混合模式
// ============================================================================

/// 粒子混合模式
///
/// 三者互斥。按标志位配置时使用 [`BlendMode::from_flags`]，加法混合优先。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// 不透明 alpha 混合（预乘 alpha）
    #[default]
    AlphaBlend,
    /// 半透明（非预乘 alpha）
    HalfTransparent,
    /// 加法混合
    Additive,
}

impl BlendMode {
    /// 批次绘制顺序：加法最后，让辉光叠在前面的层上
    pub const DRAW_ORDER: [BlendMode; 3] = [
        BlendMode::AlphaBlend,
        BlendMode::HalfTransparent,
        BlendMode::Additive,
    ];

    /// 按标志位解析，多个标志同时为真时加法优先，其次半透明
    pub fn from_flags(additive: bool, half_transparent: bool) -> Self {
        if additive {
            Self::Additive
        } else if half_transparent {
            Self::HalfTransparent
        } else {
            Self::AlphaBlend
        }
    }

    /// 批次下标，与 `DRAW_ORDER` 一致
    pub fn bucket_index(self) -> usize {
        match self {
            Self::AlphaBlend => 0,
            Self::HalfTransparent => 1,
            Self::Additive => 2,
        }
    }
}

// ============================================================================
// 粒子标识
// ============================================================================

/// 粒子 ID
///
/// `index` 是槽位下标，粒子移除后槽位会被复用；`generation` 保证旧 ID
/// 不会误操作同一槽位上的新粒子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ParticleId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// ============================================================================
// 粒子状态
// ============================================================================

/// 粒子公共状态
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    /// 世界坐标位置
    pub position: Vec2,
    /// 每帧位移
    pub velocity: Vec2,
    /// 旋转（弧度）
    pub rotation: f32,
    /// 缩放（可非等比）
    pub scale: Vec2,
    /// 颜色 (RGBA)
    pub color: Vec4,
    /// 竖直精灵条中的帧下标
    pub frame_variant: u32,
    /// 精灵条帧数（至少为 1）
    pub frame_count: u32,
    /// 混合模式
    pub blend_mode: BlendMode,
    /// 使用自定义绘制，处理器不会为其查找纹理
    pub custom_draw: bool,
    /// 重要粒子：不会被容量驱逐，也不会被距离剔除
    pub important: bool,
    age: u32,
    lifetime: u32,
    uses_lifetime: bool,
    killed: bool,
    pub(crate) id: Option<ParticleId>,
    pub(crate) type_id: u16,
}

impl Default for ParticleState {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            color: Vec4::ONE,
            frame_variant: 0,
            frame_count: 1,
            blend_mode: BlendMode::AlphaBlend,
            custom_draw: false,
            important: false,
            age: 0,
            lifetime: 0,
            uses_lifetime: false,
            killed: false,
            id: None,
            type_id: 0,
        }
    }
}

impl ParticleState {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            ..Default::default()
        }
    }

    /// 设置寿命（帧）。0 表示直到被显式杀死
    pub fn with_lifetime(mut self, frames: u32) -> Self {
        self.set_lifetime(frames);
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec2::splat(scale);
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// 设置精灵条帧数和当前帧
    pub fn with_frames(mut self, frame_count: u32, frame_variant: u32) -> Self {
        self.frame_count = frame_count.max(1);
        self.frame_variant = frame_variant.min(self.frame_count - 1);
        self
    }

    pub fn with_custom_draw(mut self) -> Self {
        self.custom_draw = true;
        self
    }

    pub fn with_important(mut self) -> Self {
        self.important = true;
        self
    }

    /// 修改寿命。`frames == 0` 关闭寿命检查
    pub fn set_lifetime(&mut self, frames: u32) {
        self.lifetime = frames;
        self.uses_lifetime = frames > 0;
    }

    /// 已经过的帧数
    pub fn age(&self) -> u32 {
        self.age
    }

    /// 声明的寿命（帧）
    pub fn declared_lifetime(&self) -> u32 {
        self.lifetime
    }

    pub fn uses_lifetime(&self) -> bool {
        self.uses_lifetime
    }

    /// 生命周期完成度 `age / lifetime`，范围 [0,1]
    ///
    /// 不使用寿命的粒子恒为 0。
    pub fn lifetime_completion(&self) -> f32 {
        if !self.uses_lifetime || self.lifetime == 0 {
            return 0.0;
        }
        (self.age as f32 / self.lifetime as f32).min(1.0)
    }

    /// 是否已到达寿命
    pub fn is_expired(&self) -> bool {
        self.uses_lifetime && self.age >= self.lifetime
    }

    /// 请求移除，在本帧更新结束时生效。重复调用无副作用
    pub fn kill(&mut self) {
        self.killed = true;
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// 注册到处理器后才有 ID
    pub fn id(&self) -> Option<ParticleId> {
        self.id
    }

    /// 处理器分配的类型 ID
    pub fn type_id(&self) -> u16 {
        self.type_id
    }

    /// 自动积分：位置加速度，年龄加一
    pub(crate) fn integrate(&mut self) {
        self.position += self.velocity;
        self.age = self.age.saturating_add(1);
    }
}

// ============================================================================
// 粒子行为
// ============================================================================

/// 粒子行为
///
/// `particle_type`、`kind_name` 的默认实现依赖具体类型，不应覆盖。
pub trait Particle: Send + Sync + 'static {
    fn state(&self) -> &ParticleState;

    fn state_mut(&mut self) -> &mut ParticleState;

    /// 每帧调用一次，在自动积分之前
    fn update(&mut self, _ctx: &mut UpdateContext) {}

    /// 自定义绘制，只对 `custom_draw` 为真且未被剔除的粒子调用
    ///
    /// 不得修改粒子状态；纹理缺失时应直接返回 `Ok(())`。
    fn custom_draw(
        &self,
        _ctx: &mut dyn DrawContext,
        _view: &ScreenView,
        _textures: &dyn TextureResolver,
    ) -> ParticleResult<()> {
        Ok(())
    }

    /// 默认绘制使用的纹理逻辑名称
    fn texture_name(&self) -> &str {
        self.kind_name()
    }

    /// 具体类型的短名称
    fn kind_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// 具体类型标识，用于分配类型 ID
    fn particle_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dust {
        state: ParticleState,
    }

    impl Particle for Dust {
        fn state(&self) -> &ParticleState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ParticleState {
            &mut self.state
        }
    }

    #[test]
    fn test_blend_mode_flags_priority() {
        assert_eq!(BlendMode::from_flags(true, true), BlendMode::Additive);
        assert_eq!(BlendMode::from_flags(true, false), BlendMode::Additive);
        assert_eq!(BlendMode::from_flags(false, true), BlendMode::HalfTransparent);
        assert_eq!(BlendMode::from_flags(false, false), BlendMode::AlphaBlend);
    }

    #[test]
    fn test_draw_order_matches_bucket_index() {
        for (i, mode) in BlendMode::DRAW_ORDER.iter().enumerate() {
            assert_eq!(mode.bucket_index(), i);
        }
    }

    #[test]
    fn test_lifetime_completion() {
        let mut state = ParticleState::default().with_lifetime(4);
        assert_eq!(state.lifetime_completion(), 0.0);
        state.integrate();
        assert!((state.lifetime_completion() - 0.25).abs() < 1e-6);
        for _ in 0..10 {
            state.integrate();
        }
        assert_eq!(state.lifetime_completion(), 1.0);
        assert!(state.is_expired());
    }

    #[test]
    fn test_completion_without_lifetime_is_zero() {
        let mut state = ParticleState::default();
        state.integrate();
        assert!(!state.uses_lifetime());
        assert_eq!(state.lifetime_completion(), 0.0);
        assert!(!state.is_expired());

        state.set_lifetime(0);
        assert!(!state.uses_lifetime());
    }

    #[test]
    fn test_integrate_moves_and_ages() {
        let mut state = ParticleState::new(Vec2::new(1.0, 2.0), Vec2::new(0.5, -1.0));
        state.integrate();
        state.integrate();
        assert_eq!(state.position, Vec2::new(2.0, 0.0));
        assert_eq!(state.age(), 2);
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut state = ParticleState::default();
        state.kill();
        state.kill();
        assert!(state.is_killed());
    }

    #[test]
    fn test_frames_are_clamped() {
        let state = ParticleState::default().with_frames(0, 5);
        assert_eq!(state.frame_count, 1);
        assert_eq!(state.frame_variant, 0);

        let state = ParticleState::default().with_frames(3, 7);
        assert_eq!(state.frame_variant, 2);
    }

    #[test]
    fn test_default_names_use_concrete_type() {
        let dust = Dust {
            state: ParticleState::default(),
        };
        let boxed: Box<dyn Particle> = Box::new(dust);
        assert_eq!(boxed.kind_name(), "Dust");
        assert_eq!(boxed.texture_name(), "Dust");
        assert_eq!(boxed.particle_type(), TypeId::of::<Dust>());
    }
}
