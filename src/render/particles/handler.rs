//! 粒子处理器
//!
//! 持有固定容量的粒子池，负责分配 ID 与类型 ID、缓存默认绘制纹理、
//! 逐帧更新、距离剔除、按混合模式分批绘制。
//!
//! ## 每帧流程
//!
//! ```text
//! update():  Particle::update → position += velocity → age += 1 → 寿命检查
//!            → 批量移除被杀死的粒子 → 生成排队的次级粒子
//! draw():    剔除 → 分入三个混合批次 → 每个非空批次一个通道
//!            （AlphaBlend → HalfTransparent → Additive）→ 清空批次 → 恢复默认通道
//! ```
//!
//! 无渲染环境（`headless`）下所有操作都是空操作。

use std::any::TypeId;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bevy_ecs::prelude::*;
use glam::Vec2;

use super::batch::{DrawContext, PassState, ScreenView, SourceRect, SpriteDraw};
use super::context::{LightEmission, UpdateContext};
use super::particle::{BlendMode, Particle, ParticleId, ParticleState};
use crate::config::ParticleConfig;
use crate::core::error::{ParticleError, ParticleResult};
use crate::resources::{NullTextureResolver, TextureHandle, TextureResolver};

/// 粒子系统统计
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParticleStats {
    /// 当前存活粒子数
    pub live: usize,
    /// 成功生成总数
    pub spawned: u64,
    /// 因容量被拒绝的生成数
    pub rejected: u64,
    /// 为重要粒子腾出空间而驱逐的粒子数
    pub evicted: u64,
    /// 寿命到期移除数
    pub expired: u64,
    /// 被显式杀死并移除的粒子数（不含驱逐与寿命到期）
    pub killed: u64,
    /// 上一次绘制被剔除的粒子数
    pub culled_last_frame: usize,
    /// 上一次绘制成功绘制的粒子数
    pub drawn_last_frame: usize,
    /// 自定义绘制失败总数
    pub draw_faults: u64,
}

struct Slot {
    generation: u32,
    particle: Option<Box<dyn Particle>>,
}

/// 粒子处理器
#[derive(Resource)]
pub struct ParticleHandler {
    config: ParticleConfig,
    textures: Arc<dyn TextureResolver>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    type_ids: HashMap<TypeId, u16>,
    type_textures: Vec<Option<TextureHandle>>,
    removal: Vec<u32>,
    buckets: [Vec<u32>; 3],
    context: UpdateContext,
    lights: Vec<LightEmission>,
    frame: u64,
    stats: ParticleStats,
}

impl ParticleHandler {
    /// 创建处理器（模组加载）
    pub fn new(config: ParticleConfig, textures: Arc<dyn TextureResolver>) -> Self {
        Self {
            slots: Vec::with_capacity(config.max_particles),
            free: Vec::new(),
            live: 0,
            type_ids: HashMap::new(),
            type_textures: Vec::new(),
            removal: Vec::new(),
            buckets: [Vec::new(), Vec::new(), Vec::new()],
            context: UpdateContext::default(),
            lights: Vec::new(),
            frame: 0,
            stats: ParticleStats::default(),
            config,
            textures,
        }
    }

    /// 指定容量、不解析任何纹理的处理器
    pub fn with_capacity(max_particles: usize) -> Self {
        Self::new(
            ParticleConfig::with_capacity(max_particles),
            Arc::new(NullTextureResolver),
        )
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn is_headless(&self) -> bool {
        self.config.headless
    }

    /// 最大粒子数
    pub fn capacity(&self) -> usize {
        self.config.max_particles
    }

    /// 当前存活粒子数（包括已被杀死但尚未移除的）
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// 剩余空位
    pub fn free_spaces_available(&self) -> usize {
        self.config.max_particles.saturating_sub(self.live)
    }

    /// 已完成的更新帧数
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stats(&self) -> ParticleStats {
        ParticleStats {
            live: self.live,
            ..self.stats
        }
    }

    /// 已分配的类型 ID 数量
    pub fn type_count(&self) -> usize {
        self.type_ids.len()
    }

    /// 具体粒子类型的类型 ID（未见过则为 `None`）
    pub fn type_id_of<P: Particle>(&self) -> Option<u16> {
        self.type_ids.get(&TypeId::of::<P>()).copied()
    }

    /// 某个类型 ID 缓存的默认绘制纹理
    pub fn cached_texture(&self, type_id: u16) -> Option<&TextureHandle> {
        self.type_textures
            .get(type_id as usize)
            .and_then(Option::as_ref)
    }

    /// 三个混合批次当前的长度（绘制之外应始终为 0）
    pub fn bucket_lens(&self) -> [usize; 3] {
        [
            self.buckets[0].len(),
            self.buckets[1].len(),
            self.buckets[2].len(),
        ]
    }

    // ------------------------------------------------------------------------
    // 生成与移除
    // ------------------------------------------------------------------------

    /// 生成粒子
    ///
    /// 返回 `None` 表示未生成：无渲染环境，或池已满且无法（或不允许）驱逐。
    /// 游戏逻辑不应依赖生成成功。
    pub fn spawn(&mut self, mut particle: Box<dyn Particle>) -> Option<ParticleId> {
        if self.config.headless {
            return None;
        }

        let Some(type_id) = self.register_type(&*particle) else {
            self.stats.rejected += 1;
            return None;
        };

        if self.live >= self.config.max_particles {
            if !particle.state().important {
                self.stats.rejected += 1;
                tracing::trace!(
                    target: "particles",
                    "Pool full, rejected {}",
                    particle.kind_name()
                );
                return None;
            }
            match self.find_eviction_victim() {
                Some(victim) => self.evict(victim),
                None => {
                    self.stats.rejected += 1;
                    tracing::debug!(
                        target: "particles",
                        "Pool full of important particles, rejected {}",
                        particle.kind_name()
                    );
                    return None;
                }
            }
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    particle: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let id = ParticleId {
            index,
            generation: slot.generation,
        };
        let state = particle.state_mut();
        state.id = Some(id);
        state.type_id = type_id;
        slot.particle = Some(particle);

        self.live += 1;
        self.stats.spawned += 1;
        Some(id)
    }

    /// 以具体类型生成
    pub fn spawn_particle<P: Particle>(&mut self, particle: P) -> Option<ParticleId> {
        self.spawn(Box::new(particle))
    }

    /// 标记移除，在下一次更新结束时生效
    ///
    /// ID 失效或粒子已被标记时返回 `false`。
    pub fn remove_particle(&mut self, id: ParticleId) -> bool {
        let Some(particle) = self.get_mut(id) else {
            return false;
        };
        let state = particle.state_mut();
        if state.is_killed() {
            return false;
        }
        state.kill();
        true
    }

    /// 立即清空所有粒子（切换世界时使用）
    ///
    /// 不调用任何单粒子清理逻辑。
    pub fn clear_all(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.particle.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
        self.live = 0;
        self.removal.clear();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.context.begin_frame(self.frame);
        self.lights.clear();
    }

    /// 卸载：清空粒子并忘记类型 ID 与纹理缓存
    pub fn unload(&mut self) {
        self.clear_all();
        self.type_ids.clear();
        self.type_textures.clear();
        tracing::debug!(target: "particles", "Particle handler unloaded");
    }

    // ------------------------------------------------------------------------
    // 访问
    // ------------------------------------------------------------------------

    /// ID 是否仍指向存活粒子
    pub fn contains(&self, id: ParticleId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ParticleId) -> Option<&dyn Particle> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.particle.as_deref()
    }

    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut (dyn Particle + 'static)> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.particle.as_deref_mut()
    }

    /// 按槽位顺序遍历存活粒子
    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, &dyn Particle)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.particle.as_deref().map(|particle| {
                (
                    ParticleId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    particle,
                )
            })
        })
    }

    /// 取走本帧粒子发出的光照
    pub fn drain_lights(&mut self) -> Vec<LightEmission> {
        std::mem::take(&mut self.lights)
    }

    // ------------------------------------------------------------------------
    // 更新
    // ------------------------------------------------------------------------

    /// 每帧更新
    pub fn update(&mut self) {
        if self.config.headless {
            return;
        }

        self.frame += 1;
        self.context.begin_frame(self.frame);
        self.removal.clear();
        self.lights.clear();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(particle) = slot.particle.as_mut() else {
                continue;
            };

            if particle.state().is_killed() {
                self.stats.killed += 1;
                self.removal.push(index as u32);
                continue;
            }

            particle.update(&mut self.context);

            let state = particle.state_mut();
            if state.is_killed() {
                self.stats.killed += 1;
                self.removal.push(index as u32);
                continue;
            }

            state.integrate();

            if state.is_expired() {
                state.kill();
                self.stats.expired += 1;
                self.removal.push(index as u32);
            }
        }

        self.flush_removals();

        self.lights.extend(self.context.drain_lights());
        for child in self.context.take_spawns() {
            self.spawn(child);
        }
    }

    fn flush_removals(&mut self) {
        for index in self.removal.drain(..) {
            let slot = &mut self.slots[index as usize];
            if slot.particle.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
                self.live -= 1;
            }
        }
    }

    // ------------------------------------------------------------------------
    // 绘制
    // ------------------------------------------------------------------------

    /// 每帧绘制，在 `update` 之后调用
    pub fn draw(&mut self, ctx: &mut dyn DrawContext, view: &ScreenView) {
        if self.config.headless || self.live == 0 {
            return;
        }

        let center = view.center();
        let cull_distance_sq = self.config.cull_distance_squared();
        let mut culled = 0;

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(particle) = slot.particle.as_deref() else {
                continue;
            };
            let state = particle.state();
            // 已标记移除的、以及还没更新过一次的不绘制
            if state.is_killed() || state.age() == 0 {
                continue;
            }
            if !state.important && state.position.distance_squared(center) > cull_distance_sq {
                culled += 1;
                continue;
            }
            self.buckets[state.blend_mode.bucket_index()].push(index as u32);
        }

        let mut drawn = 0;
        let mut faults = 0;

        for mode in BlendMode::DRAW_ORDER {
            let bucket = &self.buckets[mode.bucket_index()];
            if bucket.is_empty() {
                continue;
            }

            ctx.begin_pass(PassState::for_blend(
                mode,
                self.config.additive_point_sampling,
            ));

            for &index in bucket {
                let Some(particle) = self.slots[index as usize].particle.as_deref() else {
                    continue;
                };

                if particle.state().custom_draw {
                    match draw_custom(particle, ctx, view, &*self.textures) {
                        Ok(()) => drawn += 1,
                        Err(e) => {
                            faults += 1;
                            tracing::warn!(target: "particles", "{}", e);
                        }
                    }
                } else if let Some(texture) = self
                    .type_textures
                    .get(particle.state().type_id as usize)
                    .and_then(Option::as_ref)
                {
                    ctx.draw_sprite(default_sprite(particle.state(), texture, view));
                    drawn += 1;
                }
            }

            ctx.end_pass();
        }

        for bucket in &mut self.buckets {
            bucket.clear();
        }
        ctx.restore_default();

        self.stats.culled_last_frame = culled;
        self.stats.drawn_last_frame = drawn;
        self.stats.draw_faults += faults;
    }

    // ------------------------------------------------------------------------
    // 内部
    // ------------------------------------------------------------------------

    /// 首次见到某个具体类型时分配类型 ID，并为非自定义绘制类型解析纹理
    ///
    /// 类型 ID 用尽时返回 `None`。
    fn register_type(&mut self, particle: &dyn Particle) -> Option<u16> {
        let key = particle.particle_type();
        if let Some(&type_id) = self.type_ids.get(&key) {
            return Some(type_id);
        }

        let Some(type_id) = next_type_id(self.type_ids.len()) else {
            tracing::warn!(
                target: "particles",
                "Particle type IDs exhausted, rejected new type {}",
                particle.kind_name()
            );
            return None;
        };
        self.type_ids.insert(key, type_id);

        let texture = if particle.state().custom_draw {
            None
        } else {
            let name = particle.texture_name();
            let texture = self.textures.resolve(name);
            if texture.is_none() {
                tracing::debug!(
                    target: "particles",
                    "No texture '{}' for particle type {}, default draw disabled",
                    name,
                    particle.kind_name()
                );
            }
            texture
        };
        self.type_textures.push(texture);

        tracing::trace!(
            target: "particles",
            "Registered particle type {} as {}",
            particle.kind_name(),
            type_id
        );
        Some(type_id)
    }

    /// 驱逐对象：优先已被杀死的非重要粒子，其次年龄最大的非重要粒子
    fn find_eviction_victim(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.particle.as_deref().map(|p| (index, p.state())))
            .filter(|(_, state)| !state.important)
            .max_by(|(ia, a), (ib, b)| {
                (a.is_killed(), a.age())
                    .cmp(&(b.is_killed(), b.age()))
                    // 同龄时选槽位靠前的
                    .then(ib.cmp(ia))
            })
            .map(|(index, _)| index)
    }

    fn evict(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        if let Some(victim) = slot.particle.take() {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index as u32);
            self.live -= 1;
            self.stats.evicted += 1;
            tracing::trace!(
                target: "particles",
                "Evicted {} for an important particle",
                victim.kind_name()
            );
        }
    }
}

/// 已注册 `registered` 个类型时的下一个类型 ID
fn next_type_id(registered: usize) -> Option<u16> {
    u16::try_from(registered).ok()
}

/// 默认绘制：整张纹理或竖直精灵条中的一帧，以帧中心为原点
fn default_sprite(
    state: &ParticleState,
    texture: &TextureHandle,
    view: &ScreenView,
) -> SpriteDraw {
    let frame_count = state.frame_count.max(1);
    let frame_height = texture.height() / frame_count;
    let frame = state.frame_variant.min(frame_count - 1);

    SpriteDraw {
        texture: texture.clone(),
        source: Some(SourceRect {
            x: 0,
            y: frame * frame_height,
            width: texture.width(),
            height: frame_height,
        }),
        position: view.to_screen(state.position),
        rotation: state.rotation,
        scale: state.scale,
        origin: Vec2::new(texture.width() as f32, frame_height as f32) * 0.5,
        color: state.color,
    }
}

/// 调用自定义绘制，panic 被转换为错误
fn draw_custom(
    particle: &dyn Particle,
    ctx: &mut dyn DrawContext,
    view: &ScreenView,
    textures: &dyn TextureResolver,
) -> ParticleResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        particle.custom_draw(ctx, view, textures)
    })) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ParticleError::Panicked {
                particle: particle.kind_name(),
                message,
            })
        }
    }
}
