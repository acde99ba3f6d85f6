//! 粒子批次绘制
//!
//! 处理器按混合模式为每个非空批次打开一个渲染通道（pass），在通道内提交
//! 精灵绘制命令。[`DrawContext`] 是处理器与实际渲染后端之间的接口；
//! [`ParticleBatchRecorder`] 记录所有通道，并可把它们上传为 wgpu 实例缓冲区。

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec2, Vec3, Vec4};
use wgpu::{Buffer, BufferUsages, Device, Queue};

use super::particle::BlendMode;
use crate::resources::TextureHandle;

// ============================================================================
// 视口
// ============================================================================

/// 屏幕视口（世界坐标）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenView {
    /// 屏幕左上角的世界坐标
    pub position: Vec2,
    /// 屏幕尺寸（世界单位）
    pub size: Vec2,
}

impl ScreenView {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    /// 以 `center` 为中心的视口
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            position: center - size * 0.5,
            size,
        }
    }

    /// 屏幕中心的世界坐标
    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }

    /// 世界坐标转屏幕坐标
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        world - self.position
    }
}

impl Default for ScreenView {
    fn default() -> Self {
        Self::new(Vec2::ZERO, Vec2::new(1920.0, 1080.0))
    }
}

// ============================================================================
// 通道状态
// ============================================================================

/// 采样过滤方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerFilter {
    /// 双线性
    Linear,
    /// 点采样
    Point,
}

/// 渲染通道配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassState {
    /// 混合模式
    pub blend: BlendMode,
    /// 采样过滤
    pub filter: SamplerFilter,
    /// 是否在 mip 层级之间过滤
    pub mipmaps: bool,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            blend: BlendMode::AlphaBlend,
            filter: SamplerFilter::Linear,
            mipmaps: true,
        }
    }
}

impl PassState {
    /// 指定混合模式的通道配置
    ///
    /// 程序化纹理是预乘 alpha 的，加法混合下线性采样和 mipmap 会在边缘产生杂色，
    /// 所以 `additive_point_sampling` 打开时加法通道使用点采样。
    pub fn for_blend(blend: BlendMode, additive_point_sampling: bool) -> Self {
        match blend {
            BlendMode::Additive if additive_point_sampling => Self {
                blend,
                filter: SamplerFilter::Point,
                mipmaps: false,
            },
            _ => Self {
                blend,
                ..Default::default()
            },
        }
    }

    /// 对应的 wgpu 混合状态
    pub fn blend_state(&self) -> wgpu::BlendState {
        match self.blend {
            BlendMode::AlphaBlend => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            BlendMode::HalfTransparent => wgpu::BlendState::ALPHA_BLENDING,
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }

    /// 对应的 wgpu 采样器描述
    pub fn sampler_descriptor(&self) -> wgpu::SamplerDescriptor<'static> {
        let filter = match self.filter {
            SamplerFilter::Linear => wgpu::FilterMode::Linear,
            SamplerFilter::Point => wgpu::FilterMode::Nearest,
        };
        let mipmap_filter = if self.mipmaps {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        wgpu::SamplerDescriptor {
            label: Some("Particle Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter,
            lod_max_clamp: if self.mipmaps { 32.0 } else { 0.0 },
            ..Default::default()
        }
    }
}

// ============================================================================
// 绘制命令
// ============================================================================

/// 源矩形（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 单个精灵绘制命令
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    /// 纹理
    pub texture: TextureHandle,
    /// 源矩形，`None` 为整张纹理
    pub source: Option<SourceRect>,
    /// 屏幕坐标
    pub position: Vec2,
    /// 旋转（弧度）
    pub rotation: f32,
    /// 缩放
    pub scale: Vec2,
    /// 原点（源矩形内的像素坐标）
    pub origin: Vec2,
    /// 颜色
    pub color: Vec4,
}

impl SpriteDraw {
    /// 源矩形，缺省为整张纹理
    pub fn source_rect(&self) -> SourceRect {
        self.source.unwrap_or(SourceRect {
            x: 0,
            y: 0,
            width: self.texture.width(),
            height: self.texture.height(),
        })
    }
}

/// 批次绘制上下文
///
/// 处理器保证 `draw_sprite` 只在 `begin_pass` 与 `end_pass` 之间调用，
/// 并在所有批次结束后调用一次 `restore_default`。
pub trait DrawContext {
    fn begin_pass(&mut self, state: PassState);

    fn draw_sprite(&mut self, sprite: SpriteDraw);

    fn end_pass(&mut self);

    /// 恢复调用方的默认通道配置
    fn restore_default(&mut self);
}

// ============================================================================
// 实例数据
// ============================================================================

/// 粒子实例数据（对应 WGSL struct）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    /// 变换矩阵 (4x4)，作用于 [0,1] 单位四边形
    pub transform: [[f32; 4]; 4],
    /// 纹理坐标 (u, v, width, height)，归一化
    pub tex_coords: [f32; 4],
    /// 颜色 (RGBA)
    pub color: [f32; 4],
}

impl ParticleInstance {
    pub fn from_sprite(sprite: &SpriteDraw) -> Self {
        let rect = sprite.source_rect();
        let size = Vec2::new(rect.width.max(1) as f32, rect.height.max(1) as f32);
        let tex_size = Vec2::new(
            sprite.texture.width().max(1) as f32,
            sprite.texture.height().max(1) as f32,
        );

        let transform = Mat4::from_translation(sprite.position.extend(0.0))
            * Mat4::from_rotation_z(sprite.rotation)
            * Mat4::from_scale(Vec3::new(size.x * sprite.scale.x, size.y * sprite.scale.y, 1.0))
            * Mat4::from_translation(Vec3::new(
                -sprite.origin.x / size.x,
                -sprite.origin.y / size.y,
                0.0,
            ));

        Self {
            transform: transform.to_cols_array_2d(),
            tex_coords: [
                rect.x as f32 / tex_size.x,
                rect.y as f32 / tex_size.y,
                rect.width as f32 / tex_size.x,
                rect.height as f32 / tex_size.y,
            ],
            color: sprite.color.to_array(),
        }
    }
}

// ============================================================================
// 记录器
// ============================================================================

/// 已记录的渲染通道
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPass {
    pub state: PassState,
    pub sprites: Vec<SpriteDraw>,
}

impl RecordedPass {
    /// 转换为实例数据
    pub fn instances(&self) -> Vec<ParticleInstance> {
        self.sprites.iter().map(ParticleInstance::from_sprite).collect()
    }
}

/// 记录式绘制上下文
///
/// 每帧开始前调用 `clear`。`upload` 为每个通道维护一个实例缓冲区。
#[derive(Resource, Default)]
pub struct ParticleBatchRecorder {
    passes: Vec<RecordedPass>,
    open: Option<RecordedPass>,
    restore_count: u32,
    dropped_sprites: u32,
    instance_buffers: Vec<Buffer>,
}

impl ParticleBatchRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空记录（保留 GPU 缓冲区以便复用）
    pub fn clear(&mut self) {
        self.passes.clear();
        self.open = None;
        self.restore_count = 0;
        self.dropped_sprites = 0;
    }

    /// 已结束的通道
    pub fn passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    /// 是否有未结束的通道
    pub fn is_in_pass(&self) -> bool {
        self.open.is_some()
    }

    /// 所有通道的精灵总数
    pub fn sprite_count(&self) -> usize {
        self.passes.iter().map(|p| p.sprites.len()).sum()
    }

    /// `restore_default` 被调用的次数
    pub fn restore_count(&self) -> u32 {
        self.restore_count
    }

    /// 在通道外提交而被丢弃的精灵数
    pub fn dropped_sprites(&self) -> u32 {
        self.dropped_sprites
    }

    /// 上传每个通道的实例数据
    pub fn upload(&mut self, device: &Device, queue: &Queue) {
        let instance_size = std::mem::size_of::<ParticleInstance>() as u64;

        for (i, pass) in self.passes.iter().enumerate() {
            if pass.sprites.is_empty() {
                continue;
            }
            let instances = pass.instances();
            let required = instances.len() as u64 * instance_size;

            let needs_new = self
                .instance_buffers
                .get(i)
                .map_or(true, |buffer| buffer.size() < required);
            if needs_new {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Particle Instance Buffer"),
                    size: required.next_power_of_two(),
                    usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                if i < self.instance_buffers.len() {
                    self.instance_buffers[i] = buffer;
                } else {
                    self.instance_buffers.push(buffer);
                }
            }

            queue.write_buffer(
                &self.instance_buffers[i],
                0,
                bytemuck::cast_slice(&instances),
            );
        }
    }

    /// 第 `index` 个通道的实例缓冲区
    pub fn buffer(&self, index: usize) -> Option<&Buffer> {
        self.instance_buffers.get(index)
    }
}

impl DrawContext for ParticleBatchRecorder {
    fn begin_pass(&mut self, state: PassState) {
        if let Some(unfinished) = self.open.take() {
            tracing::warn!(
                target: "particles",
                "Pass {:?} was not ended before a new one began",
                unfinished.state
            );
            self.passes.push(unfinished);
        }
        self.open = Some(RecordedPass {
            state,
            sprites: Vec::new(),
        });
    }

    fn draw_sprite(&mut self, sprite: SpriteDraw) {
        match self.open.as_mut() {
            Some(pass) => pass.sprites.push(sprite),
            None => self.dropped_sprites += 1,
        }
    }

    fn end_pass(&mut self) {
        if let Some(pass) = self.open.take() {
            self.passes.push(pass);
        }
    }

    fn restore_default(&mut self) {
        self.restore_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(texture: &TextureHandle) -> SpriteDraw {
        SpriteDraw {
            texture: texture.clone(),
            source: None,
            position: Vec2::new(100.0, 50.0),
            rotation: 0.0,
            scale: Vec2::ONE,
            origin: Vec2::new(4.0, 4.0),
            color: Vec4::ONE,
        }
    }

    #[test]
    fn test_screen_view_center() {
        let view = ScreenView::new(Vec2::new(100.0, 200.0), Vec2::new(800.0, 600.0));
        assert_eq!(view.center(), Vec2::new(500.0, 500.0));
        assert_eq!(view.to_screen(Vec2::new(150.0, 250.0)), Vec2::new(50.0, 50.0));

        let centered = ScreenView::centered(Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert_eq!(centered.center(), Vec2::ZERO);
    }

    #[test]
    fn test_additive_pass_uses_point_sampling() {
        let state = PassState::for_blend(BlendMode::Additive, true);
        assert_eq!(state.filter, SamplerFilter::Point);
        assert!(!state.mipmaps);
        let sampler = state.sampler_descriptor();
        assert_eq!(sampler.mag_filter, wgpu::FilterMode::Nearest);

        let state = PassState::for_blend(BlendMode::Additive, false);
        assert_eq!(state.filter, SamplerFilter::Linear);

        let state = PassState::for_blend(BlendMode::HalfTransparent, true);
        assert_eq!(state.filter, SamplerFilter::Linear);
        assert_eq!(state.blend_state(), wgpu::BlendState::ALPHA_BLENDING);
    }

    #[test]
    fn test_additive_blend_state_adds_to_destination() {
        let state = PassState::for_blend(BlendMode::Additive, true).blend_state();
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.operation, wgpu::BlendOperation::Add);
    }

    #[test]
    fn test_recorder_passes() {
        let texture = TextureHandle::placeholder("Dot", 8, 8);
        let mut recorder = ParticleBatchRecorder::new();

        recorder.begin_pass(PassState::default());
        recorder.draw_sprite(sprite(&texture));
        recorder.draw_sprite(sprite(&texture));
        recorder.end_pass();
        recorder.begin_pass(PassState::for_blend(BlendMode::Additive, true));
        recorder.draw_sprite(sprite(&texture));
        recorder.end_pass();
        recorder.restore_default();

        assert_eq!(recorder.passes().len(), 2);
        assert_eq!(recorder.sprite_count(), 3);
        assert_eq!(recorder.restore_count(), 1);
        assert!(!recorder.is_in_pass());

        recorder.clear();
        assert_eq!(recorder.sprite_count(), 0);
        assert_eq!(recorder.restore_count(), 0);
    }

    #[test]
    fn test_sprite_outside_pass_is_dropped() {
        let texture = TextureHandle::placeholder("Dot", 8, 8);
        let mut recorder = ParticleBatchRecorder::new();
        recorder.draw_sprite(sprite(&texture));
        assert_eq!(recorder.dropped_sprites(), 1);
        assert!(recorder.passes().is_empty());
    }

    #[test]
    fn test_instance_from_sprite() {
        let texture = TextureHandle::placeholder("Strip", 8, 24);
        let mut draw = sprite(&texture);
        draw.source = Some(SourceRect {
            x: 0,
            y: 8,
            width: 8,
            height: 8,
        });

        let instance = ParticleInstance::from_sprite(&draw);
        assert_eq!(instance.tex_coords, [0.0, 8.0 / 24.0, 1.0, 8.0 / 24.0]);

        // 原点映射到位置
        let m = Mat4::from_cols_array_2d(&instance.transform);
        let origin = m.transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert!((origin.truncate() - Vec2::new(100.0, 50.0)).length() < 1e-4);
    }
}
