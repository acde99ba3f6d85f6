//! 粒子更新上下文
//!
//! 粒子在 `update` 中不能直接访问处理器（处理器正在遍历自己）。
//! 次级粒子和光照通过上下文排队，在本帧移除批处理之后统一处理。

use glam::{Vec2, Vec3};

use super::particle::Particle;

/// 粒子发出的点光源
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightEmission {
    /// 世界坐标
    pub position: Vec2,
    /// 线性 RGB 强度
    pub color: Vec3,
    /// 影响半径
    pub radius: f32,
}

/// 单帧更新上下文
#[derive(Default)]
pub struct UpdateContext {
    frame: u64,
    spawns: Vec<Box<dyn Particle>>,
    lights: Vec<LightEmission>,
}

impl UpdateContext {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            ..Default::default()
        }
    }

    /// 当前帧号（从 1 开始）
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 排队生成次级粒子，经过正常的容量检查
    pub fn spawn<P: Particle>(&mut self, particle: P) {
        self.spawns.push(Box::new(particle));
    }

    pub fn spawn_boxed(&mut self, particle: Box<dyn Particle>) {
        self.spawns.push(particle);
    }

    /// 发出本帧光照
    pub fn emit_light(&mut self, position: Vec2, color: Vec3, radius: f32) {
        self.lights.push(LightEmission {
            position,
            color,
            radius,
        });
    }

    pub fn pending_spawns(&self) -> usize {
        self.spawns.len()
    }

    pub fn lights(&self) -> &[LightEmission] {
        &self.lights
    }

    pub(crate) fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.spawns.clear();
        self.lights.clear();
    }

    pub(crate) fn take_spawns(&mut self) -> Vec<Box<dyn Particle>> {
        std::mem::take(&mut self.spawns)
    }

    pub(crate) fn drain_lights(&mut self) -> std::vec::Drain<'_, LightEmission> {
        self.lights.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_frame_resets_queues() {
        let mut ctx = UpdateContext::new(1);
        ctx.emit_light(Vec2::ZERO, Vec3::ONE, 32.0);
        assert_eq!(ctx.lights().len(), 1);

        ctx.begin_frame(2);
        assert_eq!(ctx.frame(), 2);
        assert!(ctx.lights().is_empty());
        assert_eq!(ctx.pending_spawns(), 0);
    }
}
