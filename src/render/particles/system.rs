//! 粒子 ECS 系统
//!
//! 把处理器接入 bevy_ecs 调度：先更新，再绘制到记录器。

use bevy_ecs::prelude::*;

use super::batch::{ParticleBatchRecorder, ScreenView};
use super::handler::ParticleHandler;

/// 当前帧用于剔除和坐标转换的视口
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticleView(pub ScreenView);

/// 粒子更新系统
pub fn particle_update_system(mut handler: ResMut<ParticleHandler>) {
    handler.update();
}

/// 粒子绘制系统
///
/// 记录器每帧先被清空，绘制结果供渲染后端读取或上传。
pub fn particle_draw_system(
    mut handler: ResMut<ParticleHandler>,
    view: Res<ParticleView>,
    mut recorder: ResMut<ParticleBatchRecorder>,
) {
    recorder.clear();
    handler.draw(&mut *recorder, &view.0);
}

/// 注册粒子系统，保证更新在绘制之前
pub fn add_particle_systems(schedule: &mut Schedule) {
    schedule.add_systems((particle_update_system, particle_draw_system).chain());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParticleConfig;
    use crate::render::particles::particle::{Particle, ParticleState};
    use crate::resources::TextureRegistry;
    use glam::Vec2;
    use std::sync::Arc;

    struct Ember {
        state: ParticleState,
    }

    impl Particle for Ember {
        fn state(&self) -> &ParticleState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ParticleState {
            &mut self.state
        }
    }

    #[test]
    fn test_particle_schedule() {
        let mut registry = TextureRegistry::new();
        registry.insert_placeholder("Ember", 4, 4);

        let mut world = World::default();
        let mut handler = ParticleHandler::new(ParticleConfig::default(), Arc::new(registry));
        handler.spawn_particle(Ember {
            state: ParticleState::new(Vec2::ZERO, Vec2::X).with_lifetime(2),
        });
        world.insert_resource(handler);
        world.insert_resource(ParticleBatchRecorder::new());
        world.insert_resource(ParticleView(ScreenView::centered(
            Vec2::ZERO,
            Vec2::new(640.0, 480.0),
        )));

        let mut schedule = Schedule::default();
        add_particle_systems(&mut schedule);

        schedule.run(&mut world);
        assert_eq!(world.resource::<ParticleBatchRecorder>().sprite_count(), 1);
        assert_eq!(world.resource::<ParticleHandler>().live_count(), 1);

        schedule.run(&mut world);
        assert_eq!(world.resource::<ParticleHandler>().live_count(), 0);
        assert_eq!(world.resource::<ParticleBatchRecorder>().sprite_count(), 0);
    }
}
