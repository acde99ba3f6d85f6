use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 默认粒子容量
pub const DEFAULT_MAX_PARTICLES: usize = 3000;

/// 默认剔除距离（世界单位，相对屏幕中心）
pub const DEFAULT_CULL_DISTANCE: f32 = 2500.0;

/// 粒子系统配置
///
/// 处理器构造时复制一份，之后不可在运行时修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// 最大同时存活粒子数
    pub max_particles: usize,

    /// 超出此距离的非重要粒子不绘制
    pub cull_distance: f32,

    /// 无渲染环境（专用服务器），所有操作退化为空操作
    pub headless: bool,

    /// 加法混合批次使用点采样且不使用 mipmap
    pub additive_point_sampling: bool,
}

impl_default!(ParticleConfig {
    max_particles: DEFAULT_MAX_PARTICLES,
    cull_distance: DEFAULT_CULL_DISTANCE,
    headless: false,
    additive_point_sampling: true,
});

impl ParticleConfig {
    /// 使用指定容量创建配置
    pub fn with_capacity(max_particles: usize) -> Self {
        Self {
            max_particles,
            ..Default::default()
        }
    }

    /// 无渲染环境配置
    pub fn headless() -> Self {
        Self {
            headless: true,
            ..Default::default()
        }
    }

    /// 剔除距离的平方
    pub fn cull_distance_squared(&self) -> f32 {
        self.cull_distance * self.cull_distance
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_particles == 0 {
            return Err(ConfigError::ValidationError(
                "max_particles must be greater than zero".to_string(),
            ));
        }
        if !self.cull_distance.is_finite() || self.cull_distance <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "cull_distance must be finite and positive, got {}",
                self.cull_distance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_values() {
        let config = ParticleConfig::default();
        assert_eq!(config.max_particles, 3000);
        assert_eq!(config.cull_distance, 2500.0);
        assert_eq!(config.cull_distance_squared(), 6_250_000.0);
        assert!(!config.headless);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = ParticleConfig::with_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_cull_distance() {
        let mut config = ParticleConfig::default();
        config.cull_distance = f32::NAN;
        assert!(config.validate().is_err());
        config.cull_distance = -1.0;
        assert!(config.validate().is_err());
    }
}
