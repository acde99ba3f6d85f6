//! 统一错误处理模块
//!
//! 提供粒子引擎范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **引擎层错误** (`EngineError`): 启动时的配置错误、宿主显式加载纹理的错误
//! - **纹理错误** (`TextureError`): 仅由显式加载接口返回，`TextureResolver::resolve` 不会报错
//! - **粒子错误** (`ParticleError`): 单个粒子绘制失败，由处理器记录并吞掉，不会中断整帧
//!
//! 容量耗尽、纹理缺失都不是错误：前者静默拒绝，后者退化为"不绘制"。

use thiserror::Error;

use crate::config::ConfigError;

/// 引擎核心错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
}

/// 纹理加载错误
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Texture not found: {name}")]
    NotFound { name: String },

    #[error("Failed to load texture: {name}, reason: {reason}")]
    LoadFailed { name: String, reason: String },
}

/// 单个粒子的绘制错误
///
/// 由 `Particle::custom_draw` 返回，或由处理器在捕获到 panic 时构造。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParticleError {
    #[error("Particle {particle} failed to draw: {reason}")]
    Draw {
        particle: &'static str,
        reason: String,
    },

    #[error("Particle {particle} panicked while drawing: {message}")]
    Panicked {
        particle: &'static str,
        message: String,
    },
}

/// 引擎操作结果
pub type EngineResult<T> = Result<T, EngineError>;

/// 纹理操作结果
pub type TextureResult<T> = Result<T, TextureError>;

/// 粒子绘制结果
pub type ParticleResult<T> = Result<T, ParticleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_error_display() {
        let err = TextureError::NotFound {
            name: "BloomCircle".to_string(),
        };
        assert_eq!(err.to_string(), "Texture not found: BloomCircle");
    }

    #[test]
    fn test_engine_error_from_texture_error() {
        let err: EngineError = TextureError::LoadFailed {
            name: "Spark".to_string(),
            reason: "bad header".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Texture(_)));
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn test_particle_error_display() {
        let err = ParticleError::Panicked {
            particle: "BloomOrb",
            message: "index out of bounds".to_string(),
        };
        assert!(err.to_string().contains("BloomOrb"));
    }
}
