//! 核心模块
//!
//! 包含引擎的核心功能：
//! - `engine` - 引擎入口与生命周期
//! - `error` - 错误类型定义
//! - `macros` - 通用宏

pub mod engine;
pub mod error;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    EngineError, EngineResult, ParticleError, ParticleResult, TextureError, TextureResult,
};

pub use engine::ParticleEngine;
