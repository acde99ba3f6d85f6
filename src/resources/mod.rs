//! 资源模块
//!
//! 目前只包含粒子绘制所需的纹理解析。

pub mod textures;

pub use textures::{
    DirectoryTextureResolver, NullTextureResolver, Texture, TextureHandle, TextureRegistry,
    TextureResolver,
};
