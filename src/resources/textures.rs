//! 纹理解析
//!
//! 粒子引擎只需要"给定逻辑名称，返回可绘制的图像句柄"。`resolve` 不会报错，
//! 未知名称返回 `None`，调用方退化为不绘制。缓存由解析器自己负责。

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbaImage;

use crate::core::error::{TextureError, TextureResult};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

fn next_texture_id() -> u64 {
    NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)
}

/// 纹理数据
pub struct Texture {
    /// 进程内唯一 ID，渲染后端用它查找 GPU 纹理
    pub id: u64,
    /// 逻辑名称
    pub name: String,
    /// 宽度（像素）
    pub width: u32,
    /// 高度（像素）
    pub height: u32,
    /// CPU 侧像素（占位纹理没有像素）
    pub image: Option<RgbaImage>,
}

/// 可绘制图像句柄
///
/// 克隆只增加引用计数。相等性按纹理 ID 比较。
#[derive(Clone)]
pub struct TextureHandle(Arc<Texture>);

impl TextureHandle {
    /// 从 RGBA 图像创建
    pub fn from_image(name: impl Into<String>, image: RgbaImage) -> Self {
        Self(Arc::new(Texture {
            id: next_texture_id(),
            name: name.into(),
            width: image.width(),
            height: image.height(),
            image: Some(image),
        }))
    }

    /// 创建只有尺寸的占位纹理（由外部渲染器持有实际像素）
    pub fn placeholder(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self(Arc::new(Texture {
            id: next_texture_id(),
            name: name.into(),
            width,
            height,
            image: None,
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn width(&self) -> u32 {
        self.0.width
    }

    pub fn height(&self) -> u32 {
        self.0.height
    }

    pub fn texture(&self) -> &Texture {
        &self.0
    }
}

impl PartialEq for TextureHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TextureHandle {}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureHandle")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("width", &self.0.width)
            .field("height", &self.0.height)
            .finish()
    }
}

/// 纹理解析器
///
/// 实现必须对未知名称返回 `None` 而不是 panic。
pub trait TextureResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<TextureHandle>;
}

impl<T: TextureResolver + ?Sized> TextureResolver for Arc<T> {
    fn resolve(&self, name: &str) -> Option<TextureHandle> {
        (**self).resolve(name)
    }
}

/// 总是返回 `None` 的解析器（无渲染环境、测试）
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTextureResolver;

impl TextureResolver for NullTextureResolver {
    fn resolve(&self, _name: &str) -> Option<TextureHandle> {
        None
    }
}

/// 内存纹理注册表
///
/// 由宿主（程序化纹理生成器等）预先填充。
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: HashMap<String, TextureHandle>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册已有句柄，返回被替换的旧句柄
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        handle: TextureHandle,
    ) -> Option<TextureHandle> {
        self.textures.insert(name.into(), handle)
    }

    /// 注册 RGBA 图像
    pub fn insert_image(&mut self, name: impl Into<String>, image: RgbaImage) -> TextureHandle {
        let name = name.into();
        let handle = TextureHandle::from_image(name.clone(), image);
        self.textures.insert(name, handle.clone());
        handle
    }

    /// 注册占位纹理
    pub fn insert_placeholder(
        &mut self,
        name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> TextureHandle {
        let name = name.into();
        let handle = TextureHandle::placeholder(name.clone(), width, height);
        self.textures.insert(name, handle.clone());
        handle
    }

    pub fn remove(&mut self, name: &str) -> Option<TextureHandle> {
        self.textures.remove(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureResolver for TextureRegistry {
    fn resolve(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).cloned()
    }
}

/// 从目录加载图像文件的解析器
///
/// 逻辑名称 `Particles/Spark` 对应 `<root>/Particles/Spark.png`。
/// 加载结果（包括失败）会被缓存，同一名称只读盘一次。
pub struct DirectoryTextureResolver {
    root: PathBuf,
    extension: String,
    cache: Mutex<HashMap<String, Option<TextureHandle>>>,
}

impl DirectoryTextureResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "png".to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 设置文件扩展名（不含点）
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 逻辑名称对应的文件路径；包含 `..` 或绝对路径的名称被拒绝
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative).with_extension(&self.extension))
    }

    /// 直接从磁盘加载（不经过缓存）
    pub fn load(&self, name: &str) -> TextureResult<TextureHandle> {
        let path = self.path_for(name).ok_or_else(|| TextureError::NotFound {
            name: name.to_string(),
        })?;
        if !path.is_file() {
            return Err(TextureError::NotFound {
                name: name.to_string(),
            });
        }

        let image = image::open(&path).map_err(|e| TextureError::LoadFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(TextureHandle::from_image(name, image.to_rgba8()))
    }

    /// 清空缓存（热重载后调用）
    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl TextureResolver for DirectoryTextureResolver {
    fn resolve(&self, name: &str) -> Option<TextureHandle> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(cached) = cache.get(name) {
            return cached.clone();
        }

        let loaded = match self.load(name) {
            Ok(handle) => {
                tracing::debug!(
                    target: "textures",
                    "Loaded texture {} ({}x{})",
                    name,
                    handle.width(),
                    handle.height()
                );
                Some(handle)
            }
            Err(e) => {
                tracing::debug!(target: "textures", "Texture unavailable: {}", e);
                None
            }
        };
        cache.insert(name.to_string(), loaded.clone());
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolve() {
        let mut registry = TextureRegistry::new();
        let handle = registry.insert_placeholder("Spark", 8, 24);

        assert_eq!(registry.resolve("Spark"), Some(handle));
        assert_eq!(registry.resolve("Missing"), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_handles_compare_by_id() {
        let a = TextureHandle::placeholder("A", 1, 1);
        let b = TextureHandle::placeholder("A", 1, 1);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_directory_resolver_loads_png() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Particles")).unwrap();
        let image = RgbaImage::from_pixel(4, 12, image::Rgba([255, 255, 255, 255]));
        image.save(dir.path().join("Particles").join("Spark.png")).unwrap();

        let resolver = DirectoryTextureResolver::new(dir.path());
        let handle = resolver.resolve("Particles/Spark").unwrap();
        assert_eq!((handle.width(), handle.height()), (4, 12));
        // 第二次命中缓存
        assert_eq!(resolver.resolve("Particles/Spark"), Some(handle));
    }

    #[test]
    fn test_directory_resolver_missing_and_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirectoryTextureResolver::new(dir.path());

        assert!(resolver.resolve("Nope").is_none());
        assert!(resolver.resolve("../etc/passwd").is_none());
        assert!(matches!(
            resolver.load("Nope"),
            Err(TextureError::NotFound { .. })
        ));
    }

    #[test]
    fn test_directory_resolver_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.png"), b"not a png").unwrap();
        let resolver = DirectoryTextureResolver::new(dir.path());

        assert!(matches!(
            resolver.load("Broken"),
            Err(TextureError::LoadFailed { .. })
        ));
        assert!(resolver.resolve("Broken").is_none());
    }
}
