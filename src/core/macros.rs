//! 核心宏定义

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use particle_engine::impl_default;
///
/// struct CullSettings {
///     distance: f32,
///     enabled: bool,
/// }
///
/// impl_default!(CullSettings {
///     distance: 2500.0,
///     enabled: true,
/// });
///
/// assert!(CullSettings::default().enabled);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
