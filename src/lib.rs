//! 桌面多窗口生命周期管理与跨窗口消息路由
//!
//! 注册表独占所有原生窗口句柄，外部只凭窗口id寻址；RPC分发器把
//! 方法调用翻译成注册表操作，消息通道在主窗口与任意子窗口之间
//! 双向投递事件。渲染、输入与引擎内部不在本层范围。

pub mod channel;
pub mod engine;
pub mod errors;
pub mod geometry;
pub mod manager;
pub mod platform;
pub mod rpc;
pub mod transparency;

/// 窗口id，进程内唯一且单调递增，0保留给主窗口
pub type WindowId = i64;

// 导出主要的公共类型
pub use channel::{ChannelMessage, EngineMessenger, WindowChannel, WindowHost};
pub use engine::{EngineEmbedder, EngineInstance};
pub use errors::{MultiWindowError, MultiWindowResult};
pub use geometry::{Monitor, Rect};
pub use manager::{MAIN_WINDOW_ID, ManagerConfig, MultiWindowManager, MultiWindowManagerBuilder};
pub use platform::{DestroyObserver, DestroySink, NativeWindow, PlatformBackend, WindowParams};
pub use rpc::{MethodCall, MethodDispatcher, MethodReply};
pub use transparency::{LayerAttribute, StyleMask, TransparencyConfig, TransparencyMode};

// Windows下的原生后端
#[cfg(target_os = "windows")]
pub use platform::win32::{Win32Backend, Win32Window, main_window_from_view};
