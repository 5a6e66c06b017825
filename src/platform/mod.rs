//! 平台抽象层
//!
//! 管理器只通过这里的trait接触原生窗口系统，生命周期逻辑因此可以在
//! 无显示环境下测试。Windows下由 [`win32`] 提供实现，测试与CI使用
//! [`headless`]。

use std::sync::{Arc, Weak};

use crate::WindowId;
use crate::errors::MultiWindowResult;
use crate::geometry::{Monitor, Rect};
use crate::transparency::{LayerAttribute, StyleMask};

pub mod headless;
#[cfg(target_os = "windows")]
pub mod win32;

/// 创建原生窗口所需的参数
///
/// 窗口总是以隐藏状态创建，由调用方在需要时显式调用show。
#[derive(Debug, Clone)]
pub struct WindowParams {
    pub id: WindowId,
    pub title: String,
    pub size: (i32, i32),
    /// 初始位置，缺省时由平台决定
    pub position: Option<(i32, i32)>,
}

/// 原生窗口系统后端
pub trait PlatformBackend: Send + Sync {
    /// 创建一个新的顶层窗口
    ///
    /// `destroy_sink` 在窗口被原生侧销毁时必须被精确触发一次，
    /// 否则注册表会残留幽灵条目。
    fn create_window(
        &self,
        params: &WindowParams,
        destroy_sink: DestroySink,
    ) -> MultiWindowResult<Arc<dyn NativeWindow>>;

    /// 枚举当前所有显示器
    fn monitors(&self) -> Vec<Monitor>;
}

/// 单个原生窗口句柄上的操作
///
/// 句柄已销毁时所有操作都静默忽略，迟到的命令不视为异常。
pub trait NativeWindow: Send + Sync {
    /// 窗口外框矩形，句柄失效时返回None
    fn outer_rect(&self) -> Option<Rect>;

    fn set_bounds(&self, rect: Rect);

    fn set_visible(&self, visible: bool);

    fn set_title(&self, title: &str);

    /// 请求优雅关闭，走窗口自身的关闭流程而非立即销毁
    fn request_close(&self);

    /// 立即销毁窗口，只用于创建失败时的回收
    fn destroy(&self);

    /// 更新扩展样式位
    fn set_style_mask(&self, mask: StyleMask) -> MultiWindowResult<()>;

    /// 设置分层属性
    fn set_layer_attribute(&self, attribute: LayerAttribute) -> MultiWindowResult<()>;

    /// 强制重绘，让样式变更立即可见
    fn redraw(&self);

    /// 原生句柄的原始值，仅用于诊断日志
    fn raw_handle(&self) -> Option<isize>;
}

/// 窗口销毁事件的接收方
pub trait DestroyObserver: Send + Sync {
    fn window_destroyed(&self, id: WindowId);
}

/// 连接原生销毁通知与注册表的回调句柄
///
/// 持有观察者的弱引用，管理器先于窗口销毁时通知自动失效。
#[derive(Clone)]
pub struct DestroySink {
    id: WindowId,
    observer: Weak<dyn DestroyObserver>,
}

impl DestroySink {
    pub fn new(id: WindowId, observer: Weak<dyn DestroyObserver>) -> Self {
        Self { id, observer }
    }

    pub fn window_id(&self) -> WindowId {
        self.id
    }

    /// 通知观察者窗口已销毁
    pub fn notify(&self) {
        if let Some(observer) = self.observer.upgrade() {
            observer.window_destroyed(self.id);
        }
    }
}
