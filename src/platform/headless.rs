//! 无显示环境下的虚拟后端
//!
//! 不接触任何原生API，把窗口状态保存在内存里，供测试和CI完整地
//! 走一遍生命周期。销毁通知是同步的：`request_close` 返回前注册表
//! 已经收到回调。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::WindowId;
use crate::channel::{ChannelMessage, EngineMessenger, WindowHost};
use crate::engine::{EngineEmbedder, EngineInstance};
use crate::errors::{MultiWindowError, MultiWindowResult};
use crate::geometry::{Monitor, Rect};
use crate::platform::{DestroySink, NativeWindow, PlatformBackend, WindowParams};
use crate::transparency::{LayerAttribute, StyleMask};

/// 虚拟窗口的完整状态快照
#[derive(Debug, Clone)]
pub struct HeadlessWindowState {
    pub rect: Rect,
    pub title: String,
    pub visible: bool,
    pub destroyed: bool,
    pub style_mask: StyleMask,
    pub layer_attribute: Option<LayerAttribute>,
    pub redraw_count: u32,
}

/// 虚拟窗口系统后端
pub struct HeadlessBackend {
    monitors: Mutex<Vec<Monitor>>,
    windows: Mutex<HashMap<WindowId, Arc<Mutex<HeadlessWindowState>>>>,
    fail_create: AtomicBool,
    reject_layering: Arc<AtomicBool>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        let primary = Monitor {
            rect: Rect::new(0, 0, 1920, 1080),
            work_rect: Rect::new(0, 0, 1920, 1080),
        };
        Self {
            monitors: Mutex::new(vec![primary]),
            windows: Mutex::new(HashMap::new()),
            fail_create: AtomicBool::new(false),
            reject_layering: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 使用指定的显示器布局
    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        let backend = Self::new();
        if let Ok(mut current) = backend.monitors.lock() {
            *current = monitors;
        }
        backend
    }

    /// 让后续的窗口创建失败
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// 让样式与分层属性操作失败
    pub fn set_reject_layering(&self, reject: bool) {
        self.reject_layering.store(reject, Ordering::SeqCst);
    }

    /// 按id取窗口状态，用于断言
    pub fn window_state(&self, id: WindowId) -> Option<Arc<Mutex<HeadlessWindowState>>> {
        let windows = self.windows.lock().ok()?;
        windows.get(&id).cloned()
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBackend for HeadlessBackend {
    fn create_window(
        &self,
        params: &WindowParams,
        destroy_sink: DestroySink,
    ) -> MultiWindowResult<Arc<dyn NativeWindow>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(MultiWindowError::CreationFailed(
                "虚拟后端被配置为拒绝创建".to_string(),
            ));
        }

        let (x, y) = params.position.unwrap_or((0, 0));
        let state = Arc::new(Mutex::new(HeadlessWindowState {
            rect: Rect::new(x, y, params.size.0, params.size.1),
            title: params.title.clone(),
            visible: false,
            destroyed: false,
            style_mask: StyleMask::default(),
            layer_attribute: None,
            redraw_count: 0,
        }));

        if let Ok(mut windows) = self.windows.lock() {
            windows.insert(params.id, state.clone());
        }
        debug!("虚拟窗口已创建: id={}", params.id);

        Ok(Arc::new(HeadlessWindow {
            state,
            reject_layering: self.reject_layering.clone(),
            destroy_sink,
        }))
    }

    fn monitors(&self) -> Vec<Monitor> {
        match self.monitors.lock() {
            Ok(monitors) => monitors.clone(),
            Err(_) => Vec::new(),
        }
    }
}

/// 虚拟窗口
pub struct HeadlessWindow {
    state: Arc<Mutex<HeadlessWindowState>>,
    reject_layering: Arc<AtomicBool>,
    destroy_sink: DestroySink,
}

impl NativeWindow for HeadlessWindow {
    fn outer_rect(&self) -> Option<Rect> {
        let state = self.state.lock().ok()?;
        if state.destroyed { None } else { Some(state.rect) }
    }

    fn set_bounds(&self, rect: Rect) {
        if let Ok(mut state) = self.state.lock() {
            if !state.destroyed {
                state.rect = rect;
            }
        }
    }

    fn set_visible(&self, visible: bool) {
        if let Ok(mut state) = self.state.lock() {
            if !state.destroyed {
                state.visible = visible;
            }
        }
    }

    fn set_title(&self, title: &str) {
        if let Ok(mut state) = self.state.lock() {
            if !state.destroyed {
                state.title = title.to_string();
            }
        }
    }

    fn request_close(&self) {
        {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if state.destroyed {
                return;
            }
            state.destroyed = true;
        }
        // 锁已释放，回调里可以安全地触碰注册表
        self.destroy_sink.notify();
    }

    fn destroy(&self) {
        // 虚拟后端没有关闭流程要走，销毁与关闭等价
        self.request_close();
    }

    fn set_style_mask(&self, mask: StyleMask) -> MultiWindowResult<()> {
        if self.reject_layering.load(Ordering::SeqCst) {
            return Err(MultiWindowError::TransparencyFailed(
                "虚拟后端被配置为拒绝分层".to_string(),
            ));
        }
        if let Ok(mut state) = self.state.lock() {
            if !state.destroyed {
                state.style_mask = mask;
            }
        }
        Ok(())
    }

    fn set_layer_attribute(&self, attribute: LayerAttribute) -> MultiWindowResult<()> {
        if self.reject_layering.load(Ordering::SeqCst) {
            return Err(MultiWindowError::TransparencyFailed(
                "虚拟后端被配置为拒绝分层".to_string(),
            ));
        }
        if let Ok(mut state) = self.state.lock() {
            if !state.destroyed {
                state.layer_attribute = Some(attribute);
            }
        }
        Ok(())
    }

    fn redraw(&self) {
        if let Ok(mut state) = self.state.lock() {
            if !state.destroyed {
                state.redraw_count += 1;
            }
        }
    }

    fn raw_handle(&self) -> Option<isize> {
        None
    }
}

/// 按接收顺序收集消息的引擎入口
pub struct CollectingMessenger {
    messages: Mutex<Vec<ChannelMessage>>,
}

impl CollectingMessenger {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// 取当前已收到的全部消息
    pub fn messages(&self) -> Vec<ChannelMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for CollectingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMessenger for CollectingMessenger {
    fn post(&self, message: ChannelMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}

/// 虚拟引擎接入点
///
/// 记录每次挂载的参数，按窗口暴露消息入口与宿主句柄，关停顺序
/// 可查，生命周期断言全靠它。
pub struct HeadlessEmbedder {
    fail_attach: AtomicBool,
    attachments: Mutex<Vec<(WindowId, String)>>,
    messengers: Mutex<HashMap<WindowId, Arc<CollectingMessenger>>>,
    hosts: Mutex<HashMap<WindowId, WindowHost>>,
    shutdowns: Arc<Mutex<Vec<WindowId>>>,
}

impl HeadlessEmbedder {
    pub fn new() -> Self {
        Self {
            fail_attach: AtomicBool::new(false),
            attachments: Mutex::new(Vec::new()),
            messengers: Mutex::new(HashMap::new()),
            hosts: Mutex::new(HashMap::new()),
            shutdowns: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 让后续的引擎挂载失败
    pub fn set_fail_attach(&self, fail: bool) {
        self.fail_attach.store(fail, Ordering::SeqCst);
    }

    /// 某窗口挂载时收到的初始化参数
    pub fn attached_args(&self, id: WindowId) -> Option<String> {
        let attachments = self.attachments.lock().ok()?;
        attachments
            .iter()
            .find(|(window_id, _)| *window_id == id)
            .map(|(_, args)| args.clone())
    }

    /// 某窗口引擎的消息入口
    pub fn messenger(&self, id: WindowId) -> Option<Arc<CollectingMessenger>> {
        let messengers = self.messengers.lock().ok()?;
        messengers.get(&id).cloned()
    }

    /// 取走某窗口的宿主句柄，模拟引擎侧发起调用
    pub fn take_host(&self, id: WindowId) -> Option<WindowHost> {
        let mut hosts = self.hosts.lock().ok()?;
        hosts.remove(&id)
    }

    /// 已关停实例的窗口id，按关停顺序
    pub fn shutdown_order(&self) -> Vec<WindowId> {
        match self.shutdowns.lock() {
            Ok(shutdowns) => shutdowns.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for HeadlessEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineEmbedder for HeadlessEmbedder {
    fn attach(
        &self,
        _window: &dyn NativeWindow,
        args: &str,
        host: WindowHost,
    ) -> anyhow::Result<Box<dyn EngineInstance>> {
        if self.fail_attach.load(Ordering::SeqCst) {
            anyhow::bail!("虚拟引擎被配置为拒绝挂载");
        }

        let id = host.window_id();
        let messenger = Arc::new(CollectingMessenger::new());

        if let Ok(mut attachments) = self.attachments.lock() {
            attachments.push((id, args.to_string()));
        }
        if let Ok(mut messengers) = self.messengers.lock() {
            messengers.insert(id, messenger.clone());
        }
        if let Ok(mut hosts) = self.hosts.lock() {
            hosts.insert(id, host);
        }
        debug!("虚拟引擎已挂载: id={}", id);

        Ok(Box::new(HeadlessEngineInstance {
            window_id: id,
            messenger,
            shutdowns: self.shutdowns.clone(),
        }))
    }
}

struct HeadlessEngineInstance {
    window_id: WindowId,
    messenger: Arc<CollectingMessenger>,
    shutdowns: Arc<Mutex<Vec<WindowId>>>,
}

impl EngineInstance for HeadlessEngineInstance {
    fn messenger(&self) -> Arc<dyn EngineMessenger> {
        self.messenger.clone()
    }
}

impl Drop for HeadlessEngineInstance {
    fn drop(&mut self) {
        if let Ok(mut shutdowns) = self.shutdowns.lock() {
            shutdowns.push(self.window_id);
        }
        debug!("虚拟引擎已关停: id={}", self.window_id);
    }
}
