//! 窗口注册表与生命周期管理
//!
//! 所有窗口变更都经过这里：id分配、创建、寻址、关闭回收、枚举与
//! 消息路由。管理器是显式构造的服务对象，进程内不设全局单例，
//! 是否只建一个实例由宿主决定。

mod entry;

use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::WindowId;
use crate::channel::{ChannelMessage, EngineMessenger, WindowChannel, WindowHost};
use crate::engine::EngineEmbedder;
use crate::errors::{MultiWindowError, MultiWindowResult};
use crate::geometry::{self, Rect};
use crate::platform::{DestroyObserver, DestroySink, NativeWindow, PlatformBackend, WindowParams};
use crate::transparency::{self, TransparencyConfig};

use entry::{RegistryInner, WindowEntry};

/// 主窗口保留id
pub const MAIN_WINDOW_ID: WindowId = 0;

/// 管理器配置
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// 新窗口的初始标题
    pub default_title: String,
    /// 新窗口的初始尺寸
    pub default_size: (i32, i32),
    /// 新窗口的初始位置，缺省时由平台决定
    pub default_position: Option<(i32, i32)>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_title: String::new(),
            default_size: (1280, 720),
            default_position: None,
        }
    }
}

/// 管理器共享状态
///
/// 注册表的全部变更都串行化在这把锁后面。
pub(crate) struct ManagerShared {
    registry: Mutex<RegistryInner>,
    backend: Arc<dyn PlatformBackend>,
    embedder: Arc<dyn EngineEmbedder>,
    config: ManagerConfig,
}

impl DestroyObserver for ManagerShared {
    fn window_destroyed(&self, id: WindowId) {
        let removed = {
            let Ok(mut registry) = self.registry.lock() else {
                return;
            };
            registry.entries.remove(&id)
        };
        // 条目在锁外释放，引擎关停不会在持锁状态下执行
        match removed {
            Some(entry) => info!("窗口已销毁, 条目移除: id={}", entry.id),
            None => debug!("收到未注册窗口的销毁通知: id={}", id),
        }
    }
}

/// 多窗口管理器
///
/// 可克隆的服务对象，所有克隆共享同一注册表。
#[derive(Clone)]
pub struct MultiWindowManager {
    shared: Arc<ManagerShared>,
}

impl MultiWindowManager {
    /// 用默认配置创建管理器
    pub fn new(backend: Arc<dyn PlatformBackend>, embedder: Arc<dyn EngineEmbedder>) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                registry: Mutex::new(RegistryInner::new()),
                backend,
                embedder,
                config: ManagerConfig::default(),
            }),
        }
    }

    pub fn builder() -> MultiWindowManagerBuilder {
        MultiWindowManagerBuilder::new()
    }

    pub(crate) fn from_shared(shared: Arc<ManagerShared>) -> Self {
        Self { shared }
    }

    /// 创建新窗口并挂载引擎
    ///
    /// 全有或全无：原生创建或引擎挂载失败时不留任何半成品状态，
    /// 已分配的id作废不复用。透明度是尽力而为，失败不影响创建。
    pub fn create_window(
        &self,
        args: &str,
        transparency: Option<&Value>,
    ) -> MultiWindowResult<WindowId> {
        let id = {
            let Ok(mut registry) = self.shared.registry.lock() else {
                return Err(MultiWindowError::CreationFailed("注册表不可用".to_string()));
            };
            registry.allocate_id()
        };
        debug!("开始创建窗口: id={}", id);

        let params = WindowParams {
            id,
            title: self.shared.config.default_title.clone(),
            size: self.shared.config.default_size,
            position: self.shared.config.default_position,
        };
        let sink = DestroySink::new(
            id,
            Arc::downgrade(&self.shared) as Weak<dyn DestroyObserver>,
        );
        let window = match self.shared.backend.create_window(&params, sink) {
            Ok(window) => window,
            Err(e) => {
                warn!("原生窗口创建失败: id={}, {}", id, e);
                return Err(e);
            }
        };

        let host = WindowHost::new(id, Arc::downgrade(&self.shared));
        let engine = match self.shared.embedder.attach(window.as_ref(), args, host) {
            Ok(engine) => engine,
            Err(e) => {
                warn!("引擎挂载失败, 回收窗口: id={}, {}", id, e);
                window.destroy();
                return Err(MultiWindowError::CreationFailed(e.to_string()));
            }
        };

        let transparency_config = match transparency {
            Some(bag) => {
                let config = TransparencyConfig::from_bag(bag);
                if let Err(e) = transparency::apply_to(window.as_ref(), &config) {
                    warn!("透明度应用失败, 忽略: id={}, {}", id, e);
                }
                config
            }
            None => TransparencyConfig::default(),
        };

        let channel = WindowChannel::new(id, engine.messenger());
        let entry = WindowEntry {
            id,
            engine: Some(engine),
            window,
            creation_args: args.to_string(),
            transparency: transparency_config,
            channel,
        };
        {
            let Ok(mut registry) = self.shared.registry.lock() else {
                return Err(MultiWindowError::CreationFailed("注册表不可用".to_string()));
            };
            registry.entries.insert(id, entry);
        }

        info!("窗口创建完成: id={}", id);
        Ok(id)
    }

    /// 把宿主创建的主窗口注册进同一id空间
    ///
    /// 主窗口占用保留id 0，消息路由对它与子窗口一视同仁。
    pub fn attach_main_window(
        &self,
        window: Arc<dyn NativeWindow>,
        messenger: Arc<dyn EngineMessenger>,
    ) -> MultiWindowResult<()> {
        let Ok(mut registry) = self.shared.registry.lock() else {
            return Err(MultiWindowError::CreationFailed("注册表不可用".to_string()));
        };
        if registry.entries.contains_key(&MAIN_WINDOW_ID) {
            return Err(MultiWindowError::InvalidArgument(
                "主窗口已注册".to_string(),
            ));
        }
        registry.entries.insert(
            MAIN_WINDOW_ID,
            WindowEntry {
                id: MAIN_WINDOW_ID,
                engine: None,
                window,
                creation_args: String::new(),
                transparency: TransparencyConfig::default(),
                channel: WindowChannel::new(MAIN_WINDOW_ID, messenger),
            },
        );
        info!("主窗口已注册: id={}", MAIN_WINDOW_ID);
        Ok(())
    }

    /// 凭id取窗口句柄，句柄在锁外使用
    fn resolve(&self, id: WindowId) -> Option<Arc<dyn NativeWindow>> {
        let registry = self.shared.registry.lock().ok()?;
        registry.entries.get(&id).map(|entry| entry.window.clone())
    }

    /// 显示窗口；id未注册时静默忽略
    pub fn show(&self, id: WindowId) {
        match self.resolve(id) {
            Some(window) => window.set_visible(true),
            None => debug!("忽略对未注册窗口的操作: show id={}", id),
        }
    }

    /// 隐藏窗口；id未注册时静默忽略
    pub fn hide(&self, id: WindowId) {
        match self.resolve(id) {
            Some(window) => window.set_visible(false),
            None => debug!("忽略对未注册窗口的操作: hide id={}", id),
        }
    }

    /// 请求关闭窗口；id未注册时静默忽略
    ///
    /// 走原生的优雅关闭流程，条目要等销毁通知回来才移除。
    pub fn close(&self, id: WindowId) {
        match self.resolve(id) {
            Some(window) => window.request_close(),
            None => debug!("忽略对未注册窗口的操作: close id={}", id),
        }
    }

    /// 设置窗口外框矩形；浮点输入向零截断
    pub fn set_bounds(&self, id: WindowId, x: f64, y: f64, width: f64, height: f64) {
        let Some(window) = self.resolve(id) else {
            debug!("忽略对未注册窗口的操作: setBounds id={}", id);
            return;
        };
        window.set_bounds(Rect::new(
            geometry::trunc_coord(x),
            geometry::trunc_coord(y),
            geometry::trunc_coord(width),
            geometry::trunc_coord(height),
        ));
    }

    /// 设置窗口标题
    pub fn set_title(&self, id: WindowId, title: &str) {
        match self.resolve(id) {
            Some(window) => window.set_title(title),
            None => debug!("忽略对未注册窗口的操作: setTitle id={}", id),
        }
    }

    /// 把窗口挪到所在显示器工作区的中央
    ///
    /// 显示器取交叠面积最大者，完全在屏幕外时取最近的一块。
    pub fn center(&self, id: WindowId) {
        let Some(window) = self.resolve(id) else {
            debug!("忽略对未注册窗口的操作: center id={}", id);
            return;
        };
        let Some(rect) = window.outer_rect() else {
            return;
        };
        let monitors = self.shared.backend.monitors();
        let Some(monitor) = geometry::monitor_for_rect(&rect, &monitors) else {
            warn!("没有可用显示器, 居中跳过: id={}", id);
            return;
        };
        let (x, y) = geometry::center_in(&rect, &monitor.work_rect);
        window.set_bounds(Rect::new(x, y, rect.width, rect.height));
    }

    /// 重新解码并应用透明度配置
    ///
    /// 应用失败记日志后丢弃，解码结果仍会存入条目作为当前状态。
    pub fn set_transparency(&self, id: WindowId, bag: &Value) {
        let Some(window) = self.resolve(id) else {
            debug!("忽略对未注册窗口的操作: setTransparency id={}", id);
            return;
        };
        let config = TransparencyConfig::from_bag(bag);
        if let Err(e) = transparency::apply_to(window.as_ref(), &config) {
            warn!("透明度应用失败, 忽略: id={}, {}", id, e);
        }
        if let Ok(mut registry) = self.shared.registry.lock() {
            if let Some(entry) = registry.entries.get_mut(&id) {
                entry.transparency = config;
            }
        }
    }

    /// 当前记录的透明度配置
    pub fn transparency_of(&self, id: WindowId) -> Option<TransparencyConfig> {
        let registry = self.shared.registry.lock().ok()?;
        registry.entries.get(&id).map(|entry| entry.transparency)
    }

    /// 创建时透传的初始化参数
    pub fn creation_args_of(&self, id: WindowId) -> Option<String> {
        let registry = self.shared.registry.lock().ok()?;
        registry
            .entries
            .get(&id)
            .map(|entry| entry.creation_args.clone())
    }

    /// 所有子窗口id，按创建顺序（即id升序），不含主窗口
    pub fn all_sub_window_ids(&self) -> Vec<WindowId> {
        match self.shared.registry.lock() {
            Ok(registry) => registry
                .entries
                .keys()
                .copied()
                .filter(|id| *id != MAIN_WINDOW_ID)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// 跨窗口投递事件
    ///
    /// 与句柄操作不同：目标未注册是明确的投递失败，向调用方报错。
    /// 同一目标的消息按调用顺序到达。
    pub fn post_event(
        &self,
        from: WindowId,
        target: WindowId,
        event: &str,
        arguments: Value,
    ) -> MultiWindowResult<()> {
        let messenger = {
            let Ok(registry) = self.shared.registry.lock() else {
                return Err(MultiWindowError::WindowNotFound(target));
            };
            match registry.entries.get(&target) {
                Some(entry) => entry.channel.messenger(),
                None => {
                    warn!("消息目标未注册: from={}, target={}", from, target);
                    return Err(MultiWindowError::WindowNotFound(target));
                }
            }
        };
        // 投递在锁外进行，引擎入口可以同步回调管理器
        messenger.post(ChannelMessage {
            from_window_id: from,
            event: event.to_string(),
            arguments,
        });
        Ok(())
    }
}

/// 管理器构建器
pub struct MultiWindowManagerBuilder {
    backend: Option<Arc<dyn PlatformBackend>>,
    embedder: Option<Arc<dyn EngineEmbedder>>,
    config: ManagerConfig,
}

impl MultiWindowManagerBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            embedder: None,
            config: ManagerConfig::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn PlatformBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EngineEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.config.default_title = title.into();
        self
    }

    pub fn with_default_size(mut self, width: i32, height: i32) -> Self {
        self.config.default_size = (width, height);
        self
    }

    pub fn with_default_position(mut self, x: i32, y: i32) -> Self {
        self.config.default_position = Some((x, y));
        self
    }

    pub fn build(self) -> MultiWindowResult<MultiWindowManager> {
        let backend = self
            .backend
            .ok_or_else(|| MultiWindowError::InvalidArgument("缺少平台后端".to_string()))?;
        let embedder = self
            .embedder
            .ok_or_else(|| MultiWindowError::InvalidArgument("缺少引擎接入点".to_string()))?;
        Ok(MultiWindowManager {
            shared: Arc::new(ManagerShared {
                registry: Mutex::new(RegistryInner::new()),
                backend,
                embedder,
                config: self.config,
            }),
        })
    }
}

impl Default for MultiWindowManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
