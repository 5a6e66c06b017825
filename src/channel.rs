use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::WindowId;
use crate::errors::{MultiWindowError, MultiWindowResult};
use crate::manager::{ManagerShared, MultiWindowManager};
use crate::rpc::{MethodCall, MethodDispatcher, MethodReply};

/// 跨窗口消息
///
/// 事件名与参数包对引擎透明，本层不解释内容。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessage {
    /// 发送方窗口id
    pub from_window_id: WindowId,
    /// 事件名
    pub event: String,
    /// 附带参数
    pub arguments: Value,
}

/// 引擎侧的消息入口
///
/// 投递为即发即弃；实现方必须保证同一入口内先投先到。
pub trait EngineMessenger: Send + Sync {
    fn post(&self, message: ChannelMessage);
}

/// 窗口的双向消息通道
///
/// 每个注册表条目持有一个，窗口销毁时随条目一起释放。
pub struct WindowChannel {
    window_id: WindowId,
    messenger: Arc<dyn EngineMessenger>,
}

impl WindowChannel {
    pub fn new(window_id: WindowId, messenger: Arc<dyn EngineMessenger>) -> Self {
        Self {
            window_id,
            messenger,
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// 引擎入口的共享句柄，路由方在注册表锁外投递时使用
    pub fn messenger(&self) -> Arc<dyn EngineMessenger> {
        self.messenger.clone()
    }

    /// 将消息投递给该窗口的引擎
    pub fn deliver(&self, message: ChannelMessage) {
        self.messenger.post(message);
    }
}

/// 交给每个引擎实例的宿主句柄
///
/// 暴露与主窗口完全一致的方法面，子窗口因此可以关闭自己或再创建
/// 兄弟窗口。只持有管理器的弱引用，引擎比管理器活得久时调用会
/// 返回 [`MultiWindowError::ManagerShutDown`]。
pub struct WindowHost {
    window_id: WindowId,
    shared: Weak<ManagerShared>,
}

impl WindowHost {
    pub(crate) fn new(window_id: WindowId, shared: Weak<ManagerShared>) -> Self {
        Self { window_id, shared }
    }

    /// 该句柄所属的窗口id
    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    fn manager(&self) -> MultiWindowResult<MultiWindowManager> {
        self.shared
            .upgrade()
            .map(MultiWindowManager::from_shared)
            .ok_or(MultiWindowError::ManagerShutDown)
    }

    /// 调用宿主方法面，与主窗口的RPC表完全相同
    pub fn invoke(&self, call: MethodCall) -> MethodReply {
        match self.manager() {
            Ok(manager) => MethodDispatcher::new(manager).handle(call),
            Err(e) => MethodReply::Error {
                code: e.rpc_code().to_string(),
                message: e.to_string(),
            },
        }
    }

    /// 向目标窗口发送事件
    ///
    /// 与句柄操作不同，目标不存在是明确的投递失败，向调用方报错。
    pub fn post_to_window(
        &self,
        target: WindowId,
        event: &str,
        arguments: Value,
    ) -> MultiWindowResult<()> {
        self.manager()?
            .post_event(self.window_id, target, event, arguments)
    }
}
